//! V4L2 capture pipeline as a [`FrameProducer`], using the v4l crate.

use std::io;
use std::time::Duration;

use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::{CaptureStream as _, Stream as _};
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{
    BufferId, CompletionSource, ExchangeError, FourCC, Format, FrameProducer, Result,
};

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// V4L2 device wrapping the v4l crate.
pub struct V4L2Device {
    device: Device,
    capabilities: DeviceCapabilities,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        let device = Device::new(index as usize).map_err(producer_error)?;
        let caps = device.query_caps().map_err(producer_error)?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        if !capabilities.can_capture || !capabilities.can_stream {
            return Err(ExchangeError::Producer(format!(
                "{} cannot stream video capture",
                capabilities.card
            )));
        }

        info!(index, card = %capabilities.card, driver = %capabilities.driver, "opened capture device");
        Ok(Self {
            device,
            capabilities,
        })
    }

    /// Device capabilities.
    pub const fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Current format.
    pub fn format(&self) -> Result<Format> {
        let fmt = self.device.format().map_err(producer_error)?;
        Ok(Format {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.fourcc),
            stride: fmt.stride,
            size: fmt.size,
        })
    }

    /// Set capture format. Returns the actual format set by the driver.
    pub fn set_format(&mut self, format: &Format) -> Result<Format> {
        let mut fmt = self.device.format().map_err(producer_error)?;
        fmt.width = format.width;
        fmt.height = format.height;
        fmt.fourcc = format.fourcc.into();

        let fmt = self.device.set_format(&fmt).map_err(producer_error)?;
        Ok(Format {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.fourcc),
            stride: fmt.stride,
            size: fmt.size,
        })
    }

    /// Allocate `buffer_count` mmap buffers and wrap them in a producer.
    pub fn create_producer(&self, buffer_count: u32) -> Result<V4L2Producer<'_>> {
        let stream = Stream::with_buffers(&self.device, Type::VideoCapture, buffer_count)
            .map_err(producer_error)?;

        Ok(V4L2Producer {
            stream,
            buffer_count,
            streaming: false,
        })
    }
}

/// mmap capture stream driven buffer by buffer.
///
/// Every buffer is queued to the driver on start; afterwards a buffer goes
/// back to the driver only through [`FrameProducer::resubmit`].
pub struct V4L2Producer<'a> {
    stream: Stream<'a>,
    buffer_count: u32,
    streaming: bool,
}

impl V4L2Producer<'_> {
    /// Every buffer allocated for this stream.
    pub fn buffer_ids(&self) -> impl Iterator<Item = BufferId> {
        (0..self.buffer_count).map(BufferId)
    }

    /// Block until the driver completes a buffer.
    pub fn wait_ready(&mut self) -> Result<BufferId> {
        let index = self.stream.dequeue().map_err(producer_error)?;
        to_buffer_id(index)
    }
}

impl FrameProducer for V4L2Producer<'_> {
    fn resubmit(&mut self, buffer: BufferId) -> Result<()> {
        self.stream
            .queue(buffer.0 as usize)
            .map_err(producer_error)
    }

    fn start(&mut self) -> Result<()> {
        for index in 0..self.buffer_count {
            self.stream.queue(index as usize).map_err(producer_error)?;
        }
        self.stream.start().map_err(producer_error)?;
        self.streaming = true;
        debug!(buffers = self.buffer_count, "stream on");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.streaming {
            return Ok(());
        }
        self.streaming = false;
        self.stream.stop().map_err(producer_error)?;
        debug!("stream off");
        Ok(())
    }
}

impl CompletionSource for V4L2Producer<'_> {
    fn poll_completion(&mut self, timeout: Duration) -> Result<Option<BufferId>> {
        self.stream.set_timeout(timeout);
        match self.stream.dequeue() {
            Ok(index) => to_buffer_id(index).map(Some),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(err) => Err(producer_error(err)),
        }
    }
}

fn to_buffer_id(index: usize) -> Result<BufferId> {
    u32::try_from(index)
        .map(BufferId)
        .map_err(|_| ExchangeError::Producer(format!("buffer index {index} out of range")))
}

#[allow(clippy::needless_pass_by_value)]
fn producer_error(err: io::Error) -> ExchangeError {
    ExchangeError::Producer(err.to_string())
}
