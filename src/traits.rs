//! Core handles, errors and collaborator traits for the buffer exchange.

use std::fmt;
use std::time::Duration;

/// Producer-side buffer handle (the V4L2 mmap buffer index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf#{}", self.0)
    }
}

/// Consumer-side surface handle (a displayable framebuffer object id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fb#{}", self.0)
    }
}

/// Pixel format representation (e.g., YUYV, MJPG, RGB3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// 32-bit ARGB, the format scan-out planes take directly.
    pub const AR24: Self = Self::new(b"AR24");
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Negotiated capture format shared by every buffer of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride).
    pub stride: u32,
    /// Total frame size in bytes.
    pub size: u32,
}

impl Format {
    /// Create a new format specification, deriving stride from the fourcc.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        let bytes_per_pixel = if matches!(fourcc.0, [b'A', b'R', b'2', b'4']) {
            4
        } else {
            2
        };
        let stride = width * bytes_per_pixel;
        let size = stride * height;
        Self {
            width,
            height,
            fourcc,
            stride,
            size,
        }
    }
}

/// Error type for buffer exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// A producer handle was never registered in the identity map.
    #[error("unknown buffer handle {0}")]
    UnknownBuffer(BufferId),
    /// A consumer handle was never registered in the identity map.
    #[error("unknown surface handle {0}")]
    UnknownSurface(SurfaceId),
    /// One side of a pairing is already registered.
    #[error("duplicate binding {buffer} <-> {surface}")]
    DuplicateBinding {
        /// Buffer side of the rejected pairing.
        buffer: BufferId,
        /// Surface side of the rejected pairing.
        surface: SurfaceId,
    },
    /// A surface was handed over again before being recycled.
    #[error("surface {0} is already queued, armed or on screen")]
    DoubleQueue(SurfaceId),
    /// A surface was submitted while another one is still armed.
    #[error("cannot arm {surface}: {armed} is still waiting for its flip")]
    FlipPending {
        /// Surface that was submitted.
        surface: SurfaceId,
        /// Surface occupying the armed slot.
        armed: SurfaceId,
    },
    /// An event arrived while the session is not streaming.
    #[error("session is not streaming")]
    NotStreaming,
    /// `start` was called on a running session.
    #[error("session is already streaming")]
    AlreadyStreaming,
    /// The capture pipeline rejected an operation.
    #[error("producer error: {0}")]
    Producer(String),
    /// The display rejected an operation.
    #[error("display error: {0}")]
    Display(String),
    /// Session configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExchangeError {
    /// Whether this error means producer and consumer disagree about buffer
    /// ownership. The session must be torn down when this is true.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnknownBuffer(_)
                | Self::UnknownSurface(_)
                | Self::DuplicateBinding { .. }
                | Self::DoubleQueue(_)
                | Self::FlipPending { .. }
        )
    }
}

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Capture side of the exchange.
pub trait FrameProducer {
    /// Return a consumed buffer to the capture pipeline for a new capture.
    fn resubmit(&mut self, buffer: BufferId) -> Result<()>;

    /// Start capturing.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing. Buffers still owned by the pipeline are reclaimed here.
    fn stop(&mut self) -> Result<()>;
}

/// Display side of the exchange.
pub trait PresentationSink {
    /// Schedule `surface` for the next flip.
    ///
    /// At most one surface may be outstanding at a time; the caller is
    /// expected to wait for the flip notification before queueing another.
    fn queue_for_presentation(&mut self, surface: SurfaceId) -> Result<()>;

    /// Stop presenting. No flip notifications are delivered afterwards.
    fn stop(&mut self) -> Result<()>;
}

/// A producer whose completions can be waited on from the event loop thread.
pub trait CompletionSource {
    /// Wait up to `timeout` for the next completed buffer.
    ///
    /// Returns `Ok(None)` when nothing completed in time.
    fn poll_completion(&mut self, timeout: Duration) -> Result<Option<BufferId>>;
}
