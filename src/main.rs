//! Pi-cam-exchange binary: streams a camera into the headless display.

use pi_cam_exchange::{
    event_channel, BufferId, EventLoop, ExchangeCoordinator, HeadlessDisplay, IdentityMap,
    SessionConfig, SurfaceId, V4L2Device,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        error!(%err, "session aborted");
        std::process::exit(1);
    }
}

fn run() -> pi_cam_exchange::Result<()> {
    let config = SessionConfig::from_env()?;
    let mut device = V4L2Device::open(config.device_index)?;

    let format = device.set_format(&config.format)?;
    info!(
        width = format.width,
        height = format.height,
        fourcc = ?format.fourcc,
        stride = format.stride,
        "format negotiated"
    );

    let producer = device.create_producer(config.buffer_count)?;

    // Framebuffer id 0 means "no framebuffer" on KMS, so surfaces start at 1.
    let identity = IdentityMap::from_pairs(
        producer
            .buffer_ids()
            .map(|BufferId(index)| (BufferId(index), SurfaceId(index + 1))),
    )?;

    let (sender, receiver) = event_channel();
    let display = HeadlessDisplay::new(config.refresh_interval, sender)?;
    let coordinator = ExchangeCoordinator::new(identity, producer, display);

    let summary = EventLoop::new(coordinator, receiver)
        .with_frame_limit(config.max_frames)
        .run_polled(config.refresh_interval / 4)?;

    info!(
        events = summary.events,
        frames = summary.stats.buffers_ready,
        flips = summary.stats.flips,
        recycled = summary.stats.resubmitted,
        queue_high_water = summary.stats.queue_high_water,
        "done"
    );
    Ok(())
}
