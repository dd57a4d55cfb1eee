//! Pi-Cam-Exchange: hands captured frame buffers to a display and recycles
//! them to the camera once they have been shown.
//!
//! The capture pipeline and the display are independent event sources. An
//! [`ExchangeCoordinator`] sits between them and tracks which side owns
//! each buffer, driven by an [`EventLoop`] that serializes their
//! notifications onto one thread.

pub mod config;
pub mod coordinator;
pub mod device;
pub mod display;
pub mod event_loop;
pub mod identity;
pub mod queue;
pub mod slots;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use config::SessionConfig;
pub use coordinator::{ExchangeCoordinator, ExchangeStats};
pub use device::{DeviceCapabilities, V4L2Device, V4L2Producer};
pub use display::HeadlessDisplay;
pub use event_loop::{event_channel, Event, EventLoop, EventReceiver, EventSender, SessionSummary};
pub use identity::IdentityMap;
pub use traits::{
    BufferId, CompletionSource, ExchangeError, FourCC, Format, FrameProducer, PresentationSink,
    Result, SurfaceId,
};
