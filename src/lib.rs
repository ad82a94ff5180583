//! Motion-Gate: a camera motion detection engine for kiosk displays
//!
//! The engine acquires a camera, samples frames on a display-cadence tick,
//! scores frame-to-frame change with a sensitivity-controlled threshold,
//! and emits edge-triggered motion start/end events with trailing-silence
//! hysteresis. A view layer (idle loop vs. live passthrough) consumes the
//! events; this crate contains no rendering.

pub mod device;
pub mod diff;
pub mod engine;
pub mod gate;
pub mod sampler;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use device::{V4L2Provider, V4L2Session};
pub use diff::{ChangeEstimator, ChangeScore};
pub use engine::{MotionEngine, MotionEvent, MotionStatus, SessionInfo};
pub use gate::{MotionEdge, MotionGate, Sensitivity};
pub use sampler::FrameSampler;
pub use traits::{
    CameraError, CameraProvider, CameraSession, DeviceCapabilities, Format, FourCC, Frame,
    FrameBuffer, FrameMetadata,
};
