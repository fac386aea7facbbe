pub mod device;
pub mod sampler;

pub use device::{CameraDevice, DeviceError, UsbCamera};
pub use sampler::{sample, CapturedFrame};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// One decoded RGB frame as the device is delivering it right now.
///
/// Dimensions belong to this grab only; the device may renegotiate its
/// resolution between grabs, so nothing downstream caches them.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Failures while producing a frame. All of these are per-tick: the polling
/// loop retries on its next tick rather than tearing the session down.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The device has no current frame (released, or stream not yet playing).
    #[error("capture device is not active")]
    DeviceInactive,
    #[error("frame grab failed: {0}")]
    Grab(String),
    #[error("frame encode failed: {0}")]
    Encode(String),
}
