pub mod camera;
pub mod config;
pub mod recognition;
pub mod session;
pub mod utils;
pub mod view;

pub use camera::{CameraDevice, CapturedFrame, DeviceError, SampleError, UsbCamera};
pub use config::Config;
pub use recognition::{HttpRecognizer, RecognitionOutcome, Recognizer, TransportError};
pub use session::{SessionController, SessionState, SessionStatus};
pub use view::CaptureView;
