pub mod client;
pub mod outcome;

pub use client::{HttpRecognizer, Recognizer, TransportError};
pub use outcome::RecognitionOutcome;
