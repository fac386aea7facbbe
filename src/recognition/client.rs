//! Recognition endpoint client.
//!
//! One request per captured frame, bounded by the configured timeout. Retry
//! policy lives in the polling session, not here; each call is independent
//! and the client keeps no state between calls.

use serde::Deserialize;
use thiserror::Error;

use crate::camera::CapturedFrame;
use crate::config::Config;

use super::RecognitionOutcome;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("recognition request timed out")]
    Timeout,
    #[error("recognition transport failed: {0}")]
    Http(String),
    #[error("recognition response malformed: {0}")]
    Protocol(String),
}

/// Classifies one frame against the attendance service.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, frame: &CapturedFrame) -> Result<RecognitionOutcome, TransportError>;
}

/// Wire shape of the endpoint's reply.
#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    status: String,
    #[serde(default)]
    person_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpRecognizer {
    client: reqwest::blocking::Client,
    url: String,
    station_id: String,
}

impl HttpRecognizer {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| TransportError::Http(err.to_string()))?;

        Ok(Self {
            client,
            url: format!(
                "{}/api/attendance/recognize",
                config.endpoint.trim_end_matches('/')
            ),
            station_id: config.station_id.clone(),
        })
    }
}

impl Recognizer for HttpRecognizer {
    fn recognize(&self, frame: &CapturedFrame) -> Result<RecognitionOutcome, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .header("X-Station-Id", &self.station_id)
            .body(frame.png.clone())
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Http(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Http(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let payload: RecognitionResponse = response
            .json()
            .map_err(|err| TransportError::Protocol(err.to_string()))?;
        classify(payload)
    }
}

/// Map the server's status vocabulary onto the outcome taxonomy.
fn classify(payload: RecognitionResponse) -> Result<RecognitionOutcome, TransportError> {
    let RecognitionResponse {
        status,
        person_id,
        display_name,
        message,
    } = payload;

    match status.as_str() {
        "success" | "already_marked" => {
            let (person_id, display_name) = match (person_id, display_name) {
                (Some(id), Some(name)) => (id, name),
                _ => {
                    return Err(TransportError::Protocol(format!(
                        "'{status}' reply missing subject fields"
                    )))
                }
            };
            Ok(if status == "success" {
                RecognitionOutcome::Recognized {
                    person_id,
                    display_name,
                }
            } else {
                RecognitionOutcome::AlreadyMarked {
                    person_id,
                    display_name,
                }
            })
        }
        "not_found" => Ok(RecognitionOutcome::NotRecognized),
        other => Ok(RecognitionOutcome::Failed(
            message.unwrap_or_else(|| format!("server reported '{other}'")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RecognitionResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn success_maps_to_recognized() {
        let payload = parse(
            r#"{"status":"success","person_id":"emp-42","display_name":"Ana Gómez"}"#,
        );
        assert_eq!(
            classify(payload).unwrap(),
            RecognitionOutcome::Recognized {
                person_id: "emp-42".into(),
                display_name: "Ana Gómez".into(),
            }
        );
    }

    #[test]
    fn already_marked_maps_to_already_marked() {
        let payload = parse(
            r#"{"status":"already_marked","person_id":"emp-42","display_name":"Ana Gómez"}"#,
        );
        assert_eq!(
            classify(payload).unwrap(),
            RecognitionOutcome::AlreadyMarked {
                person_id: "emp-42".into(),
                display_name: "Ana Gómez".into(),
            }
        );
    }

    #[test]
    fn not_found_maps_to_not_recognized() {
        let payload = parse(r#"{"status":"not_found"}"#);
        assert_eq!(classify(payload).unwrap(), RecognitionOutcome::NotRecognized);
    }

    #[test]
    fn unknown_status_maps_to_failed_with_server_message() {
        let payload = parse(r#"{"status":"error","message":"face detector offline"}"#);
        assert_eq!(
            classify(payload).unwrap(),
            RecognitionOutcome::Failed("face detector offline".into())
        );
    }

    #[test]
    fn unknown_status_without_message_still_names_the_status() {
        let payload = parse(r#"{"status":"throttled"}"#);
        match classify(payload).unwrap() {
            RecognitionOutcome::Failed(reason) => assert!(reason.contains("throttled")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn match_without_subject_fields_is_a_protocol_error() {
        let payload = parse(r#"{"status":"success"}"#);
        assert!(matches!(
            classify(payload),
            Err(TransportError::Protocol(_))
        ));
    }
}
