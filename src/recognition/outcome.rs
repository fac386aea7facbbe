use serde::Serialize;

/// Classified result of a single recognition attempt.
///
/// `Recognized` and `AlreadyMarked` are terminal: the session stops.
/// `NotRecognized` and `Failed` are transient: the polling loop keeps
/// ticking until a terminal outcome or an explicit stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecognitionOutcome {
    Recognized {
        person_id: String,
        display_name: String,
    },
    AlreadyMarked {
        person_id: String,
        display_name: String,
    },
    NotRecognized,
    Failed(String),
}

impl RecognitionOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Recognized { .. } | Self::AlreadyMarked { .. })
    }

    /// Operator-facing status line for this outcome.
    pub fn operator_message(&self) -> String {
        match self {
            Self::Recognized { display_name, .. } => {
                format!("Attendance recorded for {display_name}")
            }
            Self::AlreadyMarked { display_name, .. } => {
                format!("{display_name} is already marked for this period")
            }
            Self::NotRecognized => "No match found, keep facing the camera".to_string(),
            Self::Failed(reason) => format!("Recognition attempt failed: {reason}"),
        }
    }
}
