//! Capture error taxonomy so every recoverable failure keeps the session resumable.

use std::fmt;

use crate::form::FormField;

/// Errors surfaced by sequencer operations.
///
/// None of these are fatal: the session is left in a consistent state and the
/// user can retry, or restart with `clear()` followed by `start()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// `start()` was called while the speech channel was already open.
    AlreadyListening,
    /// An utterance arrived while the channel was closed or the form was complete.
    NotAccepting,
    /// The recognizer failed to transcribe; the user is asked to repeat.
    RecognitionTransient,
    /// The normalized value failed the field's rule.
    ValidationFailed { field: FormField, reason: String },
    /// The spoken country matched no known name or alias.
    CountryNotRecognized { heard: String },
    /// Submit or download was requested before every field was valid.
    FormIncomplete,
    /// The submission endpoint refused the record or could not be reached.
    SubmissionRejected { message: String },
    /// Writing the download payload failed.
    Export { reason: String },
}

impl CaptureError {
    /// Short machine-friendly tag used in logs and IPC error events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyListening => "already_listening",
            Self::NotAccepting => "not_accepting",
            Self::RecognitionTransient => "recognition_transient",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::CountryNotRecognized { .. } => "country_not_recognized",
            Self::FormIncomplete => "form_incomplete",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::Export { .. } => "export_failed",
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyListening => write!(f, "voice input is already listening"),
            Self::NotAccepting => write!(f, "voice input is not accepting utterances"),
            Self::RecognitionTransient => write!(f, "speech was not recognized"),
            Self::ValidationFailed { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::CountryNotRecognized { heard } => write!(f, "country not recognized: {heard}"),
            Self::FormIncomplete => write!(f, "form is incomplete"),
            Self::SubmissionRejected { message } => write!(f, "submission rejected: {message}"),
            Self::Export { reason } => write!(f, "download failed: {reason}"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_field_and_reason() {
        let err = CaptureError::ValidationFailed {
            field: FormField::Email,
            reason: "missing @".to_string(),
        };
        assert_eq!(err.to_string(), "invalid email: missing @");
        assert_eq!(err.kind(), "validation_failed");
    }

    #[test]
    fn submission_rejected_keeps_message_verbatim() {
        let err = CaptureError::SubmissionRejected {
            message: "Duplicate entry!".to_string(),
        };
        assert_eq!(err.to_string(), "submission rejected: Duplicate entry!");
    }
}
