//! Typed JSON-lines protocol between the capture core and a speech/UI adapter.
//!
//! Commands arrive on stdin and events leave on stdout, one JSON object per
//! line. Commands are tagged by `cmd`, events by `event`.

use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;
use crate::form::{FormField, FormValues};
use crate::surface::FieldIndicator;

// ============================================================================
// IPC Events (core → adapter)
// ============================================================================

/// Events emitted by the capture core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum IpcEvent {
    /// Sent once on startup.
    #[serde(rename = "ready")]
    Ready {
        version: String,
        /// Fields in capture order.
        fields: Vec<FormField>,
        /// Where `submit` posts the record.
        submit_url: String,
    },

    /// Speak this text now.
    #[serde(rename = "speak")]
    Speak { text: String },

    /// Silence the synthesizer and drop its queue.
    #[serde(rename = "speech_cancel")]
    SpeechCancel,

    /// Move input focus and the active highlight to `field`.
    #[serde(rename = "focus")]
    Focus { field: FormField },

    /// Show `value` in the field's input.
    #[serde(rename = "field_value")]
    FieldValue { field: FormField, value: String },

    /// Update the validity marker next to a field.
    #[serde(rename = "indicator")]
    Indicator {
        field: FormField,
        /// `hidden`, `valid` or `error`.
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Blocking message for the user.
    #[serde(rename = "notice")]
    Notice { message: String },

    /// The speech channel opened or closed.
    #[serde(rename = "listening")]
    Listening { active: bool },

    /// The recognizer ended on its own while input is still expected.
    #[serde(rename = "reopen_channel")]
    ReopenChannel,

    /// Every field was captured through the voice channel.
    #[serde(rename = "completed")]
    Completed,

    #[serde(rename = "submitted")]
    Submitted { message: String },

    #[serde(rename = "downloaded")]
    Downloaded { path: String },

    /// Snapshot of the capture session.
    #[serde(rename = "status")]
    Status {
        cursor: usize,
        listening: bool,
        completed: bool,
        values: FormValues,
    },

    /// Error (recoverable or fatal)
    #[serde(rename = "error")]
    Error {
        /// Human-readable error description.
        message: String,
        /// Whether the adapter may keep sending commands.
        recoverable: bool,
    },
}

impl IpcEvent {
    pub(crate) fn indicator(field: FormField, indicator: FieldIndicator) -> Self {
        let (state, message) = match indicator {
            FieldIndicator::Hidden => ("hidden", None),
            FieldIndicator::Valid(message) => ("valid", Some(message)),
            FieldIndicator::Error(message) => ("error", Some(message)),
        };
        Self::Indicator {
            field,
            state: state.to_string(),
            message,
        }
    }

    pub(crate) fn recoverable_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            recoverable: true,
        }
    }
}

// ============================================================================
// IPC Commands (adapter → core)
// ============================================================================

/// Commands received from the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd")]
pub enum IpcCommand {
    /// Open the speech channel and prompt the next field.
    #[serde(rename = "start")]
    Start,

    #[serde(rename = "stop")]
    Stop,

    /// A final recognition result.
    #[serde(rename = "utterance")]
    Utterance { text: String },

    /// The recognizer failed to transcribe.
    #[serde(rename = "recognition_error")]
    RecognitionError,

    /// The recognizer ended on its own.
    #[serde(rename = "channel_end")]
    ChannelEnd,

    /// Typed edit of a field.
    #[serde(rename = "edit")]
    Edit { field: FormField, value: String },

    #[serde(rename = "clear")]
    Clear,

    #[serde(rename = "help")]
    Help,

    #[serde(rename = "submit")]
    Submit,

    #[serde(rename = "download")]
    Download {
        /// Overrides the configured format for this download.
        #[serde(default)]
        format: Option<ExportFormat>,
    },

    /// Request a `status` event.
    #[serde(rename = "status")]
    Status,

    #[serde(rename = "quit")]
    Quit,
}
