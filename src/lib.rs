//! Voice-driven form capture library shared by the `voiceform` binary and embedders.
//!
//! The [`Sequencer`] walks a four-field form (name, email, country code, phone)
//! one recognized utterance at a time. Speech synthesis and the visual form are
//! reached through the [`SpeechOutput`] and [`FormSurface`] traits so hosts can
//! plug in a browser bridge, a desktop shell, or the bundled JSON-lines adapter.

pub mod config;
pub mod error;
pub mod export;
pub mod form;
pub mod ipc;
pub mod sequencer;
pub mod speech;
pub mod submit;
pub mod surface;
mod telemetry;

pub use error::CaptureError;
pub use form::{FormField, FormRecord, FormValues};
pub use sequencer::{CaptureSession, Sequencer, SequencerOptions, UtteranceOutcome};
pub use speech::{SpeechOutput, SpeechScheduler};
pub use surface::{FieldIndicator, FormSurface};
pub use telemetry::{init_tracing, tracing_log_path};
