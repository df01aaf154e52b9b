//! Event output: JSON lines on a writer, doubling as the sequencer's host.

use std::io::{self, Write};

use crate::form::FormField;
use crate::speech::SpeechOutput;
use crate::surface::{FieldIndicator, FormSurface};

use super::protocol::IpcEvent;

/// Write one event line straight to stdout.
pub(super) fn send_event(event: &IpcEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{json}");
        let _ = stdout.flush();
    }
}

/// Serializes every host effect as an [`IpcEvent`] line.
#[derive(Debug)]
pub struct JsonEventWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonEventWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn send(&mut self, event: &IpcEvent) {
        let Ok(mut line) = serde_json::to_string(event) else {
            return;
        };
        line.push('\n');
        if let Err(err) = self
            .out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
        {
            tracing::warn!(error = %err, "failed to write IPC event");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FormSurface for JsonEventWriter<W> {
    fn set_value(&mut self, field: FormField, value: &str) {
        self.send(&IpcEvent::FieldValue {
            field,
            value: value.to_string(),
        });
    }

    fn focus(&mut self, field: FormField) {
        self.send(&IpcEvent::Focus { field });
    }

    fn set_indicator(&mut self, field: FormField, indicator: FieldIndicator) {
        self.send(&IpcEvent::indicator(field, indicator));
    }

    fn notify(&mut self, message: &str) {
        self.send(&IpcEvent::Notice {
            message: message.to_string(),
        });
    }
}

impl<W: Write> SpeechOutput for JsonEventWriter<W> {
    fn speak(&mut self, text: &str) {
        self.send(&IpcEvent::Speak {
            text: text.to_string(),
        });
    }

    fn cancel_speech(&mut self) {
        self.send(&IpcEvent::SpeechCancel);
    }
}
