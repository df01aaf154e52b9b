//! IPC session: owns the sequencer and turns adapter commands into events.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::CaptureError;
use crate::export::ExportFormat;
use crate::form::FormField;
use crate::sequencer::{Sequencer, UtteranceOutcome};
use crate::submit::{HttpSubmitter, SubmissionEndpoint};

use super::event_sink::{send_event, JsonEventWriter};
use super::protocol::{IpcCommand, IpcEvent};

mod loop_control;

pub use loop_control::run_ipc_loop;

const IPC_LOOP_WAIT_MS: u64 = 250;

// ============================================================================
// IPC state owned by the event loop.
// ============================================================================

pub struct IpcSession<W: Write> {
    sequencer: Sequencer,
    endpoint: Box<dyn SubmissionEndpoint>,
    submit_url: String,
    download_dir: PathBuf,
    download_format: ExportFormat,
    sink: JsonEventWriter<W>,
    last_listening: bool,
    last_completed: bool,
    exit_requested: bool,
}

impl<W: Write> IpcSession<W> {
    /// Build a session around `endpoint`, writing events to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequencer cannot be built.
    pub fn new(
        settings: &Settings,
        endpoint: Box<dyn SubmissionEndpoint>,
        submit_url: impl Into<String>,
        out: W,
    ) -> Result<Self> {
        let sequencer =
            Sequencer::new(settings.sequencer_options()).context("failed to build sequencer")?;
        Ok(Self {
            sequencer,
            endpoint,
            submit_url: submit_url.into(),
            download_dir: settings.download_dir.clone(),
            download_format: settings.download_format,
            sink: JsonEventWriter::new(out),
            last_listening: false,
            last_completed: false,
            exit_requested: false,
        })
    }

    #[must_use]
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn emit_ready(&mut self) {
        self.sink.send(&IpcEvent::Ready {
            version: env!("CARGO_PKG_VERSION").to_string(),
            fields: FormField::ALL.to_vec(),
            submit_url: self.submit_url.clone(),
        });
    }

    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Run one command to completion.
    pub fn handle_command(&mut self, cmd: IpcCommand, now: Instant) {
        match cmd {
            IpcCommand::Start => {
                if let Err(err) = self.sequencer.start(now, &mut self.sink) {
                    self.report(&err);
                }
            }
            IpcCommand::Stop => self.sequencer.stop(&mut self.sink),
            IpcCommand::Utterance { text } => {
                match self.sequencer.submit_utterance(&text, now, &mut self.sink) {
                    Ok(UtteranceOutcome::Committed { field, next, .. }) => {
                        debug!(field = %field, next = %next, "utterance committed");
                    }
                    Ok(UtteranceOutcome::Completed { field, .. }) => {
                        debug!(field = %field, "last field committed");
                    }
                    Err(err) => self.report(&err),
                }
            }
            IpcCommand::RecognitionError => {
                let err = self.sequencer.recognition_error(now);
                debug!(kind = err.kind(), "recognizer reported an error");
            }
            IpcCommand::ChannelEnd => {
                if self.sequencer.channel_ended() {
                    self.sink.send(&IpcEvent::ReopenChannel);
                }
            }
            IpcCommand::Edit { field, value } => {
                if let Err(err) = self.sequencer.edit_field(field, &value, now, &mut self.sink) {
                    self.report(&err);
                }
            }
            IpcCommand::Clear => self.sequencer.clear(now, &mut self.sink),
            IpcCommand::Help => self.sequencer.help(now),
            IpcCommand::Submit => {
                match self
                    .sequencer
                    .submit(self.endpoint.as_ref(), now, &mut self.sink)
                {
                    Ok(receipt) => self.sink.send(&IpcEvent::Submitted {
                        message: receipt.message,
                    }),
                    Err(err) => self.report(&err),
                }
            }
            IpcCommand::Download { format } => {
                let format = format.unwrap_or(self.download_format);
                match self.sequencer.download(&self.download_dir, format, now) {
                    Ok(path) => self.sink.send(&IpcEvent::Downloaded {
                        path: path.display().to_string(),
                    }),
                    Err(err) => self.report(&err),
                }
            }
            IpcCommand::Status => self.emit_status(),
            IpcCommand::Quit => {
                info!("quit requested");
                self.exit_requested = true;
            }
        }
        self.sync_session_flags();
    }

    /// Release due speech and idle re-prompts.
    pub fn pump(&mut self, now: Instant) {
        self.sequencer.pump(now, &mut self.sink);
    }

    /// Emit queued speech before the adapter goes away.
    pub fn finish(&mut self) {
        let flushed = self.sequencer.flush_speech(&mut self.sink);
        if flushed > 0 {
            debug!(flushed, "flushed queued speech on exit");
        }
    }

    pub fn into_writer(self) -> W {
        self.sink.into_inner()
    }

    fn emit_status(&mut self) {
        let session = self.sequencer.session();
        let event = IpcEvent::Status {
            cursor: session.cursor(),
            listening: session.listening(),
            completed: session.completed(),
            values: session.values().clone(),
        };
        self.sink.send(&event);
    }

    fn report(&mut self, err: &CaptureError) {
        debug!(kind = err.kind(), "command failed");
        self.sink
            .send(&IpcEvent::recoverable_error(err.to_string()));
    }

    fn sync_session_flags(&mut self) {
        let session = self.sequencer.session();
        let listening = session.listening();
        let completed = session.completed();
        if listening != self.last_listening {
            self.last_listening = listening;
            self.sink.send(&IpcEvent::Listening { active: listening });
        }
        if completed != self.last_completed {
            self.last_completed = completed;
            if completed {
                self.sink.send(&IpcEvent::Completed);
            }
        }
    }
}

// ============================================================================
// Stdin Reader Thread
// ============================================================================

fn parse_command_line(line: &str) -> Option<Result<IpcCommand, String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<IpcCommand>(trimmed).map_err(|e| format!("Invalid command: {e}")))
}

fn spawn_command_reader<R>(input: R, tx: Sender<IpcCommand>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(input).lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            match parse_command_line(&line) {
                None => continue,
                Some(Ok(cmd)) => {
                    if tx.send(cmd).is_err() {
                        break; // Main thread has exited
                    }
                }
                Some(Err(message)) => {
                    send_event(&IpcEvent::recoverable_error(message));
                }
            }
        }
        debug!("stdin reader thread exiting");
    })
}

// ============================================================================
// Entry
// ============================================================================

/// Run JSON-lines IPC mode on stdin/stdout until stdin closes or `quit` arrives.
///
/// # Errors
///
/// Returns an error if the session cannot be built.
pub fn run_ipc_mode(settings: &Settings) -> Result<()> {
    info!("starting JSON IPC mode");
    let submitter = HttpSubmitter::new(
        &settings.endpoint,
        &settings.submit_path,
        settings.request_timeout,
    );
    let submit_url = submitter.url().to_string();
    let mut session = IpcSession::new(settings, Box::new(submitter), submit_url, io::stdout())?;
    session.emit_ready();

    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let _stdin_handle = spawn_command_reader(io::stdin(), cmd_tx);
    run_ipc_loop(&mut session, &cmd_rx, None)
}
