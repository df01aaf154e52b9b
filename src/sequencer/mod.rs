//! Voice field capture sequencer: one utterance in, one state transition out.
//!
//! The sequencer owns the [`CaptureSession`] and a [`SpeechScheduler`]. Every
//! operation runs to completion before returning, writing UI effects straight
//! to the host and queueing spoken output; [`Sequencer::pump`] later releases
//! due speech and fires the optional idle re-prompt.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::export::{self, ExportFormat};
use crate::form::{
    clean_voice_input, normalize_utterance, CountryLookup, FieldRules, FormField, FormRecord,
    FormValues, PhonePolicy, ValidationRule,
};
use crate::speech::{SpeechOutput, SpeechScheduler};
use crate::submit::{SubmissionEndpoint, SubmissionReceipt};
use crate::surface::{FieldIndicator, FormSurface};

pub const DEFAULT_SPEECH_DELAY_MS: u64 = 1000;
pub const DEFAULT_PROMPT_DELAY_MS: u64 = 3000;

const FORM_COMPLETE: &str = "Form is filled. Please review and click Submit.";
const NOT_CAUGHT: &str = "I didn't catch that. Please try again.";
const FORM_CLEARED: &str = "Form cleared.";
const SUBMIT_INCOMPLETE: &str = "Please ensure all fields are filled correctly before submitting.";
const SUBMIT_SUCCESS: &str = "Form submitted successfully! Next user can start now.";
const DOWNLOAD_INCOMPLETE: &str = "Form is incomplete to download.";
const DOWNLOAD_SUCCESS: &str = "Form data has been successfully downloaded.";
const DOWNLOAD_FAILED: &str = "Sorry, the form data could not be saved.";
const HELP_LINES: [&str; 4] = [
    "Welcome to the voice-enabled form.",
    "Click 'Start Voice Input' to fill the form using your voice.",
    "You can also type manually, and I will validate your input.",
    "Click 'Submit' when you're done.",
];

/// Timing and policy knobs for one sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerOptions {
    /// Delay before confirmations and error messages are spoken.
    pub speech_delay: Duration,
    /// Delay before the next field's prompt is spoken, so it follows the confirmation.
    pub prompt_delay: Duration,
    /// Re-prompt the current field after this much silence while listening.
    pub idle_reprompt: Option<Duration>,
    pub phone_policy: PhonePolicy,
    /// Include utterance text in trace output.
    pub log_content: bool,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            speech_delay: Duration::from_millis(DEFAULT_SPEECH_DELAY_MS),
            prompt_delay: Duration::from_millis(DEFAULT_PROMPT_DELAY_MS),
            idle_reprompt: None,
            phone_policy: PhonePolicy::Strict,
            log_content: false,
        }
    }
}

/// State of one form-filling attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSession {
    cursor: usize,
    listening: bool,
    values: FormValues,
    completed: bool,
}

impl CaptureSession {
    /// Index of the field awaiting input; [`FormField::COUNT`] once complete.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn listening(&self) -> bool {
        self.listening
    }

    #[must_use]
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn current_field(&self) -> Option<FormField> {
        FormField::at(self.cursor)
    }
}

/// Result of an accepted utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceOutcome {
    /// Value committed; the cursor moved to `next`.
    Committed {
        field: FormField,
        value: String,
        next: FormField,
    },
    /// Value committed and it was the last field.
    Completed { field: FormField, value: String },
}

/// Drives a [`CaptureSession`] from recognized utterances to completion.
#[derive(Debug)]
pub struct Sequencer {
    session: CaptureSession,
    rules: FieldRules,
    speech: SpeechScheduler,
    options: SequencerOptions,
    idle_deadline: Option<Instant>,
}

impl Sequencer {
    /// Build a sequencer with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if the validation patterns fail to compile.
    pub fn new(options: SequencerOptions) -> Result<Self> {
        Ok(Self {
            session: CaptureSession::default(),
            rules: FieldRules::new(options.phone_policy)?,
            speech: SpeechScheduler::new(),
            options,
            idle_deadline: None,
        })
    }

    #[must_use]
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    #[must_use]
    pub fn options(&self) -> &SequencerOptions {
        &self.options
    }

    /// Generation of the speech scheduler; bumped by `start` and `clear`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.speech.generation()
    }

    #[must_use]
    pub fn pending_speech(&self) -> usize {
        self.speech.pending_len()
    }

    /// Open the speech channel and prompt the first field still missing a value.
    ///
    /// Speech queued by earlier generations is discarded. When every field is
    /// already filled and valid the channel stays closed and the completion
    /// notice is spoken instead.
    pub fn start<H>(&mut self, now: Instant, host: &mut H) -> Result<(), CaptureError>
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        if self.session.listening {
            debug!("start ignored: already listening");
            return Err(CaptureError::AlreadyListening);
        }
        self.speech.advance_generation();
        self.session.cursor = self.resume_index();
        self.session.completed = false;

        let Some(field) = self.session.current_field() else {
            self.session.completed = true;
            info!("start on a filled form; announcing completion");
            self.speech.schedule(FORM_COMPLETE, self.options.speech_delay, now);
            return Ok(());
        };

        self.session.listening = true;
        info!(field = %field, generation = self.speech.generation(), "voice capture started");
        self.emit_prompt(field, self.options.prompt_delay, now, host);
        self.arm_idle(now, self.options.prompt_delay);
        Ok(())
    }

    /// Close the speech channel and cancel pending speech. Idempotent.
    pub fn stop<H>(&mut self, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        if self.session.listening {
            info!(cursor = self.session.cursor, "voice capture stopped");
        }
        self.session.listening = false;
        self.idle_deadline = None;
        self.cancel_speech(host);
    }

    /// Feed one recognized utterance to the active field.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NotAccepting`] when the channel is closed or the form is
    /// complete; [`CaptureError::CountryNotRecognized`] and
    /// [`CaptureError::ValidationFailed`] when the value is rejected. Rejections
    /// leave the cursor and values untouched.
    pub fn submit_utterance<H>(
        &mut self,
        raw: &str,
        now: Instant,
        host: &mut H,
    ) -> Result<UtteranceOutcome, CaptureError>
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        let field = match self.session.current_field() {
            Some(field) if self.session.listening => field,
            _ => return Err(CaptureError::NotAccepting),
        };
        if self.options.log_content {
            debug!(field = %field, utterance = raw, "utterance received");
        } else {
            debug!(field = %field, "utterance received");
        }

        let value = match normalize_utterance(field, raw) {
            Ok(value) => value,
            Err(err) => {
                let rule = ValidationRule::for_field(field);
                self.speech
                    .schedule(rule.spoken_failure, self.options.speech_delay, now);
                self.arm_idle(now, self.options.speech_delay);
                debug!(field = %field, "country not recognized");
                return Err(err);
            }
        };

        if let Err(failure) = self.rules.validate(field, &value, &self.session.values) {
            host.set_indicator(field, FieldIndicator::Error(failure.message.clone()));
            self.speech
                .schedule(failure.spoken, self.options.speech_delay, now);
            self.arm_idle(now, self.options.speech_delay);
            debug!(field = %field, "utterance rejected by validation");
            return Err(CaptureError::ValidationFailed {
                field,
                reason: failure.message,
            });
        }

        self.commit(field, &value, host);
        let confirmation = confirmation_text(field, &value, &clean_voice_input(raw));
        self.speech
            .schedule(confirmation, self.options.speech_delay, now);
        self.session.cursor += 1;

        match self.session.current_field() {
            Some(next) => {
                self.emit_prompt(next, self.options.prompt_delay, now, host);
                self.arm_idle(now, self.options.prompt_delay);
                Ok(UtteranceOutcome::Committed { field, value, next })
            }
            None => {
                self.session.completed = true;
                self.session.listening = false;
                self.idle_deadline = None;
                self.speech
                    .schedule(FORM_COMPLETE, self.options.speech_delay, now);
                info!("form capture completed");
                Ok(UtteranceOutcome::Completed { field, value })
            }
        }
    }

    /// The recognizer failed to transcribe. Nothing changes; the user is asked to repeat.
    pub fn recognition_error(&mut self, now: Instant) -> CaptureError {
        debug!("transient recognition error");
        self.speech.schedule(NOT_CAUGHT, self.options.speech_delay, now);
        if self.session.listening {
            self.arm_idle(now, self.options.speech_delay);
        }
        CaptureError::RecognitionTransient
    }

    /// Whether the adapter should re-open a speech channel that ended on its own.
    #[must_use]
    pub fn channel_ended(&self) -> bool {
        self.session.listening && self.session.cursor < FormField::COUNT
    }

    /// Apply a typed edit to `field`, outside the voice channel.
    ///
    /// The value is kept even when invalid, as the input box keeps it; the
    /// indicator shows the verdict. A blank edit empties the field.
    ///
    /// # Errors
    ///
    /// [`CaptureError::ValidationFailed`] when the edited value fails its rule.
    pub fn edit_field<H>(
        &mut self,
        field: FormField,
        raw: &str,
        now: Instant,
        host: &mut H,
    ) -> Result<(), CaptureError>
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        let value = normalize_utterance(field, raw).unwrap_or_else(|_| {
            CountryLookup::resolve(raw)
                .map(str::to_string)
                .unwrap_or_else(|| clean_voice_input(raw))
        });

        let result = if value.is_empty() {
            self.session.values.remove(field);
            host.set_value(field, "");
            host.set_indicator(field, FieldIndicator::Hidden);
            Ok(())
        } else {
            self.session.values.set(field, value.clone());
            host.set_value(field, &value);
            match self.rules.validate(field, &value, &self.session.values) {
                Ok(()) => {
                    let rule = ValidationRule::for_field(field);
                    host.set_indicator(field, FieldIndicator::Valid(rule.success_text.to_string()));
                    Ok(())
                }
                Err(failure) => {
                    host.set_indicator(field, FieldIndicator::Error(failure.message.clone()));
                    self.speech
                        .schedule(failure.spoken, self.options.speech_delay, now);
                    Err(CaptureError::ValidationFailed {
                        field,
                        reason: failure.message,
                    })
                }
            }
        };
        self.session.completed = self.session.cursor == FormField::COUNT && self.is_complete();
        debug!(field = %field, valid = result.is_ok(), "manual edit applied");
        result
    }

    /// Every field currently holds a value that passes its rule.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rules.all_valid(&self.session.values)
    }

    /// Reset to a fresh session: cancel speech, close the channel, empty the form.
    pub fn clear<H>(&mut self, now: Instant, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        self.reset(host);
        self.speech.schedule(FORM_CLEARED, self.options.speech_delay, now);
        info!("form cleared");
    }

    /// Speak the usage instructions.
    pub fn help(&mut self, now: Instant) {
        for line in HELP_LINES {
            self.speech.schedule(line, self.options.speech_delay, now);
        }
    }

    /// Release due speech and fire the idle re-prompt when its window has elapsed.
    pub fn pump<H>(&mut self, now: Instant, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        if let Some(deadline) = self.idle_deadline {
            if deadline <= now {
                match self.session.current_field() {
                    Some(field) if self.session.listening => {
                        debug!(field = %field, "idle window elapsed; re-prompting");
                        self.emit_prompt(field, Duration::ZERO, now, host);
                        self.arm_idle(now, Duration::ZERO);
                    }
                    _ => self.idle_deadline = None,
                }
            }
        }
        self.speech.release_due(now, host);
    }

    /// Speak everything still queued right away, ignoring delays. Disarms the idle window.
    pub fn flush_speech<H>(&mut self, host: &mut H) -> usize
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        self.idle_deadline = None;
        let pending = self.speech.drain_pending();
        for text in &pending {
            host.speak(text);
        }
        pending.len()
    }

    /// Earliest instant at which [`Sequencer::pump`] has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.speech.next_deadline(), self.idle_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Record of the current values, when all of them are valid.
    #[must_use]
    pub fn complete_record(&self) -> Option<FormRecord> {
        if self.is_complete() {
            self.session.values.to_record()
        } else {
            None
        }
    }

    /// Send the completed form to `endpoint` once.
    ///
    /// On success the endpoint message is shown and the session resets for the
    /// next user. On rejection the message is shown verbatim and the session is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// [`CaptureError::FormIncomplete`] when a field is missing or invalid;
    /// [`CaptureError::SubmissionRejected`] when the endpoint refuses.
    pub fn submit<E, H>(
        &mut self,
        endpoint: &E,
        now: Instant,
        host: &mut H,
    ) -> Result<SubmissionReceipt, CaptureError>
    where
        E: SubmissionEndpoint + ?Sized,
        H: FormSurface + SpeechOutput + ?Sized,
    {
        let Some(record) = self.complete_record() else {
            self.speech
                .schedule(SUBMIT_INCOMPLETE, self.options.speech_delay, now);
            return Err(CaptureError::FormIncomplete);
        };
        match endpoint.submit(&record) {
            Ok(receipt) => {
                host.notify(&receipt.message);
                self.reset(host);
                self.speech
                    .schedule(SUBMIT_SUCCESS, self.options.speech_delay, now);
                info!("form submitted");
                Ok(receipt)
            }
            Err(err) => {
                let message = match &err {
                    CaptureError::SubmissionRejected { message } => message.clone(),
                    other => other.to_string(),
                };
                warn!(error = %err, "form submission failed");
                host.notify(&message);
                Err(err)
            }
        }
    }

    /// Save the completed form into `dir`.
    ///
    /// # Errors
    ///
    /// [`CaptureError::FormIncomplete`] when a field is missing or invalid;
    /// [`CaptureError::Export`] when the file cannot be written.
    pub fn download(
        &mut self,
        dir: &Path,
        format: ExportFormat,
        now: Instant,
    ) -> Result<PathBuf, CaptureError> {
        let Some(record) = self.complete_record() else {
            self.speech
                .schedule(DOWNLOAD_INCOMPLETE, self.options.speech_delay, now);
            return Err(CaptureError::FormIncomplete);
        };
        match export::write_download(&record, dir, format) {
            Ok(path) => {
                self.speech
                    .schedule(DOWNLOAD_SUCCESS, self.options.speech_delay, now);
                info!(path = %path.display(), "form downloaded");
                Ok(path)
            }
            Err(err) => {
                warn!(error = %err, "form download failed");
                self.speech
                    .schedule(DOWNLOAD_FAILED, self.options.speech_delay, now);
                Err(err)
            }
        }
    }

    fn resume_index(&self) -> usize {
        let values = &self.session.values;
        let first_empty = values.first_unfilled();
        if first_empty < FormField::COUNT {
            return first_empty;
        }
        FormField::ALL
            .iter()
            .position(|field| {
                values
                    .get(*field)
                    .is_some_and(|value| self.rules.validate(*field, value, values).is_err())
            })
            .unwrap_or(FormField::COUNT)
    }

    fn commit<H>(&mut self, field: FormField, value: &str, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        self.session.values.set(field, value);
        host.set_value(field, value);
        let rule = ValidationRule::for_field(field);
        host.set_indicator(field, FieldIndicator::Valid(rule.success_text.to_string()));
        info!(field = %field, "field committed");
    }

    fn emit_prompt<H>(&mut self, field: FormField, delay: Duration, now: Instant, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        host.focus(field);
        self.speech.schedule(prompt_text(field), delay, now);
    }

    /// Restart the silence window once speech queued `lead` from `now` has played.
    fn arm_idle(&mut self, now: Instant, lead: Duration) {
        self.idle_deadline = self
            .options
            .idle_reprompt
            .map(|window| now + lead + window);
    }

    fn cancel_speech<H>(&mut self, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        let dropped = self.speech.cancel_all();
        if dropped > 0 {
            debug!(dropped, "cancelled pending speech");
        }
        host.cancel_speech();
    }

    fn reset<H>(&mut self, host: &mut H)
    where
        H: FormSurface + SpeechOutput + ?Sized,
    {
        self.cancel_speech(host);
        self.speech.advance_generation();
        self.session = CaptureSession::default();
        self.idle_deadline = None;
        for field in FormField::ALL {
            host.set_value(field, "");
            host.set_indicator(field, FieldIndicator::Hidden);
        }
    }
}

fn prompt_text(field: FormField) -> String {
    format!("Please provide your {}.", field.spoken_label())
}

fn confirmation_text(field: FormField, value: &str, heard: &str) -> String {
    match field {
        FormField::Name => format!("You have entered {value} as your name."),
        FormField::Email => format!("You have entered {heard} as your email."),
        FormField::CountryCode => format!("You have selected {heard} as your country."),
        FormField::Phone => format!("You have entered {value} as your phone number."),
    }
}
