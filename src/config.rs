//! Runtime configuration: CLI flags, an optional TOML file, and the resolved settings.
//!
//! Precedence is CLI flag, then config file, then built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::export::ExportFormat;
use crate::form::PhonePolicy;
use crate::sequencer::{SequencerOptions, DEFAULT_PROMPT_DELAY_MS, DEFAULT_SPEECH_DELAY_MS};
use crate::submit::DEFAULT_SUBMIT_PATH;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const MAX_DELAY_MS: u64 = 60_000;
const MIN_IDLE_REPROMPT_MS: u64 = 1_000;
const MAX_IDLE_REPROMPT_MS: u64 = 600_000;
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Parser, Clone, Default)]
#[command(
    name = "voiceform",
    about = "Voice-driven form capture over JSON lines",
    author,
    version
)]
pub struct AppConfig {
    /// Base URL of the submission endpoint
    #[arg(long, env = "VOICEFORM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Path appended to the endpoint for submissions
    #[arg(long = "submit-path")]
    pub submit_path: Option<String>,

    /// Directory that receives downloaded form data
    #[arg(long = "download-dir", env = "VOICEFORM_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Default download format
    #[arg(long = "download-format", value_enum)]
    pub download_format: Option<ExportFormat>,

    /// Delay before confirmations and error messages are spoken (ms)
    #[arg(long = "speech-delay-ms")]
    pub speech_delay_ms: Option<u64>,

    /// Delay before the next field prompt is spoken (ms)
    #[arg(long = "prompt-delay-ms")]
    pub prompt_delay_ms: Option<u64>,

    /// Re-prompt the current field after this much silence (ms); 0 disables
    #[arg(long = "idle-reprompt-ms")]
    pub idle_reprompt_ms: Option<u64>,

    /// Phone number rule
    #[arg(long = "phone-policy", value_enum)]
    pub phone_policy: Option<PhonePolicy>,

    /// Submission request timeout (ms)
    #[arg(long = "request-timeout-ms")]
    pub request_timeout_ms: Option<u64>,

    /// Config file (defaults to <config dir>/voiceform/config.toml)
    #[arg(long = "config", env = "VOICEFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write JSON trace logs
    #[arg(long = "logs", default_value_t = false)]
    pub logs: bool,

    /// Disable trace logs even when enabled elsewhere
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,

    /// Include utterance text in trace logs
    #[arg(long = "log-content", default_value_t = false)]
    pub log_content: bool,
}

/// Optional settings read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub submit_path: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub download_format: Option<ExportFormat>,
    pub speech_delay_ms: Option<u64>,
    pub prompt_delay_ms: Option<u64>,
    pub idle_reprompt_ms: Option<u64>,
    pub phone_policy: Option<PhonePolicy>,
    pub request_timeout_ms: Option<u64>,
    pub logs: Option<bool>,
    pub log_content: Option<bool>,
}

/// Fully resolved settings used by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub submit_path: String,
    pub download_dir: PathBuf,
    pub download_format: ExportFormat,
    pub speech_delay: Duration,
    pub prompt_delay: Duration,
    pub idle_reprompt: Option<Duration>,
    pub phone_policy: PhonePolicy,
    pub request_timeout: Duration,
    pub logs: bool,
    pub log_content: bool,
}

impl Settings {
    /// Merge CLI flags over the file config over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a delay or timeout is out of range.
    pub fn resolve(cli: &AppConfig, file: &FileConfig) -> Result<Self> {
        let speech_delay_ms = cli
            .speech_delay_ms
            .or(file.speech_delay_ms)
            .unwrap_or(DEFAULT_SPEECH_DELAY_MS);
        validate_delay_ms("speech-delay", speech_delay_ms)?;
        let prompt_delay_ms = cli
            .prompt_delay_ms
            .or(file.prompt_delay_ms)
            .unwrap_or(DEFAULT_PROMPT_DELAY_MS);
        validate_delay_ms("prompt-delay", prompt_delay_ms)?;

        let idle_reprompt = match cli.idle_reprompt_ms.or(file.idle_reprompt_ms) {
            None | Some(0) => None,
            Some(ms) => {
                if !(MIN_IDLE_REPROMPT_MS..=MAX_IDLE_REPROMPT_MS).contains(&ms) {
                    return Err(anyhow!(
                        "--idle-reprompt-ms must be 0 or between {MIN_IDLE_REPROMPT_MS} and {MAX_IDLE_REPROMPT_MS} ms"
                    ));
                }
                Some(Duration::from_millis(ms))
            }
        };

        let request_timeout_ms = cli
            .request_timeout_ms
            .or(file.request_timeout_ms)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if request_timeout_ms == 0 {
            return Err(anyhow!("--request-timeout-ms must be greater than 0"));
        }

        Ok(Self {
            endpoint: cli
                .endpoint
                .clone()
                .or_else(|| file.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            submit_path: cli
                .submit_path
                .clone()
                .or_else(|| file.submit_path.clone())
                .unwrap_or_else(|| DEFAULT_SUBMIT_PATH.to_string()),
            download_dir: cli
                .download_dir
                .clone()
                .or_else(|| file.download_dir.clone())
                .unwrap_or_else(default_download_dir),
            download_format: cli
                .download_format
                .or(file.download_format)
                .unwrap_or_default(),
            speech_delay: Duration::from_millis(speech_delay_ms),
            prompt_delay: Duration::from_millis(prompt_delay_ms),
            idle_reprompt,
            phone_policy: cli.phone_policy.or(file.phone_policy).unwrap_or_default(),
            request_timeout: Duration::from_millis(request_timeout_ms),
            logs: !cli.no_logs && (cli.logs || file.logs.unwrap_or(false)),
            log_content: cli.log_content || file.log_content.unwrap_or(false),
        })
    }

    #[must_use]
    pub fn sequencer_options(&self) -> SequencerOptions {
        SequencerOptions {
            speech_delay: self.speech_delay,
            prompt_delay: self.prompt_delay,
            idle_reprompt: self.idle_reprompt,
            phone_policy: self.phone_policy,
            log_content: self.log_content,
        }
    }
}

fn validate_delay_ms(label: &str, value: u64) -> Result<()> {
    if value > MAX_DELAY_MS {
        return Err(anyhow!("--{label}-ms must be at most {MAX_DELAY_MS} ms"));
    }
    Ok(())
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Default config file location (`<config dir>/voiceform/config.toml`).
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("voiceform").join(CONFIG_FILE))
}

/// Parse a config file.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not valid config TOML.
pub fn parse_file_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Load the file config named by `--config`, or the default file when present.
///
/// An explicit path must exist; a missing default file yields an empty config.
///
/// # Errors
///
/// Returns an error when the chosen file cannot be read or parsed.
pub fn load_file_config(cli: &AppConfig) -> Result<FileConfig> {
    if let Some(path) = &cli.config {
        return parse_file_config(path);
    }
    match config_file_path() {
        Some(path) if path.is_file() => parse_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}
