//! Optional local trace logging for debugging capture sessions.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_subscriber::fmt::time::UtcTime;

use crate::config::Settings;

const TRACE_LOG_ENV: &str = "VOICEFORM_TRACE_LOG";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Trace file location: `VOICEFORM_TRACE_LOG`, else `<tmp>/voiceform_trace.jsonl`.
#[must_use]
pub fn tracing_log_path() -> PathBuf {
    env::var(TRACE_LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("voiceform_trace.jsonl"))
}

fn init_tracing_once(enabled: bool, once: &OnceLock<()>) {
    if !enabled {
        return;
    }

    let _ = once.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Install the JSON file subscriber once, when `settings.logs` is set.
pub fn init_tracing(settings: &Settings) {
    init_tracing_once(settings.logs, &TRACING_INIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn unique_trace_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        env::temp_dir().join(format!("voiceform-trace-{suffix}-{nanos}.jsonl"))
    }

    #[test]
    fn tracing_log_path_prefers_env_override() {
        let _guard = env_lock().lock().expect("env lock");
        let path = unique_trace_path("env");
        env::set_var(TRACE_LOG_ENV, &path);
        assert_eq!(tracing_log_path(), path);
        env::remove_var(TRACE_LOG_ENV);
    }

    #[test]
    fn tracing_log_path_defaults_to_temp_dir_when_env_missing() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var(TRACE_LOG_ENV);
        let expected = env::temp_dir().join("voiceform_trace.jsonl");
        assert_eq!(tracing_log_path(), expected);
    }

    #[test]
    fn init_tracing_once_respects_enabled_flag_and_creates_file() {
        let _guard = env_lock().lock().expect("env lock");

        let enabled_path = unique_trace_path("enabled");
        let _ = fs::remove_file(&enabled_path);
        env::set_var(TRACE_LOG_ENV, &enabled_path);
        let enabled_once = OnceLock::new();
        init_tracing_once(true, &enabled_once);
        assert!(
            enabled_path.exists(),
            "enabled logging should create trace file"
        );

        let disabled_path = unique_trace_path("disabled");
        let _ = fs::remove_file(&disabled_path);
        env::set_var(TRACE_LOG_ENV, &disabled_path);
        let disabled_once = OnceLock::new();
        init_tracing_once(false, &disabled_once);
        assert!(
            !disabled_path.exists(),
            "disabled logging should not create trace file"
        );

        env::remove_var(TRACE_LOG_ENV);
        let _ = fs::remove_file(enabled_path);
        let _ = fs::remove_file(disabled_path);
    }
}
