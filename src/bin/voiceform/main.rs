//! `voiceform` entrypoint: resolve settings, start tracing, and serve JSON-lines IPC.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use voiceform::config::{load_file_config, AppConfig, Settings};
use voiceform::ipc::run_ipc_mode;
use voiceform::{init_tracing, tracing_log_path};

fn main() -> Result<()> {
    let cli = AppConfig::parse();
    let file = load_file_config(&cli)?;
    let settings = Settings::resolve(&cli, &file)?;

    init_tracing(&settings);
    if settings.logs {
        info!(
            trace_log = %tracing_log_path().display(),
            endpoint = %settings.endpoint,
            phone_policy = ?settings.phone_policy,
            "voiceform starting"
        );
    }

    run_ipc_mode(&settings)
}
