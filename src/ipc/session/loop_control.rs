use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use super::super::protocol::IpcCommand;
use super::{IpcSession, IPC_LOOP_WAIT_MS};

/// Wait for the next command or speech deadline, whichever comes first.
fn wait_budget(next_deadline: Option<Instant>, now: Instant) -> Duration {
    let ceiling = Duration::from_millis(IPC_LOOP_WAIT_MS);
    next_deadline
        .map(|deadline| deadline.saturating_duration_since(now).min(ceiling))
        .unwrap_or(ceiling)
}

/// Drive `session` from `cmd_rx` until the channel disconnects, `quit`
/// arrives, or `max_loops` iterations have run.
///
/// # Errors
///
/// Does not currently fail.
pub fn run_ipc_loop<W: Write>(
    session: &mut IpcSession<W>,
    cmd_rx: &Receiver<IpcCommand>,
    max_loops: Option<u64>,
) -> Result<()> {
    let mut loop_count: u64 = 0;
    loop {
        loop_count += 1;
        if loop_count % 1000 == 0 {
            debug!(
                loop_count,
                pending_speech = session.sequencer().pending_speech(),
                "IPC loop heartbeat"
            );
        }

        if let Some(limit) = max_loops {
            if loop_count > limit {
                debug!("IPC loop reached its iteration limit");
                break;
            }
        }

        let wait = wait_budget(session.sequencer().next_deadline(), Instant::now());
        match cmd_rx.recv_timeout(wait) {
            Ok(cmd) => {
                if session.sequencer().options().log_content {
                    debug!(?cmd, "IPC command received");
                } else {
                    debug!("IPC command received");
                }
                session.handle_command(cmd, Instant::now());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("command channel disconnected, exiting");
                break;
            }
        }

        session.pump(Instant::now());

        if session.exit_requested() {
            debug!("IPC graceful exit requested");
            break;
        }
    }

    session.finish();
    debug!("IPC mode exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_budget_is_capped_and_never_negative() {
        let now = Instant::now();
        let ceiling = Duration::from_millis(IPC_LOOP_WAIT_MS);
        assert_eq!(wait_budget(None, now), ceiling);
        assert_eq!(
            wait_budget(Some(now + Duration::from_millis(40)), now),
            Duration::from_millis(40)
        );
        assert_eq!(wait_budget(Some(now + Duration::from_secs(60)), now), ceiling);
        assert_eq!(wait_budget(Some(now), now + Duration::from_secs(1)), Duration::ZERO);
    }
}
