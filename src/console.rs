//! Operator console: line commands in, one-line session status out.

use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::kernel::event::{ConsoleCommand, Event};
use crate::kernel::state::SessionView;

/// Reads commands line by line and forwards them to the reactor.
///
/// Blocking. Run it on a dedicated OS thread so the single-threaded runtime
/// never waits on the terminal. Returns after `shutdown`/`close`, at end of
/// input, or once the reactor is gone.
pub fn read_commands<R: BufRead>(input: R, tx: mpsc::Sender<Event>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(target: "console", "failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match line.parse::<ConsoleCommand>() {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!(target: "console", "{}", e);
                continue;
            }
        };

        if tx.blocking_send(Event::Console(cmd)).is_err() {
            break;
        }
        if matches!(cmd, ConsoleCommand::Shutdown | ConsoleCommand::Close) {
            break;
        }
    }
    info!(target: "console", "console input closed");
}

pub fn format_view(title: &str, view: &SessionView) -> String {
    format!(
        "[{}] {} row={} pass={} plants={} samples={} steps={} sightings={} remaining={}s",
        title,
        if view.running { "RUNNING" } else { "STOPPED" },
        view.row,
        view.pass,
        view.plant_count,
        view.samples_collected,
        view.action_count,
        view.sightings.len(),
        view.remaining.as_secs(),
    )
}
