// Background job that brings the store back to `Connected` after an outage
// and keeps retrying the unique indexes until they exist.
// Repository calls fail fast with `StoreUnavailable` in the meantime; this
// job is the only place that retries.

use crate::database::{ConnectionState, MongoDB};
use tokio::time::{interval, Duration};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Idle,
    CreateIndexes,
    Ping,
}

fn next_step(state: ConnectionState, indexes_ready: bool) -> Step {
    match (state, indexes_ready) {
        (ConnectionState::Connected, true) => Step::Idle,
        (ConnectionState::Connected, false) => Step::CreateIndexes,
        _ => Step::Ping,
    }
}

/// Starts the store monitor. `indexes_ready` is whether startup already
/// created the indexes; until it is true the job keeps trying.
pub fn start_store_monitor(db: MongoDB, indexes_ready: bool) {
    log::info!(
        "🩺 Starting store monitor (checks every {}s)",
        CHECK_INTERVAL.as_secs()
    );

    tokio::spawn(async move {
        let mut interval = interval(CHECK_INTERVAL);
        let mut indexes_ready = indexes_ready;

        loop {
            interval.tick().await;

            match next_step(db.state(), indexes_ready) {
                Step::Idle => continue,
                Step::CreateIndexes => {}
                Step::Ping => match db.ping().await {
                    Ok(()) => log::info!("✅ Store reachable again"),
                    Err(e) => {
                        log::debug!("⏳ Store still unreachable: {}", e);
                        continue;
                    }
                },
            }

            if !indexes_ready {
                match db.ensure_indexes().await {
                    Ok(()) => indexes_ready = true,
                    Err(e) => log::error!("❌ Failed to create indexes, retrying: {}", e),
                }
            }
        }
    });
}
