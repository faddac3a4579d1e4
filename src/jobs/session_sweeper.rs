// Expired sessions are dropped lazily on load; this sweep reclaims the ones
// whose cookie never comes back.

use crate::middleware::MemorySessionStore;
use tokio::time::{interval, Duration};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

pub fn start_session_sweeper(store: MemorySessionStore) {
    log::info!(
        "🧹 Starting session sweeper (every {}s)",
        SWEEP_INTERVAL.as_secs()
    );

    tokio::spawn(async move {
        let mut interval = interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;
            let removed = store.purge_expired().await;
            if removed > 0 {
                log::debug!("🧹 Removed {} expired sessions", removed);
            }
        }
    });
}
