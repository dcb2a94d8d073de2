use std::sync::Arc;

use crate::config::ResetTimezone;
use crate::services::UserRegistry;
use chrono::{Days, Local, NaiveDateTime, NaiveTime, Utc};
use tokio::time::{sleep, Duration};
use tracing;

/// Zeroes every usage counter at the next midnight boundary, forever. Runs as
/// its own tokio task; the registry's lock keeps the flush from interleaving
/// with a command handler's mutation.
pub async fn reset_scheduler(registry: Arc<UserRegistry>, timezone: ResetTimezone) {
    loop {
        let wait = until_next_midnight(now_naive(timezone));
        tracing::info!("Next quota reset in {} seconds", wait.as_secs());
        sleep(wait).await;

        // A failed flush here is logged, not fatal; counters stay reset in
        // memory and the next mutating command flushes again.
        if let Err(e) = registry.reset_all() {
            tracing::error!("Daily reset failed to persist: {}", e);
        }
    }
}

fn now_naive(timezone: ResetTimezone) -> NaiveDateTime {
    match timezone {
        ResetTimezone::Local => Local::now().naive_local(),
        ResetTimezone::Utc => Utc::now().naive_utc(),
    }
}

fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_midnight = (now.date() + Days::new(1)).and_time(NaiveTime::MIN);
    let seconds = (next_midnight - now).num_seconds().max(1);
    Duration::from_secs(seconds as u64)
}
