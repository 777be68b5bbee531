use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a storage backend installed, holding the state in degraded mode while it is unreachable.
///
/// `connect` is called with exponential backoff until it yields a store. The store is then
/// polled; a failed poll triggers in-place reconnects and, when those are exhausted, a fresh
/// `connect`.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;
                monitor(&state, store.as_ref()).await;
                warn!("storage lost; reconnecting from scratch");
            }
            Err(err) => {
                state.update_degraded(true).await;
                warn!(error = %err, retry_in = ?delay, "storage connection attempt failed");
            }
        }
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll `store` until it stays unreachable after every reconnect attempt.
async fn monitor(state: &SharedState, store: &dyn GameStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("storage healthy again; leaving degraded mode");
                state.update_degraded(false).await;
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        if !reconnect(state, store).await {
            warn!(
                attempts = MAX_RECONNECT_ATTEMPTS,
                "exhausted storage reconnect attempts; staying in degraded mode"
            );
            return;
        }
        state.update_degraded(false).await;
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

/// Retry the existing connection, entering degraded mode on the first failure.
async fn reconnect(state: &SharedState, store: &dyn GameStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt,
                        error = %err,
                        "storage reconnect failed; entering degraded mode"
                    );
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}
