use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{storage::StorageError, venue_store::VenueStore},
    services::catalog_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Install `store` after seeding an empty catalog.
pub async fn install(state: &SharedState, store: Arc<dyn VenueStore>) -> Result<(), StorageError> {
    catalog_service::seed_catalog(store.as_ref(), state.config().catalog(), state.clock().now())
        .await?;
    state.install_venue_store(store).await;
    Ok(())
}

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn VenueStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        if let Err(err) = install(&state, store.clone()).await {
            warn!(error = %err, "failed to prepare storage after connecting");
            sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
            continue;
        }
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            match store.health_check().await {
                Ok(()) => {
                    if state.update_degraded(false) {
                        info!("storage healthy again; leaving degraded mode");
                    }
                    sleep(HEALTH_POLL_INTERVAL).await;
                }
                Err(_) => {
                    let mut attempt = 0;
                    let mut reconnect_delay = INITIAL_DELAY;
                    let mut reconnected = false;

                    while attempt < MAX_RECONNECT_ATTEMPTS {
                        match store.try_reconnect().await {
                            Ok(()) => {
                                info!("storage reconnection succeeded after health check failure");
                                reconnected = true;
                                break;
                            }
                            Err(reconnect_err) => {
                                if attempt == 0 {
                                    warn!(
                                        attempt, error = %reconnect_err,
                                        "storage reconnect first attempt failed; entering degraded mode"
                                    );
                                    state.update_degraded(true);
                                } else {
                                    warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                }
                                attempt += 1;
                                sleep(reconnect_delay).await;
                                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                            }
                        }
                    }

                    if reconnected {
                        state.update_degraded(false);
                        sleep(HEALTH_POLL_INTERVAL).await;
                        continue;
                    }

                    warn!("exhausted storage reconnect attempts; dropping the connection");
                    state.clear_venue_store().await;
                    break;
                }
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        clock::ManualClock, config::AppConfig, dao::venue_store::memory::MemoryVenueStore,
        state::AppState,
    };

    #[tokio::test]
    async fn connecting_seeds_the_catalog_and_leaves_degraded_mode() {
        let state = AppState::with_clock(
            AppConfig::default(),
            Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH)),
        );
        let store = MemoryVenueStore::new();
        let mut degraded = state.degraded_watcher();

        let connect_store = store.clone();
        let supervisor = tokio::spawn(run(state.clone(), move || {
            let store: Arc<dyn VenueStore> = Arc::new(connect_store.clone());
            async move { Ok(store) }
        }));

        tokio::time::timeout(Duration::from_secs(5), degraded.wait_for(|value| !*value))
            .await
            .expect("supervisor did not install the store")
            .unwrap();
        supervisor.abort();

        assert!(state.venue_store().await.is_some());
        assert_eq!(
            store.list_products().await.unwrap().len(),
            AppConfig::default().catalog().len()
        );
    }

    #[tokio::test]
    async fn install_fails_when_the_store_is_offline() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryVenueStore::new();
        store.set_offline(true);

        let result = install(&state, Arc::new(store)).await;
        assert!(result.is_err());
        assert!(state.is_degraded());
    }
}
