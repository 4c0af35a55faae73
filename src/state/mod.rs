mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    dao::venue_store::VenueStore,
    error::ServiceError,
    services::{ledger::SessionLedger, sse_events},
};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

/// Central application state storing the store handle, the event hub and the clock.
pub struct AppState {
    venue_store: RwLock<Option<Arc<dyn VenueStore>>>,
    sse: Arc<SseHub>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit time source.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let sse = Arc::new(SseHub::new(config.sse_capacity()));
        Arc::new(Self {
            venue_store: RwLock::new(None),
            sse,
            degraded: degraded_tx,
            config,
            clock,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn venue_store(&self) -> Option<Arc<dyn VenueStore>> {
        let guard = self.venue_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current store or fail with [`ServiceError::Degraded`].
    pub async fn require_venue_store(&self) -> Result<Arc<dyn VenueStore>, ServiceError> {
        self.venue_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_venue_store(&self, store: Arc<dyn VenueStore>) {
        {
            let mut guard = self.venue_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_venue_store(&self) {
        {
            let mut guard = self.venue_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Flip the degraded flag. Watchers and SSE clients are notified only when
    /// the value changes; returns whether it did.
    pub fn update_degraded(&self, value: bool) -> bool {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            sse_events::broadcast_system_status(&self.sse, value);
        }
        changed
    }

    /// Broadcast hub used for the SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Loaded runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Time source shared by every service.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Session ledger bound to the installed store, the clock and the SSE hub.
    pub async fn ledger(&self) -> Result<SessionLedger, ServiceError> {
        let store = self.require_venue_store().await?;
        Ok(SessionLedger::new(store, self.clock(), self.sse.clone()))
    }
}
