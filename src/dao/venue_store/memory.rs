//! Process-local [`VenueStore`] backed by concurrent maps.
//!
//! Used when `STORAGE_BACKEND=memory` and throughout the test-suite. Data is lost
//! when the process exits.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::{
    models::{ActionLogEntity, ProductEntity, SaleEntity, VisitorBalanceEntity},
    storage::{StorageError, StorageResult},
    venue_store::VenueStore,
};

#[derive(Debug, Error)]
#[error("in-memory store switched offline")]
pub struct MemoryOffline;

#[derive(Default)]
struct MemoryInner {
    balances: DashMap<String, VisitorBalanceEntity>,
    actions: Mutex<Vec<ActionLogEntity>>,
    products: DashMap<Uuid, ProductEntity>,
    sales: DashMap<Uuid, SaleEntity>,
    offline: AtomicBool,
}

/// In-memory store. Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryVenueStore {
    inner: Arc<MemoryInner>,
}

impl MemoryVenueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails until switched back online.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of the action log in insertion order.
    pub fn actions(&self) -> Vec<ActionLogEntity> {
        self.inner
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "in-memory store offline".into(),
                MemoryOffline,
            ));
        }
        Ok(())
    }

    fn ready<T: Send + 'static>(
        &self,
        work: impl FnOnce(&MemoryInner) -> StorageResult<T>,
    ) -> BoxFuture<'static, StorageResult<T>> {
        let result = self.ensure_online().and_then(|()| work(&*self.inner));
        Box::pin(async move { result })
    }
}

impl VenueStore for MemoryVenueStore {
    fn find_balance(
        &self,
        barcode_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<VisitorBalanceEntity>>> {
        self.ready(|inner| {
            Ok(inner
                .balances
                .get(&barcode_id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn create_balance_if_absent(
        &self,
        balance: VisitorBalanceEntity,
    ) -> BoxFuture<'static, StorageResult<(VisitorBalanceEntity, bool)>> {
        self.ready(|inner| match inner.balances.entry(balance.barcode_id.clone()) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                slot.insert(balance.clone());
                Ok((balance, true))
            }
        })
    }

    fn save_balance(&self, balance: VisitorBalanceEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.ready(|inner| {
            inner.balances.insert(balance.barcode_id.clone(), balance);
            Ok(())
        })
    }

    fn increment_allowed_seconds(
        &self,
        barcode_id: String,
        seconds: i64,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VisitorBalanceEntity>> {
        self.ready(|inner| {
            let mut entry = inner.balances.get_mut(&barcode_id).ok_or_else(|| {
                StorageError::missing(format!("balance `{barcode_id}` vanished before update"))
            })?;
            entry.total_allowed_seconds = entry.total_allowed_seconds.saturating_add(seconds);
            entry.updated_at = now;
            Ok(entry.value().clone())
        })
    }

    fn list_balances(&self) -> BoxFuture<'static, StorageResult<Vec<VisitorBalanceEntity>>> {
        self.ready(|inner| {
            Ok(inner
                .balances
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn append_action(&self, entry: ActionLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.ready(|inner| {
            inner
                .actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(entry);
            Ok(())
        })
    }

    fn save_product(&self, product: ProductEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.ready(|inner| {
            inner.products.insert(product.id, product);
            Ok(())
        })
    }

    fn find_product(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ProductEntity>>> {
        self.ready(|inner| Ok(inner.products.get(&id).map(|entry| entry.value().clone())))
    }

    fn list_products(&self) -> BoxFuture<'static, StorageResult<Vec<ProductEntity>>> {
        self.ready(|inner| {
            Ok(inner
                .products
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn save_sale(&self, sale: SaleEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.ready(|inner| {
            inner.sales.insert(sale.id, sale);
            Ok(())
        })
    }

    fn list_sales_since(
        &self,
        since: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SaleEntity>>> {
        self.ready(|inner| {
            Ok(inner
                .sales
                .iter()
                .filter(|entry| entry.created_at >= since)
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.ready(|_| Ok(()))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.ready(|_| Ok(()))
    }
}
