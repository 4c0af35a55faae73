pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{ActionLogEntity, ProductEntity, SaleEntity, VisitorBalanceEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for visitor balances, the action log,
/// the product catalog and recorded sales.
///
/// Barcodes handed to this trait are already canonical; backends compare them
/// byte for byte.
pub trait VenueStore: Send + Sync {
    fn find_balance(
        &self,
        barcode_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<VisitorBalanceEntity>>>;
    /// Insert `balance` unless a record with the same barcode exists. Returns the
    /// stored record and whether it was created by this call.
    fn create_balance_if_absent(
        &self,
        balance: VisitorBalanceEntity,
    ) -> BoxFuture<'static, StorageResult<(VisitorBalanceEntity, bool)>>;
    fn save_balance(&self, balance: VisitorBalanceEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Atomically add `seconds` to `total_allowed_seconds` and return the updated record.
    fn increment_allowed_seconds(
        &self,
        barcode_id: String,
        seconds: i64,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VisitorBalanceEntity>>;
    fn list_balances(&self) -> BoxFuture<'static, StorageResult<Vec<VisitorBalanceEntity>>>;
    fn append_action(&self, entry: ActionLogEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn save_product(&self, product: ProductEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_product(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ProductEntity>>>;
    fn list_products(&self) -> BoxFuture<'static, StorageResult<Vec<ProductEntity>>>;
    fn save_sale(&self, sale: SaleEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_sales_since(
        &self,
        since: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SaleEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
