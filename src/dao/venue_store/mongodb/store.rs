use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::{sync::RwLock, time::sleep};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        ACTION_COLLECTION_NAME, BALANCE_COLLECTION_NAME, MongoActionDocument,
        MongoBalanceDocument, MongoProductDocument, MongoSaleDocument, PRODUCT_COLLECTION_NAME,
        SALE_COLLECTION_NAME,
    },
};
use crate::dao::{
    models::{ActionLogEntity, ProductEntity, SaleEntity, VisitorBalanceEntity},
    storage::{StorageError, StorageResult},
    venue_store::VenueStore,
};

/// MongoDB-backed [`VenueStore`] implementation.
#[derive(Clone)]
pub struct MongoVenueStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

/// Open `config.database_name` and wait until it answers a ping, trying at
/// most `config.ping_attempts` times. Longer outages are left to the caller,
/// which retries whole connections with its own backoff.
async fn open_database(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempt = 1;
    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                debug!(database = %config.database_name, attempt, "MongoDB answered ping");
                return Ok(database);
            }
            Err(source) if attempt >= config.ping_attempts => {
                return Err(MongoDaoError::InitialPing {
                    database: config.database_name.clone(),
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                warn!(
                    database = %config.database_name,
                    attempt,
                    budget = config.ping_attempts,
                    error = %err,
                    "MongoDB ping failed"
                );
                sleep(config.ping_interval).await;
                attempt += 1;
            }
        }
    }
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = open_database(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoVenueStore {
    /// Connect to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = open_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let balances = database.collection::<mongodb::bson::Document>(BALANCE_COLLECTION_NAME);
        let barcode_index = IndexModel::builder()
            .keys(doc! {"barcode_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("balance_barcode_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        balances
            .create_index(barcode_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: BALANCE_COLLECTION_NAME,
                index: "barcode_id",
                source,
            })?;

        let actions = database.collection::<mongodb::bson::Document>(ACTION_COLLECTION_NAME);
        let action_index = IndexModel::builder()
            .keys(doc! {"visitor_balance_id": 1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("action_balance_idx".to_owned()))
                    .build(),
            )
            .build();
        actions
            .create_index(action_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ACTION_COLLECTION_NAME,
                index: "visitor_balance_id,created_at",
                source,
            })?;

        let sales = database.collection::<mongodb::bson::Document>(SALE_COLLECTION_NAME);
        let sale_index = IndexModel::builder()
            .keys(doc! {"created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("sale_created_idx".to_owned()))
                    .build(),
            )
            .build();
        sales
            .create_index(sale_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SALE_COLLECTION_NAME,
                index: "created_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn balances(&self) -> Collection<MongoBalanceDocument> {
        self.database()
            .await
            .collection::<MongoBalanceDocument>(BALANCE_COLLECTION_NAME)
    }

    async fn actions(&self) -> Collection<MongoActionDocument> {
        self.database()
            .await
            .collection::<MongoActionDocument>(ACTION_COLLECTION_NAME)
    }

    async fn products(&self) -> Collection<MongoProductDocument> {
        self.database()
            .await
            .collection::<MongoProductDocument>(PRODUCT_COLLECTION_NAME)
    }

    async fn sales(&self) -> Collection<MongoSaleDocument> {
        self.database()
            .await
            .collection::<MongoSaleDocument>(SALE_COLLECTION_NAME)
    }

    async fn find_balance(&self, barcode_id: String) -> MongoResult<Option<VisitorBalanceEntity>> {
        let collection = self.balances().await;
        let document = collection
            .find_one(doc! {"barcode_id": barcode_id.as_str()})
            .await
            .map_err(|source| MongoDaoError::LoadBalance {
                barcode_id: barcode_id.clone(),
                source,
            })?;

        document.map(TryInto::try_into).transpose()
    }

    async fn create_balance_if_absent(
        &self,
        balance: VisitorBalanceEntity,
    ) -> MongoResult<(VisitorBalanceEntity, bool)> {
        let candidate_id = balance.id;
        let barcode_id = balance.barcode_id.clone();
        let document: MongoBalanceDocument = balance.into();
        let collection = self.balances().await;

        let stored = collection
            .find_one_and_update(
                doc! {"barcode_id": barcode_id.as_str()},
                doc! {"$setOnInsert": document.insert_fields()},
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::SaveBalance {
                barcode_id: barcode_id.clone(),
                source,
            })?;

        // An upsert with `ReturnDocument::After` always yields a document; fall
        // back to the candidate to keep the type total.
        let entity = match stored {
            Some(stored) => VisitorBalanceEntity::try_from(stored)?,
            None => VisitorBalanceEntity::try_from(document)?,
        };
        let created = entity.id == candidate_id;
        Ok((entity, created))
    }

    async fn save_balance(&self, balance: VisitorBalanceEntity) -> MongoResult<()> {
        let barcode_id = balance.barcode_id.clone();
        let document: MongoBalanceDocument = balance.into();
        let collection = self.balances().await;

        collection
            .replace_one(doc! {"_id": document.id.clone()}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveBalance { barcode_id, source })?;

        Ok(())
    }

    async fn increment_allowed_seconds(
        &self,
        barcode_id: String,
        seconds: i64,
        now: SystemTime,
    ) -> MongoResult<Option<VisitorBalanceEntity>> {
        let collection = self.balances().await;
        let updated = collection
            .find_one_and_update(
                doc! {"barcode_id": barcode_id.as_str()},
                doc! {
                    "$inc": {"total_allowed_seconds": seconds},
                    "$set": {"updated_at": DateTime::from_system_time(now)},
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::SaveBalance {
                barcode_id: barcode_id.clone(),
                source,
            })?;

        updated.map(TryInto::try_into).transpose()
    }

    async fn list_balances(&self) -> MongoResult<Vec<VisitorBalanceEntity>> {
        let collection = self.balances().await;
        let documents: Vec<MongoBalanceDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListBalances { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListBalances { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_action(&self, entry: ActionLogEntity) -> MongoResult<()> {
        let document: MongoActionDocument = entry.into();
        let collection = self.actions().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::AppendAction {
                id: document.id.clone(),
                source,
            })?;
        Ok(())
    }

    async fn save_product(&self, product: ProductEntity) -> MongoResult<()> {
        let document: MongoProductDocument = product.into();
        let collection = self.products().await;
        collection
            .replace_one(doc! {"_id": document.id.clone()}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveProduct {
                id: document.id.clone(),
                source,
            })?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> MongoResult<Option<ProductEntity>> {
        let collection = self.products().await;
        let document = collection
            .find_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadProduct {
                id: id.to_string(),
                source,
            })?;

        document.map(TryInto::try_into).transpose()
    }

    async fn list_products(&self) -> MongoResult<Vec<ProductEntity>> {
        let collection = self.products().await;
        let documents: Vec<MongoProductDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListProducts { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListProducts { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn save_sale(&self, sale: SaleEntity) -> MongoResult<()> {
        let document: MongoSaleDocument = sale.into();
        let collection = self.sales().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveSale {
                id: document.id.clone(),
                source,
            })?;
        Ok(())
    }

    async fn list_sales_since(&self, since: SystemTime) -> MongoResult<Vec<SaleEntity>> {
        let collection = self.sales().await;
        let documents: Vec<MongoSaleDocument> = collection
            .find(doc! {"created_at": {"$gte": DateTime::from_system_time(since)}})
            .await
            .map_err(|source| MongoDaoError::ListSales { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListSales { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }
}

impl VenueStore for MongoVenueStore {
    fn find_balance(
        &self,
        barcode_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<VisitorBalanceEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_balance(barcode_id).await.map_err(Into::into) })
    }

    fn create_balance_if_absent(
        &self,
        balance: VisitorBalanceEntity,
    ) -> BoxFuture<'static, StorageResult<(VisitorBalanceEntity, bool)>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_balance_if_absent(balance)
                .await
                .map_err(Into::into)
        })
    }

    fn save_balance(&self, balance: VisitorBalanceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_balance(balance).await.map_err(Into::into) })
    }

    fn increment_allowed_seconds(
        &self,
        barcode_id: String,
        seconds: i64,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<VisitorBalanceEntity>> {
        let store = self.clone();
        Box::pin(async move {
            match store
                .increment_allowed_seconds(barcode_id.clone(), seconds, now)
                .await
            {
                Ok(Some(balance)) => Ok(balance),
                Ok(None) => Err(StorageError::missing(format!(
                    "balance `{barcode_id}` vanished before update"
                ))),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn list_balances(&self) -> BoxFuture<'static, StorageResult<Vec<VisitorBalanceEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_balances().await.map_err(Into::into) })
    }

    fn append_action(&self, entry: ActionLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_action(entry).await.map_err(Into::into) })
    }

    fn save_product(&self, product: ProductEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_product(product).await.map_err(Into::into) })
    }

    fn find_product(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ProductEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_product(id).await.map_err(Into::into) })
    }

    fn list_products(&self) -> BoxFuture<'static, StorageResult<Vec<ProductEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_products().await.map_err(Into::into) })
    }

    fn save_sale(&self, sale: SaleEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_sale(sale).await.map_err(Into::into) })
    }

    fn list_sales_since(
        &self,
        since: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SaleEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sales_since(since).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
