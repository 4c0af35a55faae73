use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI")]
    InvalidUri {
        #[source]
        source: MongoError,
    },
    #[error("invalid value `{value}` for `{var}`")]
    InvalidSetting { var: &'static str, value: String },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("database `{database}` did not answer {attempts} ping(s)")]
    InitialPing {
        database: String,
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load balance for barcode `{barcode_id}`")]
    LoadBalance {
        barcode_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save balance for barcode `{barcode_id}`")]
    SaveBalance {
        barcode_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list balances")]
    ListBalances {
        #[source]
        source: MongoError,
    },
    #[error("failed to append action log entry `{id}`")]
    AppendAction {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save product `{id}`")]
    SaveProduct {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load product `{id}`")]
    LoadProduct {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list products")]
    ListProducts {
        #[source]
        source: MongoError,
    },
    #[error("failed to save sale `{id}`")]
    SaveSale {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list sales")]
    ListSales {
        #[source]
        source: MongoError,
    },
    #[error("document `{id}` in `{collection}` carries an invalid identifier")]
    InvalidId {
        collection: &'static str,
        id: String,
        #[source]
        source: uuid::Error,
    },
}
