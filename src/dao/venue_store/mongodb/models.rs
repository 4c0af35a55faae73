use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{
    ActionKind, ActionLogEntity, ProductEntity, SaleEntity, SaleLineEntity, VisitorBalanceEntity,
};

use super::error::MongoDaoError;

pub const BALANCE_COLLECTION_NAME: &str = "visitor_balances";
pub const ACTION_COLLECTION_NAME: &str = "action_logs";
pub const PRODUCT_COLLECTION_NAME: &str = "products";
pub const SALE_COLLECTION_NAME: &str = "sales";

fn parse_id(collection: &'static str, id: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(id).map_err(|source| MongoDaoError::InvalidId {
        collection,
        id: id.to_owned(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoBalanceDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub barcode_id: String,
    pub total_allowed_seconds: i64,
    pub accumulated_seconds: i64,
    pub is_active: bool,
    #[serde(default)]
    pub last_start_at: Option<DateTime>,
    #[serde(default)]
    pub expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl MongoBalanceDocument {
    /// Fields written only when the upsert creates the document.
    pub fn insert_fields(&self) -> Document {
        doc! {
            "_id": self.id.clone(),
            "total_allowed_seconds": self.total_allowed_seconds,
            "accumulated_seconds": self.accumulated_seconds,
            "is_active": self.is_active,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        }
    }
}

impl From<VisitorBalanceEntity> for MongoBalanceDocument {
    fn from(value: VisitorBalanceEntity) -> Self {
        Self {
            id: value.id.to_string(),
            barcode_id: value.barcode_id,
            total_allowed_seconds: value.total_allowed_seconds,
            accumulated_seconds: value.accumulated_seconds,
            is_active: value.is_active,
            last_start_at: value.last_start_at.map(DateTime::from_system_time),
            expires_at: value.expires_at.map(DateTime::from_system_time),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoBalanceDocument> for VisitorBalanceEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoBalanceDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(BALANCE_COLLECTION_NAME, &value.id)?,
            barcode_id: value.barcode_id,
            total_allowed_seconds: value.total_allowed_seconds,
            accumulated_seconds: value.accumulated_seconds,
            is_active: value.is_active,
            last_start_at: value.last_start_at.map(DateTime::to_system_time),
            expires_at: value.expires_at.map(DateTime::to_system_time),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoActionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub visitor_balance_id: String,
    pub action: ActionKind,
    pub data: Value,
    pub created_at: DateTime,
}

impl From<ActionLogEntity> for MongoActionDocument {
    fn from(value: ActionLogEntity) -> Self {
        Self {
            id: value.id.to_string(),
            visitor_balance_id: value.visitor_balance_id.to_string(),
            action: value.action,
            data: value.data,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProductDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub time_seconds: Option<i64>,
    pub active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<ProductEntity> for MongoProductDocument {
    fn from(value: ProductEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            price_cents: value.price_cents,
            time_seconds: value.time_seconds,
            active: value.active,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoProductDocument> for ProductEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoProductDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(PRODUCT_COLLECTION_NAME, &value.id)?,
            name: value.name,
            price_cents: value.price_cents,
            time_seconds: value.time_seconds,
            active: value.active,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSaleLineDocument {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSaleDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub barcode_id: Option<String>,
    pub lines: Vec<MongoSaleLineDocument>,
    pub total_cents: i64,
    pub granted_seconds: i64,
    pub created_at: DateTime,
}

impl From<SaleEntity> for MongoSaleDocument {
    fn from(value: SaleEntity) -> Self {
        Self {
            id: value.id.to_string(),
            barcode_id: value.barcode_id,
            lines: value
                .lines
                .into_iter()
                .map(|line| MongoSaleLineDocument {
                    product_id: line.product_id.to_string(),
                    name: line.name,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    time_seconds: line.time_seconds,
                })
                .collect(),
            total_cents: value.total_cents,
            granted_seconds: value.granted_seconds,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoSaleDocument> for SaleEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSaleDocument) -> Result<Self, Self::Error> {
        let lines = value
            .lines
            .into_iter()
            .map(|line| {
                Ok(SaleLineEntity {
                    product_id: parse_id(SALE_COLLECTION_NAME, &line.product_id)?,
                    name: line.name,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    time_seconds: line.time_seconds,
                })
            })
            .collect::<Result<Vec<_>, MongoDaoError>>()?;

        Ok(Self {
            id: parse_id(SALE_COLLECTION_NAME, &value.id)?,
            barcode_id: value.barcode_id,
            lines,
            total_cents: value.total_cents,
            granted_seconds: value.granted_seconds,
            created_at: value.created_at.to_system_time(),
        })
    }
}
