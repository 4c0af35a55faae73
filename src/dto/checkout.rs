use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{SaleEntity, SaleLineEntity},
    dto::{format_system_time, session::SessionStatusDto, validation::validate_barcode},
};

/// Cart submitted at the point of sale.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Wristband to credit; required when the cart contains play time.
    #[serde(default)]
    #[validate(custom(function = "validate_barcode"))]
    pub barcode_id: Option<String>,
    #[validate(length(min = 1), nested)]
    pub items: Vec<CheckoutItem>,
}

/// One cart line.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineDto {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub time_seconds: Option<i64>,
}

impl From<SaleLineEntity> for SaleLineDto {
    fn from(line: SaleLineEntity) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name,
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            time_seconds: line.time_seconds,
        }
    }
}

/// Recorded sale.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: Uuid,
    pub barcode_id: Option<String>,
    pub lines: Vec<SaleLineDto>,
    pub total_cents: i64,
    pub granted_seconds: i64,
    pub created_at: String,
}

impl From<SaleEntity> for SaleDto {
    fn from(sale: SaleEntity) -> Self {
        Self {
            id: sale.id,
            barcode_id: sale.barcode_id,
            lines: sale.lines.into_iter().map(SaleLineDto::from).collect(),
            total_cents: sale.total_cents,
            granted_seconds: sale.granted_seconds,
            created_at: format_system_time(sale.created_at),
        }
    }
}

/// Result of a checkout: the sale and, when a wristband was given, its new state.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub sale: SaleDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionStatusDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_needs_lines_with_sane_quantities() {
        let empty: CheckoutRequest = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(empty.validate().is_err());

        let request = CheckoutRequest {
            barcode_id: Some("zx-1".into()),
            items: vec![CheckoutItem {
                product_id: Uuid::new_v4(),
                quantity: 101,
            }],
        };
        assert!(request.validate().is_err());

        let request = CheckoutRequest {
            barcode_id: None,
            items: vec![CheckoutItem {
                product_id: Uuid::new_v4(),
                quantity: 2,
            }],
        };
        assert!(request.validate().is_ok());
    }
}
