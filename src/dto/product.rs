use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    dao::models::ProductEntity,
    dto::{format_system_time, validation::validate_not_blank},
};

/// Catalog entry as exposed to the point-of-sale screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    /// Play seconds granted per unit, absent for merchandise.
    pub time_seconds: Option<i64>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductEntity> for ProductDto {
    fn from(product: ProductEntity) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price_cents: product.price_cents,
            time_seconds: product.time_seconds,
            active: product.active,
            created_at: format_system_time(product.created_at),
            updated_at: format_system_time(product.updated_at),
        }
    }
}

/// Query string accepted by the catalog listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    /// Include products that can no longer be sold.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Most play time a single product unit may grant: one day.
pub const MAX_PRODUCT_TIME_SECONDS: i64 = 86_400;

/// Payload used to add a product to the catalog.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    pub name: String,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    #[serde(default)]
    #[validate(range(min = 1, max = 86_400))]
    pub time_seconds: Option<i64>,
}

/// Partial update of a catalog entry. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_time_seconds"))]
pub struct UpdateProductRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,
    /// If not specified, does not change it.
    /// If null is specified, turns the product into merchandise.
    /// If a number is specified, sets the play time granted per unit.
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    #[schema(value_type = Option<i64>)]
    pub time_seconds: Option<Option<i64>>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// `timeSeconds` must lie between one second and a day when set.
fn validate_update_time_seconds(request: &UpdateProductRequest) -> Result<(), ValidationError> {
    match request.time_seconds {
        Some(Some(seconds)) if !(1..=MAX_PRODUCT_TIME_SECONDS).contains(&seconds) => {
            let mut err = ValidationError::new("time_seconds_range");
            err.message = Some(
                format!("timeSeconds must be between 1 and {MAX_PRODUCT_TIME_SECONDS}").into(),
            );
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// Response listing catalog entries sorted by name.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_from_missing() {
        let missing: UpdateProductRequest = serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert_eq!(missing.time_seconds, None);

        let cleared: UpdateProductRequest =
            serde_json::from_str(r#"{"timeSeconds": null}"#).unwrap();
        assert_eq!(cleared.time_seconds, Some(None));

        let set: UpdateProductRequest = serde_json::from_str(r#"{"timeSeconds": 600}"#).unwrap();
        assert_eq!(set.time_seconds, Some(Some(600)));
        assert!(set.validate().is_ok());

        let invalid: UpdateProductRequest =
            serde_json::from_str(r#"{"timeSeconds": 0}"#).unwrap();
        assert!(invalid.validate().is_err());

        let too_long: UpdateProductRequest =
            serde_json::from_str(r#"{"timeSeconds": 86401}"#).unwrap();
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn create_caps_time_per_unit_at_a_day() {
        let mut request = CreateProductRequest {
            name: "Pase diario".into(),
            price_cents: 25_000,
            time_seconds: Some(MAX_PRODUCT_TIME_SECONDS),
        };
        assert!(request.validate().is_ok());

        request.time_seconds = Some(i64::MAX);
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("time_seconds"));
    }

    #[test]
    fn create_rejects_blank_name_and_zero_time() {
        let request = CreateProductRequest {
            name: "   ".into(),
            price_cents: 100,
            time_seconds: Some(0),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("time_seconds"));
    }
}
