use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{SaleEntity, SaleLineEntity},
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::ServiceError,
    services::{
        ledger::{MAX_CREDIT_SECONDS, normalize_barcode},
        sse_events,
    },
    state::SharedState,
};

/// Record a sale and credit any purchased play time to the wristband.
///
/// The sale is persisted before the ledger is touched; a ledger failure after
/// that point leaves the sale recorded without the time credit.
pub async fn checkout(
    state: &SharedState,
    request: CheckoutRequest,
) -> Result<CheckoutResponse, ServiceError> {
    if request.items.is_empty() {
        return Err(ServiceError::InvalidInput("cart is empty".into()));
    }
    let barcode_id = request
        .barcode_id
        .as_deref()
        .map(normalize_barcode)
        .transpose()?;

    let store = state.require_venue_store().await?;
    let mut lines = Vec::with_capacity(request.items.len());
    for item in request.items {
        if item.quantity < 1 {
            return Err(ServiceError::InvalidInput(format!(
                "quantity for product `{}` must be at least 1",
                item.product_id
            )));
        }
        let product = store
            .find_product(item.product_id)
            .await?
            .filter(|product| product.active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product `{}` is not for sale", item.product_id))
            })?;
        lines.push(SaleLineEntity {
            product_id: product.id,
            name: product.name,
            quantity: item.quantity,
            unit_price_cents: product.price_cents,
            time_seconds: product.time_seconds,
        });
    }

    let total_cents = lines.iter().fold(0_i64, |acc, line| {
        acc.saturating_add(line.unit_price_cents.saturating_mul(line.quantity))
    });
    let granted_seconds = lines.iter().fold(0_i64, |acc, line| {
        acc.saturating_add(line.time_seconds.unwrap_or(0).saturating_mul(line.quantity))
    });
    if granted_seconds > MAX_CREDIT_SECONDS as i64 {
        return Err(ServiceError::InvalidInput(format!(
            "cart grants {granted_seconds} seconds of play, at most {MAX_CREDIT_SECONDS} can be sold at once"
        )));
    }
    if granted_seconds > 0 && barcode_id.is_none() {
        return Err(ServiceError::InvalidInput(
            "a wristband barcode is required to sell play time".into(),
        ));
    }

    let sale = SaleEntity {
        id: Uuid::new_v4(),
        barcode_id: barcode_id.clone(),
        lines,
        total_cents,
        granted_seconds,
        created_at: state.clock().now(),
    };
    store.save_sale(sale.clone()).await?;
    info!(
        sale_id = %sale.id,
        barcode_id = ?sale.barcode_id,
        total_cents,
        granted_seconds,
        "sale recorded"
    );
    sse_events::broadcast_sale_completed(state.sse(), sale.clone());

    let session = match barcode_id {
        Some(barcode_id) => {
            let ledger = state.ledger().await?;
            ledger.get_or_create(&barcode_id).await?;
            if granted_seconds > 0 {
                let seconds = u64::try_from(granted_seconds).unwrap_or(0);
                ledger.add_time(&barcode_id, seconds).await?;
            }
            Some(ledger.get_status(&barcode_id).await?.into())
        }
        None => None,
    };

    Ok(CheckoutResponse {
        sale: sale.into(),
        session,
    })
}
