use std::time::SystemTime;

use time::{OffsetDateTime, Time};

use crate::{
    dto::dashboard::DashboardSummary, error::ServiceError, services::ledger::SessionStatus,
    state::SharedState,
};

/// Start of the UTC day containing `now`.
fn utc_midnight(now: SystemTime) -> SystemTime {
    OffsetDateTime::from(now).replace_time(Time::MIDNIGHT).into()
}

/// Session counters and today's sales figures.
pub async fn summary(state: &SharedState) -> Result<DashboardSummary, ServiceError> {
    let ledger = state.ledger().await?;
    let store = state.require_venue_store().await?;
    let mut summary = DashboardSummary {
        degraded: state.is_degraded(),
        ..Default::default()
    };

    for snapshot in ledger.get_all_active().await? {
        summary.active_sessions += 1;
        summary.total_remaining_seconds = summary
            .total_remaining_seconds
            .saturating_add(snapshot.remaining_seconds);
        match snapshot.status {
            SessionStatus::Playing => summary.playing += 1,
            SessionStatus::Paused => summary.paused += 1,
            SessionStatus::Waiting => summary.waiting += 1,
        }
    }

    let sales = store.list_sales_since(utc_midnight(ledger.now())).await?;
    summary.sales_today = sales.len();
    for sale in sales {
        summary.revenue_today_cents = summary.revenue_today_cents.saturating_add(sale.total_cents);
        summary.granted_seconds_today =
            summary.granted_seconds_today.saturating_add(sale.granted_seconds);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use uuid::Uuid;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::AppConfig,
        dao::{
            models::SaleEntity,
            venue_store::{VenueStore, memory::MemoryVenueStore},
        },
        state::AppState,
    };

    // 2025-03-01T15:30:00Z
    const AFTERNOON: u64 = 1_740_843_000;

    fn sale(created_at: SystemTime, total_cents: i64, granted_seconds: i64) -> SaleEntity {
        SaleEntity {
            id: Uuid::new_v4(),
            barcode_id: None,
            lines: Vec::new(),
            total_cents,
            granted_seconds,
            created_at,
        }
    }

    #[test]
    fn midnight_is_computed_in_utc() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(AFTERNOON);
        let midnight = utc_midnight(now);
        assert_eq!(
            now.duration_since(midnight).unwrap(),
            Duration::from_secs(15 * 3600 + 30 * 60)
        );
    }

    #[tokio::test]
    async fn counts_sessions_and_todays_sales() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(AFTERNOON);
        let clock = Arc::new(ManualClock::new(now));
        let store = MemoryVenueStore::new();
        let state = AppState::with_clock(AppConfig::default(), clock.clone());
        state.install_venue_store(Arc::new(store.clone())).await;

        let ledger = state.ledger().await.unwrap();
        ledger.add_time("waiting", 600).await.unwrap();
        ledger.add_time("playing", 300).await.unwrap();
        ledger.play("playing").await.unwrap();
        ledger.get_or_create("empty").await.unwrap();
        clock.advance(Duration::from_secs(100));

        store
            .save_sale(sale(now - Duration::from_secs(86_400), 9_999, 60))
            .await
            .unwrap();
        store.save_sale(sale(now, 5_000, 1_800)).await.unwrap();
        store.save_sale(sale(now, 1_500, 0)).await.unwrap();

        let summary = summary(&state).await.unwrap();
        assert_eq!(
            summary,
            DashboardSummary {
                active_sessions: 2,
                playing: 1,
                paused: 0,
                waiting: 1,
                total_remaining_seconds: 800,
                sales_today: 2,
                revenue_today_cents: 6_500,
                granted_seconds_today: 1_800,
                degraded: false,
            }
        );
    }

    #[tokio::test]
    async fn remaining_total_saturates_instead_of_overflowing() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(AFTERNOON);
        let store = MemoryVenueStore::new();
        let state = AppState::with_clock(AppConfig::default(), Arc::new(ManualClock::new(now)));
        state.install_venue_store(Arc::new(store.clone())).await;

        let ledger = state.ledger().await.unwrap();
        for barcode in ["band-1", "band-2", "band-3"] {
            let mut balance = ledger.get_or_create(barcode).await.unwrap();
            balance.total_allowed_seconds = i64::MAX;
            store.save_balance(balance).await.unwrap();
        }

        let summary = summary(&state).await.unwrap();
        assert_eq!(summary.active_sessions, 3);
        assert_eq!(summary.total_remaining_seconds, u64::MAX);
    }
}
