//! Session time ledger: per-wristband time balances, play/pause bookkeeping and
//! the status shown to operators.
//!
//! Remaining time is never stored. It is derived on every read from
//! `total_allowed_seconds`, `accumulated_seconds` and, while the clock runs, the
//! time elapsed since `last_start_at`.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    clock::Clock,
    dao::{
        models::{ActionKind, ActionLogEntity, VisitorBalanceEntity},
        venue_store::VenueStore,
    },
    error::ServiceError,
};

/// Longest barcode accepted from scanners or typed by an operator.
pub const MAX_BARCODE_LENGTH: usize = 64;

/// Status shown for a wristband. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Time purchased, clock never started.
    Waiting,
    /// Clock running with time left.
    Playing,
    /// Clock stopped after some play, or nothing left to play.
    Paused,
}

/// Balance plus the values computed from it at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub balance: VisitorBalanceEntity,
    pub remaining_seconds: u64,
    pub remaining_minutes: u64,
    pub status: SessionStatus,
}

impl SessionSnapshot {
    /// Compute remaining time and status of `balance` at `now`.
    pub fn at(balance: VisitorBalanceEntity, now: SystemTime) -> Self {
        let remaining_seconds = compute_remaining(&balance, now);
        let status = derive_status(&balance, remaining_seconds);
        Self {
            balance,
            remaining_seconds,
            remaining_minutes: remaining_seconds / 60,
            status,
        }
    }
}

/// Kind of state change pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Play,
    Pause,
    Updated,
}

impl SessionEventKind {
    /// Event name used on the real-time stream.
    pub fn name(self) -> &'static str {
        match self {
            SessionEventKind::Play => "session:play",
            SessionEventKind::Pause => "session:pause",
            SessionEventKind::Updated => "session:updated",
        }
    }
}

/// Notification emitted after a balance mutation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub balance: VisitorBalanceEntity,
}

/// Fire-and-forget sink for session notifications. Delivery is best effort.
pub trait SessionNotifier: Send + Sync {
    fn notify(&self, event: SessionEvent);
}

/// Largest credit accepted in one operation: a year of play.
pub const MAX_CREDIT_SECONDS: u64 = 31_536_000;

/// Reason a barcode is refused before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BarcodeError {
    #[error("barcode must not be empty")]
    Empty,
    #[error("barcode is {0} characters long, the limit is {max}", max = MAX_BARCODE_LENGTH)]
    TooLong(usize),
    #[error("barcode must contain only letters, digits, '-' or '_'")]
    InvalidCharacter,
}

/// Check the shape of a barcode and return it without surrounding whitespace.
///
/// What remains must be 1 to [`MAX_BARCODE_LENGTH`] ASCII letters, digits, `-` or `_`.
pub fn check_barcode(raw: &str) -> Result<&str, BarcodeError> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if length == 0 {
        return Err(BarcodeError::Empty);
    }
    if length > MAX_BARCODE_LENGTH {
        return Err(BarcodeError::TooLong(length));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(BarcodeError::InvalidCharacter);
    }
    Ok(trimmed)
}

/// Canonical form of a scanned barcode: checked, trimmed and lowercased.
pub fn normalize_barcode(raw: &str) -> Result<String, ServiceError> {
    check_barcode(raw)
        .map(str::to_ascii_lowercase)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

/// Whole seconds between `since` and `now`; zero when `since` lies in the future.
fn elapsed_seconds(since: SystemTime, now: SystemTime) -> i64 {
    now.duration_since(since)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Seconds left on `balance` at `now`. Never negative.
pub fn compute_remaining(balance: &VisitorBalanceEntity, now: SystemTime) -> u64 {
    let running = match (balance.is_active, balance.last_start_at) {
        (true, Some(started)) => elapsed_seconds(started, now),
        _ => 0,
    };
    let consumed = balance.accumulated_seconds.max(0).saturating_add(running);
    let remaining = balance
        .total_allowed_seconds
        .max(0)
        .saturating_sub(consumed)
        .max(0);
    u64::try_from(remaining).unwrap_or(0)
}

/// Classify a balance from its run flag, play history and remaining time.
///
/// Combinations that match none of the explicit rules (notably a zero balance)
/// fall back to [`SessionStatus::Paused`].
pub fn derive_status(balance: &VisitorBalanceEntity, remaining: u64) -> SessionStatus {
    let has_played = balance.last_start_at.is_some() || balance.accumulated_seconds > 0;
    match (balance.is_active, remaining > 0) {
        (true, true) => SessionStatus::Playing,
        (false, true) if !has_played => SessionStatus::Waiting,
        _ => SessionStatus::Paused,
    }
}

/// Ledger operations over a store, a clock and a notifier.
///
/// Cheap to clone; handlers obtain one from the shared state per request.
#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn VenueStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn SessionNotifier>,
}

impl SessionLedger {
    pub fn new(
        store: Arc<dyn VenueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    /// Current instant according to the injected clock.
    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    /// Return the balance for `barcode`, creating an empty one on first check-in.
    pub async fn get_or_create(&self, barcode: &str) -> Result<VisitorBalanceEntity, ServiceError> {
        let barcode_id = normalize_barcode(barcode)?;
        if let Some(existing) = self.store.find_balance(barcode_id.clone()).await? {
            return Ok(existing);
        }

        let now = self.clock.now();
        let candidate = VisitorBalanceEntity::new(barcode_id, now);
        let (balance, created) = self.store.create_balance_if_absent(candidate).await?;
        if created {
            self.log(&balance, ActionKind::Checkin, json!({ "created": true }), now)
                .await?;
            info!(barcode_id = %balance.barcode_id, "visitor checked in");
        }
        Ok(balance)
    }

    /// Start the play clock. Starting a running clock changes nothing.
    pub async fn play(&self, barcode: &str) -> Result<VisitorBalanceEntity, ServiceError> {
        let mut balance = self.get_or_create(barcode).await?;
        let now = self.clock.now();

        let remaining = compute_remaining(&balance, now);
        if remaining == 0 {
            return Err(ServiceError::NoRemainingTime(balance.barcode_id));
        }
        if balance.is_active {
            debug!(barcode_id = %balance.barcode_id, "play ignored; clock already running");
            return Ok(balance);
        }

        balance.is_active = true;
        balance.last_start_at = Some(now);
        balance.updated_at = now;
        self.store.save_balance(balance.clone()).await?;
        self.log(
            &balance,
            ActionKind::Play,
            json!({ "remainingSeconds": remaining }),
            now,
        )
        .await?;
        info!(barcode_id = %balance.barcode_id, remaining, "play clock started");

        self.emit(SessionEventKind::Play, &balance);
        Ok(balance)
    }

    /// Stop the play clock and bank the elapsed seconds. Pausing a stopped clock changes nothing.
    pub async fn pause(&self, barcode: &str) -> Result<VisitorBalanceEntity, ServiceError> {
        let mut balance = self.find_existing(barcode).await?;
        if !balance.is_active {
            debug!(barcode_id = %balance.barcode_id, "pause ignored; clock not running");
            return Ok(balance);
        }

        let now = self.clock.now();
        let extra = balance
            .last_start_at
            .map(|started| elapsed_seconds(started, now))
            .unwrap_or(0);

        balance.is_active = false;
        balance.last_start_at = None;
        balance.accumulated_seconds = balance.accumulated_seconds.saturating_add(extra);
        balance.updated_at = now;
        self.store.save_balance(balance.clone()).await?;
        self.log(&balance, ActionKind::Pause, json!({ "extra": extra }), now)
            .await?;
        info!(barcode_id = %balance.barcode_id, extra, "play clock paused");

        self.emit(SessionEventKind::Pause, &balance);
        Ok(balance)
    }

    /// Read a balance with its derived values, expiring it first when its clock
    /// ran out since the last write.
    ///
    /// This is not a pure read: an expired running clock is stopped and the
    /// change is persisted, logged and broadcast before the snapshot is built.
    pub async fn status_with_expiry(&self, barcode: &str) -> Result<SessionSnapshot, ServiceError> {
        let mut balance = self.find_existing(barcode).await?;
        let now = self.clock.now();

        if balance.is_active && compute_remaining(&balance, now) == 0 {
            let running = balance
                .last_start_at
                .map(|started| elapsed_seconds(started, now))
                .unwrap_or(0);
            let folded = balance
                .accumulated_seconds
                .saturating_add(running)
                .min(balance.total_allowed_seconds)
                .max(balance.accumulated_seconds);

            balance.is_active = false;
            balance.last_start_at = None;
            balance.accumulated_seconds = folded;
            balance.updated_at = now;
            self.store.save_balance(balance.clone()).await?;
            self.log(
                &balance,
                ActionKind::AutoExpire,
                json!({ "accumulated": folded }),
                now,
            )
            .await?;
            info!(barcode_id = %balance.barcode_id, accumulated = folded, "session expired");

            self.emit(SessionEventKind::Updated, &balance);
        }

        Ok(SessionSnapshot::at(balance, now))
    }

    /// Alias of [`SessionLedger::status_with_expiry`]; may write.
    pub async fn get_status(&self, barcode: &str) -> Result<SessionSnapshot, ServiceError> {
        self.status_with_expiry(barcode).await
    }

    /// Credit `seconds` of play time, creating the balance if needed.
    ///
    /// Credits above [`MAX_CREDIT_SECONDS`] are refused.
    ///
    /// The increment is atomic in the store. The advisory `expires_at` is written
    /// in a second step and may briefly lag behind the new total.
    pub async fn add_time(
        &self,
        barcode: &str,
        seconds: u64,
    ) -> Result<VisitorBalanceEntity, ServiceError> {
        if seconds == 0 {
            return Err(ServiceError::InvalidInput(
                "seconds to add must be a positive integer".into(),
            ));
        }
        if seconds > MAX_CREDIT_SECONDS {
            return Err(ServiceError::InvalidInput(format!(
                "at most {MAX_CREDIT_SECONDS} seconds can be added at once"
            )));
        }
        let delta = i64::try_from(seconds)
            .map_err(|_| ServiceError::InvalidInput("seconds to add is too large".into()))?;

        let balance = self.get_or_create(barcode).await?;
        let now = self.clock.now();
        let mut balance = self
            .store
            .increment_allowed_seconds(balance.barcode_id, delta, now)
            .await?;

        let remaining = compute_remaining(&balance, now);
        // Left unset when the projection does not fit in a timestamp.
        balance.expires_at = now.checked_add(Duration::from_secs(remaining));
        balance.updated_at = now;
        self.store.save_balance(balance.clone()).await?;
        self.log(
            &balance,
            ActionKind::TimeAdded,
            json!({ "totalSecondsToAdd": seconds }),
            now,
        )
        .await?;
        info!(
            barcode_id = %balance.barcode_id,
            added = seconds,
            total = balance.total_allowed_seconds,
            "play time added"
        );

        self.emit(SessionEventKind::Updated, &balance);
        Ok(balance)
    }

    /// Every balance with time left, with derived values. Does not expire anything.
    pub async fn get_all_active(&self) -> Result<Vec<SessionSnapshot>, ServiceError> {
        let now = self.clock.now();
        let mut snapshots: Vec<SessionSnapshot> = self
            .store
            .list_balances()
            .await?
            .into_iter()
            .map(|balance| SessionSnapshot::at(balance, now))
            .filter(|snapshot| snapshot.remaining_seconds > 0)
            .collect();
        snapshots.sort_by(|a, b| a.balance.created_at.cmp(&b.balance.created_at));
        Ok(snapshots)
    }

    async fn find_existing(&self, barcode: &str) -> Result<VisitorBalanceEntity, ServiceError> {
        let barcode_id = normalize_barcode(barcode)?;
        self.store
            .find_balance(barcode_id.clone())
            .await?
            .ok_or(ServiceError::SessionNotFound(barcode_id))
    }

    async fn log(
        &self,
        balance: &VisitorBalanceEntity,
        action: ActionKind,
        data: Value,
        now: SystemTime,
    ) -> Result<(), ServiceError> {
        let entry = ActionLogEntity::new(balance.id, action, data, now);
        self.store.append_action(entry).await?;
        Ok(())
    }

    fn emit(&self, kind: SessionEventKind, balance: &VisitorBalanceEntity) {
        self.notifier.notify(SessionEvent {
            kind,
            balance: balance.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{clock::ManualClock, dao::venue_store::memory::MemoryVenueStore};

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl RecordingNotifier {
        fn kinds(&self) -> Vec<SessionEventKind> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|event| event.kind)
                .collect()
        }
    }

    impl SessionNotifier for RecordingNotifier {
        fn notify(&self, event: SessionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Harness {
        ledger: SessionLedger,
        store: MemoryVenueStore,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness() -> Harness {
        let store = MemoryVenueStore::new();
        let clock = Arc::new(ManualClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_760_000_000),
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let ledger = SessionLedger::new(
            Arc::new(store.clone()),
            clock.clone(),
            notifier.clone(),
        );
        Harness {
            ledger,
            store,
            clock,
            notifier,
        }
    }

    fn actions(store: &MemoryVenueStore) -> Vec<ActionKind> {
        store.actions().into_iter().map(|entry| entry.action).collect()
    }

    fn balance_with(
        is_active: bool,
        last_start_at: Option<SystemTime>,
        accumulated_seconds: i64,
    ) -> VisitorBalanceEntity {
        let mut balance = VisitorBalanceEntity::new("band-0".into(), SystemTime::UNIX_EPOCH);
        balance.is_active = is_active;
        balance.last_start_at = last_start_at;
        balance.accumulated_seconds = accumulated_seconds;
        balance
    }

    #[tokio::test]
    async fn fresh_barcode_has_zero_balance_and_paused_fallback() {
        let h = harness();

        let balance = h.ledger.get_or_create("ABC123").await.unwrap();
        assert_eq!(balance.barcode_id, "abc123");
        assert_eq!(balance.total_allowed_seconds, 0);
        assert_eq!(balance.accumulated_seconds, 0);
        assert!(!balance.is_active);

        let snapshot = h.ledger.get_status("ABC123").await.unwrap();
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(snapshot.status, SessionStatus::Paused);
        assert_eq!(actions(&h.store), vec![ActionKind::Checkin]);
        assert_eq!(
            h.store.actions()[0].data,
            json!({ "created": true })
        );
    }

    #[tokio::test]
    async fn check_in_is_idempotent_and_case_insensitive() {
        let h = harness();

        let first = h.ledger.get_or_create("ABC123").await.unwrap();
        let second = h.ledger.get_or_create("  abc123 ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(actions(&h.store), vec![ActionKind::Checkin]);
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let h = harness();

        h.ledger.add_time("ABC123", 1800).await.unwrap();
        let snapshot = h.ledger.get_status("ABC123").await.unwrap();
        assert_eq!(snapshot.balance.total_allowed_seconds, 1800);
        assert_eq!(snapshot.remaining_seconds, 1800);
        assert_eq!(snapshot.remaining_minutes, 30);
        assert_eq!(snapshot.status, SessionStatus::Waiting);

        let started_at = h.clock.now();
        let playing = h.ledger.play("ABC123").await.unwrap();
        assert!(playing.is_active);
        assert_eq!(playing.last_start_at, Some(started_at));

        h.clock.advance(Duration::from_secs(10));
        let snapshot = h.ledger.get_status("ABC123").await.unwrap();
        assert_eq!(snapshot.remaining_seconds, 1790);
        assert_eq!(snapshot.status, SessionStatus::Playing);

        let paused = h.ledger.pause("ABC123").await.unwrap();
        assert!(!paused.is_active);
        assert_eq!(paused.last_start_at, None);
        assert_eq!(paused.accumulated_seconds, 10);

        let snapshot = h.ledger.get_status("ABC123").await.unwrap();
        assert_eq!(snapshot.remaining_seconds, 1790);
        assert_eq!(snapshot.status, SessionStatus::Paused);

        assert_eq!(
            actions(&h.store),
            vec![
                ActionKind::Checkin,
                ActionKind::TimeAdded,
                ActionKind::Play,
                ActionKind::Pause,
            ]
        );
        assert_eq!(
            h.notifier.kinds(),
            vec![
                SessionEventKind::Updated,
                SessionEventKind::Play,
                SessionEventKind::Pause,
            ]
        );
    }

    #[tokio::test]
    async fn status_read_expires_a_clock_that_ran_out() {
        let h = harness();
        h.ledger.add_time("ABC123", 5).await.unwrap();
        h.ledger.play("ABC123").await.unwrap();

        h.clock.advance(Duration::from_secs(10));
        let snapshot = h.ledger.get_status("ABC123").await.unwrap();

        assert!(!snapshot.balance.is_active);
        assert_eq!(snapshot.balance.last_start_at, None);
        assert_eq!(snapshot.balance.accumulated_seconds, 5);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(snapshot.status, SessionStatus::Paused);

        let stored = h
            .store
            .find_balance("abc123".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, snapshot.balance);
        assert_eq!(actions(&h.store).last(), Some(&ActionKind::AutoExpire));
        assert_eq!(h.notifier.kinds().last(), Some(&SessionEventKind::Updated));

        // A second read finds nothing left to expire.
        h.ledger.get_status("ABC123").await.unwrap();
        let expiries = actions(&h.store)
            .into_iter()
            .filter(|action| *action == ActionKind::AutoExpire)
            .count();
        assert_eq!(expiries, 1);
    }

    #[tokio::test]
    async fn play_on_unknown_barcode_creates_it_then_rejects() {
        let h = harness();

        let err = h.ledger.play("UNKNOWN").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoRemainingTime(ref code) if code == "unknown"));

        let stored = h.store.find_balance("unknown".into()).await.unwrap();
        assert!(stored.is_some());
        assert_eq!(actions(&h.store), vec![ActionKind::Checkin]);
        assert!(h.notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn play_twice_matches_play_once() {
        let h = harness();
        h.ledger.add_time("band-7", 600).await.unwrap();

        let once = h.ledger.play("band-7").await.unwrap();
        h.clock.advance(Duration::from_secs(3));
        let twice = h.ledger.play("band-7").await.unwrap();

        assert_eq!(once, twice);
        let stored = h.store.find_balance("band-7".into()).await.unwrap().unwrap();
        assert_eq!(stored, once);
        let plays = actions(&h.store)
            .into_iter()
            .filter(|action| *action == ActionKind::Play)
            .count();
        assert_eq!(plays, 1);
    }

    #[tokio::test]
    async fn pause_twice_matches_pause_once() {
        let h = harness();
        h.ledger.add_time("band-8", 600).await.unwrap();
        h.ledger.play("band-8").await.unwrap();
        h.clock.advance(Duration::from_secs(42));

        let once = h.ledger.pause("band-8").await.unwrap();
        h.clock.advance(Duration::from_secs(30));
        let twice = h.ledger.pause("band-8").await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.accumulated_seconds, 42);
        let pauses = actions(&h.store)
            .into_iter()
            .filter(|action| *action == ActionKind::Pause)
            .count();
        assert_eq!(pauses, 1);
        assert_eq!(h.store.actions().last().unwrap().data, json!({ "extra": 42 }));
    }

    #[tokio::test]
    async fn pause_and_status_require_an_existing_balance() {
        let h = harness();

        let err = h.ledger.pause("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(_)));

        let err = h.ledger.get_status("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(_)));

        assert!(h.store.find_balance("ghost".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_time_raises_remaining_by_exactly_the_amount() {
        let h = harness();
        h.ledger.add_time("band-1", 120).await.unwrap();
        let before = h.ledger.get_status("band-1").await.unwrap().remaining_seconds;

        let balance = h.ledger.add_time("band-1", 300).await.unwrap();
        let after = h.ledger.get_status("band-1").await.unwrap().remaining_seconds;

        assert_eq!(after, before + 300);
        assert_eq!(
            balance.expires_at,
            Some(h.clock.now() + Duration::from_secs(420))
        );
        assert_eq!(
            h.store.actions().last().unwrap().data,
            json!({ "totalSecondsToAdd": 300 })
        );
    }

    #[tokio::test]
    async fn add_time_rejects_zero_seconds() {
        let h = harness();
        let err = h.ledger.add_time("band-1", 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(h.store.actions().is_empty());
    }

    #[tokio::test]
    async fn add_time_rejects_credits_above_the_cap() {
        let h = harness();

        for seconds in [MAX_CREDIT_SECONDS + 1, i64::MAX as u64, u64::MAX] {
            let err = h.ledger.add_time("band-1", seconds).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        assert!(h.store.actions().is_empty());
        assert!(h.notifier.kinds().is_empty());

        let balance = h.ledger.add_time("band-1", MAX_CREDIT_SECONDS).await.unwrap();
        assert_eq!(balance.total_allowed_seconds, MAX_CREDIT_SECONDS as i64);
    }

    #[tokio::test]
    async fn add_time_on_a_saturated_balance_leaves_expiry_unset() {
        let h = harness();
        let mut balance = h.ledger.get_or_create("band-1").await.unwrap();
        balance.total_allowed_seconds = i64::MAX - 10;
        h.store.save_balance(balance).await.unwrap();

        let balance = h.ledger.add_time("band-1", 60).await.unwrap();
        assert_eq!(balance.total_allowed_seconds, i64::MAX);
        assert_eq!(balance.expires_at, None);

        let snapshot = h.ledger.get_status("band-1").await.unwrap();
        assert_eq!(snapshot.remaining_seconds, i64::MAX as u64);
        assert_eq!(snapshot.status, SessionStatus::Waiting);
    }

    #[tokio::test]
    async fn accumulated_seconds_never_decrease() {
        let h = harness();
        h.ledger.add_time("band-2", 100).await.unwrap();

        let mut last = 0;
        for step in [7_u64, 0, 13, 200] {
            h.ledger.play("band-2").await.ok();
            h.clock.advance(Duration::from_secs(step));
            let snapshot = h.ledger.get_status("band-2").await.unwrap();
            assert!(snapshot.balance.accumulated_seconds >= last);
            last = snapshot.balance.accumulated_seconds;

            if let Ok(balance) = h.ledger.pause("band-2").await {
                assert!(balance.accumulated_seconds >= last);
                last = balance.accumulated_seconds;
            }
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn remaining_is_clamped_when_clock_goes_backwards() {
        let h = harness();
        h.ledger.add_time("band-3", 60).await.unwrap();
        h.ledger.play("band-3").await.unwrap();

        h.clock.set(h.clock.now() - Duration::from_secs(3600));
        let snapshot = h.ledger.get_status("band-3").await.unwrap();
        assert_eq!(snapshot.remaining_seconds, 60);
        assert_eq!(snapshot.status, SessionStatus::Playing);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        let mut balance = balance_with(true, Some(now - Duration::from_secs(500)), 90);
        balance.total_allowed_seconds = 100;
        assert_eq!(compute_remaining(&balance, now), 0);

        balance.total_allowed_seconds = -5;
        balance.is_active = false;
        assert_eq!(compute_remaining(&balance, now), 0);

        balance.accumulated_seconds = i64::MAX;
        balance.total_allowed_seconds = 10;
        assert_eq!(compute_remaining(&balance, now), 0);
    }

    #[test]
    fn status_classification_table() {
        let started = Some(SystemTime::UNIX_EPOCH);
        let cases = [
            (balance_with(false, None, 0), 30, SessionStatus::Waiting),
            (balance_with(true, started, 0), 30, SessionStatus::Playing),
            (balance_with(false, None, 12), 30, SessionStatus::Paused),
            (balance_with(false, started, 0), 30, SessionStatus::Paused),
            (balance_with(false, None, 0), 0, SessionStatus::Paused),
            (balance_with(true, started, 0), 0, SessionStatus::Paused),
        ];

        for (balance, remaining, expected) in cases {
            assert_eq!(
                derive_status(&balance, remaining),
                expected,
                "active={} started={} accumulated={} remaining={}",
                balance.is_active,
                balance.last_start_at.is_some(),
                balance.accumulated_seconds,
                remaining
            );
        }
    }

    #[tokio::test]
    async fn active_listing_skips_exhausted_balances() {
        let h = harness();
        h.ledger.add_time("with-time", 90).await.unwrap();
        h.ledger.get_or_create("empty").await.unwrap();

        let active = h.ledger.get_all_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].balance.barcode_id, "with-time");
        assert_eq!(active[0].remaining_seconds, 90);
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let h = harness();
        h.store.set_offline(true);

        let err = h.ledger.get_or_create("band-9").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(h.notifier.kinds().is_empty());
    }

    #[test]
    fn barcodes_are_normalised() {
        assert_eq!(normalize_barcode("  ZX-001\n").unwrap(), "zx-001");
        assert!(matches!(
            normalize_barcode("   "),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(normalize_barcode(&"x".repeat(MAX_BARCODE_LENGTH + 1)).is_err());
        assert!(matches!(
            normalize_barcode("zx 42"),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn barcode_check_reports_the_first_problem() {
        assert_eq!(check_barcode(" zx_1 "), Ok("zx_1"));
        assert_eq!(check_barcode(""), Err(BarcodeError::Empty));
        assert_eq!(
            check_barcode(&"a".repeat(MAX_BARCODE_LENGTH + 1)),
            Err(BarcodeError::TooLong(MAX_BARCODE_LENGTH + 1))
        );
        assert_eq!(check_barcode("zx/42"), Err(BarcodeError::InvalidCharacter));
        // Length counts characters, so a long non-ASCII code is reported as too long.
        assert_eq!(
            check_barcode(&"ñ".repeat(MAX_BARCODE_LENGTH + 1)),
            Err(BarcodeError::TooLong(MAX_BARCODE_LENGTH + 1))
        );
    }

    #[tokio::test]
    async fn path_style_barcodes_are_checked_before_any_write() {
        let h = harness();

        let err = h.ledger.add_time("zx 42", 60).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let err = h.ledger.play("zx 42").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert!(h.store.list_balances().await.unwrap().is_empty());
        assert!(h.store.actions().is_empty());
    }
}
