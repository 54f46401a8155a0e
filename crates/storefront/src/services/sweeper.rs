//! Time-based order transitions.
//!
//! Prepaid orders that are still unpaid after `payment_due` become
//! `payment_overdue`, and delivered orders the customer never confirmed are
//! completed after `auto_complete_after`. Each order moves in its own
//! transaction through [`OrderService::transition`], so a sweep racing a
//! customer or staff action simply skips the order it lost.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sundry_core::OrderId;
use sundry_core::order::{Actor, OrderAction};

use super::OrderService;
use crate::config::LifecycleConfig;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::state::Clock;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub marked_overdue: usize,
    pub auto_completed: usize,
    /// Orders that changed state between selection and update.
    pub skipped: usize,
}

impl SweepReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.marked_overdue == 0 && self.auto_completed == 0 && self.skipped == 0
    }
}

/// Run one sweep at `now`.
///
/// # Errors
///
/// Returns `AppError::Database` if selecting or updating orders fails.
pub async fn run_once(pool: &PgPool, lifecycle: &LifecycleConfig, now: DateTime<Utc>) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    if let Some(cutoff) = cutoff(now, lifecycle.payment_due) {
        let ids = {
            let mut conn = pool.acquire().await?;
            OrderRepository::new(&mut conn)
                .awaiting_payment_since(cutoff)
                .await?
        };
        let (moved, skipped) =
            sweep(pool, lifecycle, &ids, OrderAction::MarkPaymentOverdue, now).await?;
        report.marked_overdue = moved;
        report.skipped += skipped;
    }

    if let Some(cutoff) = cutoff(now, lifecycle.auto_complete_after) {
        let ids = {
            let mut conn = pool.acquire().await?;
            OrderRepository::new(&mut conn).delivered_since(cutoff).await?
        };
        let (moved, skipped) = sweep(pool, lifecycle, &ids, OrderAction::AutoComplete, now).await?;
        report.auto_completed = moved;
        report.skipped += skipped;
    }

    Ok(report)
}

async fn sweep(
    pool: &PgPool,
    lifecycle: &LifecycleConfig,
    ids: &[OrderId],
    action: OrderAction,
    now: DateTime<Utc>,
) -> Result<(usize, usize)> {
    let service = OrderService::new(pool, lifecycle);
    let mut moved = 0;
    let mut skipped = 0;

    for &id in ids {
        match service
            .transition(id, None, action, Actor::system(), None, now)
            .await
        {
            Ok(_) => moved += 1,
            Err(AppError::Transition(err)) => {
                warn!(order_id = %id, error = %err, "Sweep skipped order");
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok((moved, skipped))
}

/// `now - age`, or `None` if the age is out of range.
fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    let age = chrono::Duration::from_std(age).ok()?;
    now.checked_sub_signed(age)
}

/// Start the periodic sweeper, unless it is disabled.
#[must_use]
pub fn spawn(pool: PgPool, lifecycle: LifecycleConfig, clock: Clock) -> Option<JoinHandle<()>> {
    let period = lifecycle.sweep_interval?;

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match run_once(&pool, &lifecycle, clock()).await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => info!(
                    marked_overdue = report.marked_overdue,
                    auto_completed = report.auto_completed,
                    skipped = report.skipped,
                    "Order sweep finished"
                ),
                Err(err) => error!(error = %err, "Order sweep failed"),
            }
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_cutoff_subtracts_age() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            cutoff(now, Duration::from_secs(24 * 60 * 60)),
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap())
        );
        assert_eq!(cutoff(now, Duration::ZERO), Some(now));
    }

    #[test]
    fn test_cutoff_out_of_range() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(cutoff(now, Duration::from_secs(u64::MAX)), None);
    }

    #[tokio::test]
    async fn test_disabled_sweeper_does_not_spawn() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let lifecycle = LifecycleConfig {
            sweep_interval: None,
            ..LifecycleConfig::default()
        };
        assert!(spawn(pool, lifecycle, Utc::now).is_none());
    }

    #[test]
    fn test_report_is_empty() {
        assert!(SweepReport::default().is_empty());
        assert!(
            !SweepReport {
                skipped: 1,
                ..SweepReport::default()
            }
            .is_empty()
        );
    }
}
