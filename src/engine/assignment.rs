use tracing::{info, warn};

use crate::engine::conflicts::resolve_conflicts;
use crate::engine::selection::nearest_driver;
use crate::error::AppError;
use crate::models::order::{Order, OrderSubmission};
use crate::roster::RosterEntry;
use crate::state::AppState;
use crate::store::StoreError;

/// Run the full assignment pipeline for a validated submission: resolve
/// scheduling conflicts, fetch the live roster, pick the nearest driver
/// and persist the order together with its availability record.
///
/// The roster snapshot is not isolated from concurrent writes; a stale
/// snapshot that loses the slot race surfaces as a retryable conflict.
pub async fn assign_order(state: &AppState, submission: OrderSubmission) -> Result<Order, AppError> {
    let bookings = state.store.same_day_until(submission.schedule);
    let conflicts = resolve_conflicts(&bookings, submission.schedule);
    let roster = fetch_roster(state).await;

    let driver = nearest_driver(&roster, &conflicts, submission.pickup_point())
        .ok_or(AppError::NoDriverAvailable)?
        .to_string();

    let order = state
        .store
        .insert(&submission, &driver)
        .map_err(|err| match err {
            StoreError::SlotTaken { .. } => AppError::Conflict(err.to_string()),
        })?;

    info!(
        order_id = %order.id,
        driver = %order.driver_available.driver,
        schedule = %order.driver_available.schedule,
        "order assigned"
    );

    Ok(order)
}

/// Fetch the external roster, degrading to an empty pool on failure.
/// Degradations are logged and counted; a submission that ends up with an
/// empty pool still fails closed with "no drivers available".
async fn fetch_roster(state: &AppState) -> Vec<RosterEntry> {
    match state.roster.fetch().await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "roster fetch failed; continuing with an empty pool");
            state.metrics.roster_fetch_failures.inc();
            Vec::new()
        }
    }
}
