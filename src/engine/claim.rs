use tracing::{debug, warn};

use crate::models::order::{Order, OrderStatus};
use crate::store::{OrderStore, StoreError, UpdateOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(Order),
    AlreadyTaken,
    /// Another claim committed between our read and our write.
    Conflict,
    NotFound,
}

impl ClaimOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ClaimOutcome::Claimed(_) => "claimed",
            ClaimOutcome::AlreadyTaken => "already_taken",
            ClaimOutcome::Conflict => "conflict",
            ClaimOutcome::NotFound => "not_found",
        }
    }
}

/// Moves an order from `UNASSIGNED` to `TAKEN`.
///
/// The status read is only an early exit. Exactly-once is enforced by the
/// version compare-and-set, so a stale read can at worst turn into
/// `Conflict`. Nothing is retried here; a caller that wants another attempt
/// re-reads and calls again.
pub async fn claim(store: &dyn OrderStore, id: i64) -> Result<ClaimOutcome, StoreError> {
    let Some(order) = store.fetch(id).await? else {
        return Ok(ClaimOutcome::NotFound);
    };

    if order.status == OrderStatus::Taken {
        debug!(order_id = id, version = order.version, "order already taken");
        return Ok(ClaimOutcome::AlreadyTaken);
    }

    let outcome = match store
        .conditional_update(id, order.version, OrderStatus::Taken)
        .await?
    {
        UpdateOutcome::Updated(order) => ClaimOutcome::Claimed(order),
        UpdateOutcome::VersionConflict => {
            warn!(order_id = id, version = order.version, "claim lost a race");
            ClaimOutcome::Conflict
        }
        UpdateOutcome::NotFound => ClaimOutcome::NotFound,
    };

    Ok(outcome)
}
