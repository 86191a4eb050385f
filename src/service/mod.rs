use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::engine::claim::{claim, ClaimOutcome};
use crate::error::AppError;
use crate::geo::distance_meters;
use crate::geo::validate::{validate_route, CoordinatePair};
use crate::models::event::OrderEvent;
use crate::models::order::{NewOrder, Order};
use crate::observability::metrics::Metrics;
use crate::store::{OrderStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// The order lifecycle operations offered to the request layer.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    metrics: Metrics,
    events_tx: broadcast::Sender<OrderEvent>,
    store_timeout: Duration,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        metrics: Metrics,
        events_tx: broadcast::Sender<OrderEvent>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            events_tx,
            store_timeout,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn create_order(
        &self,
        origin: &CoordinatePair,
        destination: &CoordinatePair,
    ) -> Result<Order, AppError> {
        let route = validate_route(origin, destination)?;
        let distance = distance_meters(&route.origin, &route.destination);

        let order = self
            .bounded("create", Access::Write, self.store.create(NewOrder { distance }))
            .await?;

        self.metrics.orders_created_total.inc();
        info!(order_id = order.id, distance_m = order.distance, "order created");
        let _ = self.events_tx.send(OrderEvent::created(order.clone()));

        Ok(order)
    }

    pub async fn get_order(&self, id: i64) -> Result<Order, AppError> {
        self.bounded("fetch", Access::Read, self.store.fetch(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    /// Claims the order for the caller. Losing a race is reported as
    /// `Conflict`, never retried.
    pub async fn claim_order(&self, id: i64) -> Result<Order, AppError> {
        let start = Instant::now();
        let result = self
            .bounded("claim", Access::Write, claim(self.store.as_ref(), id))
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                let label = match err {
                    AppError::OutcomeUnknown(_) => "timeout",
                    _ => "error",
                };
                self.metrics.observe_claim(label, elapsed);
                return Err(err);
            }
        };
        self.metrics.observe_claim(outcome.label(), elapsed);

        match outcome {
            ClaimOutcome::Claimed(order) => {
                info!(order_id = order.id, version = order.version, "order taken");
                let _ = self.events_tx.send(OrderEvent::taken(order.clone()));
                Ok(order)
            }
            ClaimOutcome::AlreadyTaken => Err(AppError::AlreadyTaken(id)),
            ClaimOutcome::Conflict => Err(AppError::Conflict(format!(
                "order {id} was taken by a concurrent request"
            ))),
            ClaimOutcome::NotFound => Err(AppError::NotFound(format!("order {id} not found"))),
        }
    }

    /// `page` is 1-based.
    pub async fn list_orders(&self, page: i64, page_size: i64) -> Result<Vec<Order>, AppError> {
        if page < 1 {
            return Err(AppError::BadRequest("page must be >= 1".to_string()));
        }
        if page_size < 1 {
            return Err(AppError::BadRequest("limit must be >= 1".to_string()));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| AppError::BadRequest("page is out of range".to_string()))?;

        self.bounded("list", Access::Read, self.store.list(page_size, offset))
            .await
    }

    /// Runs one store round trip under the configured deadline. A write that
    /// times out may still have landed, so it is reported as unknown.
    async fn bounded<T, F>(&self, operation: &'static str, access: Access, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.metrics
                    .store_errors_total
                    .with_label_values(&[operation])
                    .inc();
                error!(operation, error = %err, "order store failed");
                Err(AppError::Storage(err))
            }
            Err(_) => {
                self.metrics
                    .store_errors_total
                    .with_label_values(&[operation])
                    .inc();
                warn!(operation, timeout_ms = self.store_timeout.as_millis() as u64, "order store timed out");
                let message = format!("{operation} timed out after {:?}", self.store_timeout);
                match access {
                    Access::Write => Err(AppError::OutcomeUnknown(message)),
                    Access::Read => Err(AppError::Storage(StoreError::Unavailable(message))),
                }
            }
        }
    }
}
