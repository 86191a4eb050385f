use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::models::event::OrderEvent;
use crate::observability::metrics::Metrics;
use crate::service::OrderService;
use crate::store::OrderStore;

pub struct AppState {
    pub orders: OrderService,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>, event_buffer_size: usize, store_timeout: Duration) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let metrics = Metrics::new();

        Self {
            orders: OrderService::new(store, metrics.clone(), order_events_tx.clone(), store_timeout),
            order_events_tx,
            metrics,
        }
    }
}
