use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::order::{NewOrder, Order, OrderStatus, INITIAL_VERSION};
use crate::store::{OrderStore, StoreError, UpdateOutcome};

/// DashMap-backed store. The shard write lock taken by `get_mut` makes the
/// version check and the write in `conditional_update` one step.
pub struct MemoryOrderStore {
    orders: DashMap<i64, Order>,
    next_id: AtomicI64,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stored = Order {
            id,
            distance: order.distance,
            status: OrderStatus::Unassigned,
            version: INITIAL_VERSION,
        };

        self.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn conditional_update(
        &self,
        id: i64,
        expected_version: i64,
        new_status: OrderStatus,
    ) -> Result<UpdateOutcome, StoreError> {
        let Some(mut order) = self.orders.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };

        if order.version != expected_version {
            return Ok(UpdateOutcome::VersionConflict);
        }

        order.status = new_status;
        order.version = expected_version + 1;
        Ok(UpdateOutcome::Updated(order.clone()))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(0);

        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);

        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }
}
