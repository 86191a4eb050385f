use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::order::Order;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order: Order, at: DateTime<Utc> },
    Taken { order: Order, at: DateTime<Utc> },
}

impl OrderEvent {
    pub fn created(order: Order) -> Self {
        OrderEvent::Created {
            order,
            at: Utc::now(),
        }
    }

    pub fn taken(order: Order) -> Self {
        OrderEvent::Taken {
            order,
            at: Utc::now(),
        }
    }

    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::Created { order, .. } | OrderEvent::Taken { order, .. } => order,
        }
    }
}
