use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of an order. `Taken` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Unassigned,
    Taken,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unassigned => "UNASSIGNED",
            OrderStatus::Taken => "TAKEN",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNASSIGNED" => Ok(OrderStatus::Unassigned),
            "TAKEN" => Ok(OrderStatus::Taken),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A stored order. `id` and `distance` never change after creation;
/// `version` is the optimistic-lock token bumped by every status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub distance: i64,
    pub status: OrderStatus,
    pub version: i64,
}

/// The facts an order is created with, before the store assigns an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrder {
    pub distance: i64,
}

pub const INITIAL_VERSION: i64 = 1;
