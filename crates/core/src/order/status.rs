//! Order status state machine.
//!
//! ```text
//! pending ──► confirmed ──► preparing ──► out_for_delivery ──► delivered
//!    │            │             │
//!    └────────────┴─────────────┴──────► cancelled
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting franchise confirmation.
    Pending,
    /// Accepted by the franchise.
    Confirmed,
    /// Being picked and packed.
    Preparing,
    /// Handed to the courier.
    OutForDelivery,
    /// Received by the customer.
    Delivered,
    /// Cancelled; stock has been restored.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable in one step from this one.
    #[must_use]
    pub const fn next_statuses(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Preparing, Self::Cancelled],
            Self::Preparing => &[Self::OutForDelivery, Self::Cancelled],
            Self::OutForDelivery => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Returns true when no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns true if moving to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.next_statuses().contains(&next)
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
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Checks a transition against the adjacency table.
#[must_use]
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    from.can_transition_to(to)
}

/// Full adjacency table keyed by status name, for client introspection.
///
/// Terminal statuses map to an empty list.
#[must_use]
pub fn transition_map() -> BTreeMap<&'static str, Vec<&'static str>> {
    OrderStatus::ALL
        .into_iter()
        .map(|from| {
            let targets = from.next_statuses().iter().map(OrderStatus::as_str).collect();
            (from.as_str(), targets)
        })
        .collect()
}

/// Which stock row an order item was reserved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSource {
    /// The franchise's override row.
    Franchise,
    /// The master catalog product.
    Master,
}

impl StockSource {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Franchise => "franchise",
            Self::Master => "master",
        }
    }
}

impl FromStr for StockSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "franchise" => Ok(Self::Franchise),
            "master" => Ok(Self::Master),
            other => Err(format!("unknown stock source: {other}")),
        }
    }
}
