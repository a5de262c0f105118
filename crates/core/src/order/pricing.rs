//! Effective pricing, delivery fees, and order totals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A promotional price with an optional validity window.
///
/// Missing bounds are open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Discounted price.
    pub price: Decimal,
    /// First day the promotion applies.
    pub start: Option<NaiveDate>,
    /// Last day the promotion applies.
    pub end: Option<NaiveDate>,
}

impl Promotion {
    /// Returns true if the window covers `today`.
    #[must_use]
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.start.is_none_or(|start| start <= today) && self.end.is_none_or(|end| today <= end)
    }
}

/// Master catalog pricing for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductPricing {
    /// Regular shelf price.
    pub retail: Decimal,
    /// Optional promotion.
    pub promotion: Option<Promotion>,
}

/// Franchise-level price overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceOverride {
    /// Replaces the master retail price.
    pub retail: Option<Decimal>,
    /// Replaces the master promotion price; the master window still applies.
    pub promotion: Option<Decimal>,
}

/// Resolves the price a customer pays today.
///
/// Override values replace master values field by field. A promotion price
/// wins over retail only inside the master promotion window.
#[must_use]
pub fn effective_price(
    master: &ProductPricing,
    franchise: Option<&PriceOverride>,
    today: NaiveDate,
) -> Decimal {
    let retail = franchise
        .and_then(|o| o.retail)
        .unwrap_or(master.retail);

    let window_open = master
        .promotion
        .is_none_or(|promotion| promotion.is_active_on(today));

    let promotion_price = franchise
        .and_then(|o| o.promotion)
        .or_else(|| master.promotion.map(|p| p.price));

    match promotion_price {
        Some(price) if window_open => price,
        _ => retail,
    }
}

/// Flat delivery fee waived above a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Fee charged below the threshold.
    pub fee: Decimal,
    /// Subtotal at or above which delivery is free.
    pub free_threshold: Decimal,
}

impl DeliveryPolicy {
    /// Delivery fee for a given subtotal.
    #[must_use]
    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.fee
        }
    }
}

impl From<grocer_shared::config::DeliveryConfig> for DeliveryPolicy {
    fn from(config: grocer_shared::config::DeliveryConfig) -> Self {
        Self {
            fee: config.default_fee,
            free_threshold: config.default_free_threshold,
        }
    }
}

/// Monetary summary of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Delivery fee after the free-delivery rule.
    pub delivery_fee: Decimal,
    /// `subtotal + delivery_fee`.
    pub total: Decimal,
    /// Loyalty points, `floor(subtotal)`.
    pub points_earned: i32,
}

/// Computes totals from `(unit_price, quantity)` lines.
#[must_use]
pub fn compute_totals(lines: &[(Decimal, i32)], policy: &DeliveryPolicy) -> OrderTotals {
    let subtotal: Decimal = lines
        .iter()
        .map(|(price, quantity)| *price * Decimal::from(*quantity))
        .sum();
    let delivery_fee = policy.fee_for(subtotal);

    OrderTotals {
        subtotal,
        delivery_fee,
        total: subtotal + delivery_fee,
        points_earned: subtotal.floor().to_i32().unwrap_or(i32::MAX),
    }
}
