use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{DomainError, Entity};
use super::product::Product;

/// Largest total an order row can hold (`NUMERIC(10, 2)`).
const MAX_ORDER_TOTAL: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Internal(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// One requested line of an order, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

/// The outcome of checking a request against locked product rows: what to
/// insert and how much stock to take from each product.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total_amount: BigDecimal,
    /// Aggregate demand per product, in first-requested order.
    pub stock_decrements: Vec<(Uuid, i32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    /// True when the order holds exactly these lines, in request order.
    pub fn placed_from(&self, items: &[OrderItemRequest]) -> bool {
        self.items.len() == items.len()
            && self
                .items
                .iter()
                .zip(items)
                .all(|(held, asked)| {
                    held.product_id == asked.product_id && held.quantity == asked.quantity
                })
    }
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: OrderView,
    /// True when an earlier order with the same idempotency key was returned.
    pub replayed: bool,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<OrderView>,
    pub total: i64,
}

/// Answer a resubmission with the order its idempotency key already names.
///
/// A key reused for different lines is a conflict, not a replay.
pub fn replay_order(existing: OrderView, order: &NewOrder) -> Result<PlacedOrder, DomainError> {
    if !existing.placed_from(&order.items) {
        return Err(DomainError::Conflict(format!(
            "Idempotency-Key '{}' was already used for a different order",
            order.idempotency_key.as_deref().unwrap_or_default()
        )));
    }
    Ok(PlacedOrder {
        order: existing,
        replayed: true,
    })
}

/// Validate requested lines against current product rows and snapshot prices.
///
/// `products` must hold the rows as read inside the placing transaction.
/// Errors name the first offending product in request order. Lines naming
/// the same product are checked against stock by their combined quantity.
pub fn price_order(
    items: &[OrderItemRequest],
    products: &HashMap<Uuid, Product>,
) -> Result<PricedOrder, DomainError> {
    let mut demand: Vec<(Uuid, i64)> = Vec::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| DomainError::not_found(Entity::Product, item.product_id))?;

        match demand.iter_mut().find(|(id, _)| *id == product.id) {
            Some((_, qty)) => *qty += i64::from(item.quantity),
            None => demand.push((product.id, i64::from(item.quantity))),
        }

        lines.push(PricedLine {
            product_id: product.id,
            quantity: item.quantity,
            unit_price: product.price.clone(),
        });
    }

    let mut stock_decrements = Vec::with_capacity(demand.len());
    for (product_id, requested) in demand {
        let available = products[&product_id].stock_quantity;
        if requested > i64::from(available) {
            return Err(DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            });
        }
        let qty = i32::try_from(requested)
            .map_err(|_| DomainError::Internal(format!("demand overflow for {product_id}")))?;
        stock_decrements.push((product_id, qty));
    }

    let total_amount = lines.iter().fold(BigDecimal::zero(), |acc, l| {
        acc + &l.unit_price * BigDecimal::from(l.quantity)
    });
    if total_amount >= BigDecimal::from(MAX_ORDER_TOTAL) {
        return Err(DomainError::validation(
            "items",
            "order total exceeds the maximum order amount",
        ));
    }

    Ok(PricedOrder {
        lines,
        total_amount,
        stock_decrements,
    })
}
