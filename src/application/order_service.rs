use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    NewOrder, OrderItemRequest, OrderPage, OrderStatus, OrderView, PlacedOrder,
};
use crate::domain::pagination::PageRequest;
use crate::domain::ports::OrderRepository;

pub const MAX_ORDER_LINES: usize = 100;
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// An order line as submitted by a caller, before validation.
#[derive(Debug, Clone)]
pub struct RequestedItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }

    pub fn place_order(
        &self,
        owner_id: Uuid,
        items: &[RequestedItem],
        idempotency_key: Option<String>,
    ) -> Result<PlacedOrder, DomainError> {
        let order = validate_order(owner_id, items, idempotency_key)?;

        match self.repo.place(order) {
            Ok(placed) => {
                if placed.replayed {
                    log::info!(
                        "Replayed order {} for user {} from idempotency key",
                        placed.order.id,
                        owner_id
                    );
                } else {
                    log::info!(
                        "Order {} placed by user {}: {} item(s), total {}",
                        placed.order.id,
                        owner_id,
                        placed.order.items.len(),
                        placed.order.total_amount
                    );
                }
                Ok(placed)
            }
            Err(e) => {
                log::warn!("Order placement for user {} rejected: {}", owner_id, e);
                Err(e)
            }
        }
    }

    /// Orders owned by someone else are reported as absent.
    pub fn get_order(
        &self,
        order_id: Uuid,
        requesting_user: Uuid,
    ) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_for_owner(order_id, requesting_user)
    }

    pub fn list_orders(&self, owner_id: Uuid, page: PageRequest) -> Result<OrderPage, DomainError> {
        self.repo.list_for_owner(owner_id, page)
    }

    /// Orders of every user, for back-office use. `status` must name a known
    /// order status when given.
    pub fn list_all_orders(
        &self,
        page: PageRequest,
        status: Option<&str>,
    ) -> Result<OrderPage, DomainError> {
        let status = status.map(parse_status_filter).transpose()?;
        self.repo.list_all(page, status)
    }
}

fn parse_status_filter(raw: &str) -> Result<OrderStatus, DomainError> {
    raw.trim().parse().map_err(|_| {
        DomainError::validation(
            "status",
            format!("unknown status '{raw}', expected pending, completed or cancelled"),
        )
    })
}

/// Check a submitted order before any store access.
pub fn validate_order(
    owner_id: Uuid,
    items: &[RequestedItem],
    idempotency_key: Option<String>,
) -> Result<NewOrder, DomainError> {
    if items.is_empty() {
        return Err(DomainError::validation(
            "items",
            "items array is required and must not be empty",
        ));
    }
    if items.len() > MAX_ORDER_LINES {
        return Err(DomainError::validation(
            "items",
            format!("an order may contain at most {MAX_ORDER_LINES} items"),
        ));
    }

    let items = items
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<OrderItemRequest, DomainError> {
            let product_id = Uuid::parse_str(item.product_id.trim()).map_err(|_| {
                DomainError::validation(
                    format!("items[{i}].productId"),
                    "productId must be a valid UUID",
                )
            })?;
            let quantity = i32::try_from(item.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| {
                    DomainError::validation(
                        format!("items[{i}].quantity"),
                        "quantity must be a positive integer",
                    )
                })?;
            Ok(OrderItemRequest {
                product_id,
                quantity,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(key) = idempotency_key.as_deref() {
        if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(DomainError::validation(
                "Idempotency-Key",
                format!("must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"),
            ));
        }
    }

    Ok(NewOrder {
        owner_id,
        items,
        idempotency_key,
    })
}
