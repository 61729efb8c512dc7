use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::CurrentUser;
use super::format_amount;
use crate::application::order_service::{OrderService, RequestedItem};
use crate::domain::order::{OrderItemView, OrderView};
use crate::domain::pagination::PageRequest;
use crate::errors::{AppError, ErrorResponse};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub order_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Price per unit when the order was placed, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(i: OrderItemView) -> Self {
        Self {
            order_item_id: i.id,
            product_id: i.product_id,
            product_name: i.product_name,
            quantity: i.quantity,
            unit_price: format_amount(&i.unit_price),
        }
    }
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            order_id: o.id,
            user_id: o.owner_id,
            total_amount: format_amount(&o.total_amount),
            status: o.status.to_string(),
            items: o.items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 20, maximum 100.
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn idempotency_key(req: &HttpRequest) -> Result<Option<String>, AppError> {
    match req.headers().get(IDEMPOTENCY_KEY_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim().to_string()))
            .map_err(|_| AppError::Validation {
                field: IDEMPOTENCY_KEY_HEADER.to_string(),
                reason: "must be visible ASCII".to_string(),
            }),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order for the calling user. Stock is checked and taken, prices
/// are snapshotted, and the order with its items is written in one database
/// transaction; a rejected order writes nothing. Resubmitting with the same
/// `Idempotency-Key` returns the original order with status 200.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    params(
        ("X-User-ID" = Uuid, Header, description = "Calling user"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client key for safe retries"),
    ),
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 200, description = "Order replayed from idempotency key", body = OrderResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 404, description = "Unknown product or user", body = ErrorResponse),
        (status = 409, description = "Insufficient stock or concurrent modification", body = ErrorResponse),
        (status = 503, description = "Store temporarily unavailable", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<OrderService>,
    user: CurrentUser,
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let key = idempotency_key(&req)?;
    let items: Vec<RequestedItem> = body
        .into_inner()
        .items
        .into_iter()
        .map(|i| RequestedItem {
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .collect();

    let placed = web::block(move || service.place_order(user.0, &items, key))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let response = OrderResponse::from(placed.order);
    if placed.replayed {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}

/// GET /orders/{id}
///
/// Returns the order together with its items. Orders of other users are
/// reported as not found.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-ID" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 400, description = "Malformed order id", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<OrderService>,
    user: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let result = web::block(move || service.get_order(order_id, user.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match result {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Err(AppError::NotFound("Order not found".to_string())),
    }
}

/// GET /orders
///
/// Returns a page of the caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("X-User-ID" = Uuid, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Paginated list of the caller's orders", body = ListOrdersResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: web::Data<OrderService>,
    user: CurrentUser,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = PageRequest::new(params.page, params.limit);

    let result = web::block(move || service.list_orders(user.0, page))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}
