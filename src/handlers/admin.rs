use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::AdminCaller;
use super::orders::{ListOrdersResponse, OrderResponse};
use super::products::ProductResponse;
use crate::application::catalog_service::{CatalogService, ProductInput};
use crate::application::order_service::OrderService;
use crate::domain::pagination::PageRequest;
use crate::errors::{AppError, ErrorResponse};

/// Product fields. Every field is required on create; an update changes only
/// the fields it names.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Decimal string with at most two places, e.g. "12.50"
    pub price: Option<String>,
    pub stock_quantity: Option<i64>,
}

impl From<ProductRequest> for ProductInput {
    fn from(r: ProductRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            price: r.price,
            stock_quantity: r.stock_quantity,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminListOrdersParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// One of `pending`, `completed`, `cancelled`.
    pub status: Option<String>,
}

/// POST /admin/products
#[utoipa::path(
    post,
    path = "/admin/products",
    request_body = ProductRequest,
    params(
        ("X-Admin-Token" = String, Header, description = "Back-office token"),
    ),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product", body = ErrorResponse),
        (status = 401, description = "Missing or wrong admin token", body = ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn create_product(
    _admin: AdminCaller,
    service: web::Data<CatalogService>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let input = ProductInput::from(body.into_inner());

    let product = web::block(move || service.create_product(input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PUT /admin/products/{id}
#[utoipa::path(
    put,
    path = "/admin/products/{id}",
    request_body = ProductRequest,
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
        ("X-Admin-Token" = String, Header, description = "Back-office token"),
    ),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid or empty update", body = ErrorResponse),
        (status = 401, description = "Missing or wrong admin token", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn update_product(
    _admin: AdminCaller,
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let input = ProductInput::from(body.into_inner());

    let product = web::block(move || service.update_product(product_id, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /admin/products/{id}
///
/// A product that appears on any order cannot be deleted.
#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
        ("X-Admin-Token" = String, Header, description = "Back-office token"),
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Missing or wrong admin token", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Product is referenced by orders", body = ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn delete_product(
    _admin: AdminCaller,
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    web::block(move || service.delete_product(product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/orders
///
/// Every user's orders, newest first, optionally narrowed to one status.
#[utoipa::path(
    get,
    path = "/admin/orders",
    operation_id = "admin_list_orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "pending, completed or cancelled"),
        ("X-Admin-Token" = String, Header, description = "Back-office token"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 401, description = "Missing or wrong admin token", body = ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    _admin: AdminCaller,
    service: web::Data<OrderService>,
    query: web::Query<AdminListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = PageRequest::new(params.page, params.limit);
    let status = params.status;

    let result = web::block(move || service.list_all_orders(page, status.as_deref()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}
