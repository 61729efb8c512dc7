use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::format_amount;
use crate::application::catalog_service::CatalogService;
use crate::domain::pagination::PageRequest;
use crate::domain::product::{Product, ProductSort};
use crate::errors::{AppError, ErrorResponse};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub product_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock_quantity: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.id,
            name: p.name,
            description: p.description,
            price: format_amount(&p.price),
            stock_quantity: p.stock_quantity,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListProductsParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// One of `newest` (default), `price_asc`, `price_desc`.
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("sort" = Option<String>, Query, description = "newest, price_asc or price_desc"),
    ),
    responses(
        (status = 200, description = "Paginated product catalog", body = ListProductsResponse),
        (status = 400, description = "Unknown sort order", body = ErrorResponse),
    ),
    tag = "products"
)]
pub async fn list_products(
    service: web::Data<CatalogService>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = PageRequest::new(params.page, params.limit);
    let sort = match params.sort.as_deref() {
        Some(s) => s.parse::<ProductSort>()?,
        None => ProductSort::default(),
    };

    let result = web::block(move || service.list_products(page, sort))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListProductsResponse {
        items: result.items.into_iter().map(ProductResponse::from).collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
    }))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let result = web::block(move || service.get_product(product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match result {
        Some(product) => Ok(HttpResponse::Ok().json(ProductResponse::from(product))),
        None => Err(AppError::NotFound("Product not found".to_string())),
    }
}
