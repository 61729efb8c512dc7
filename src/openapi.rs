use utoipa::OpenApi;

use crate::errors::{ErrorDetail, ErrorResponse, FieldError};
use crate::handlers::{admin, orders, products, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order,
        orders::get_order,
        orders::list_orders,
        products::list_products,
        products::get_product,
        users::register_user,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_orders,
    ),
    components(schemas(
        orders::CreateOrderRequest,
        orders::CreateOrderItemRequest,
        orders::OrderResponse,
        orders::OrderItemResponse,
        orders::ListOrdersResponse,
        products::ProductResponse,
        products::ListProductsResponse,
        users::RegisterUserRequest,
        users::UserResponse,
        admin::ProductRequest,
        ErrorResponse,
        ErrorDetail,
        FieldError,
    )),
    tags(
        (name = "orders", description = "Order placement and retrieval"),
        (name = "products", description = "Product catalog"),
        (name = "users", description = "User registration"),
        (name = "admin", description = "Back-office catalog and order management"),
    )
)]
pub struct ApiDoc;
