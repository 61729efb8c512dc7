use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i32,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation { field, reason } => AppError::Validation { field, reason },
            DomainError::NotFound { entity, id } => {
                AppError::NotFound(format!("{entity} {id} not found"))
            }
            DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            } => AppError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Transient(msg) => AppError::Unavailable(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

// ── Error body ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `INSUFFICIENT_STOCK`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn body(&self) -> ErrorResponse {
        let (message, details) = match self {
            AppError::Validation { field, reason } => (
                self.to_string(),
                Some(vec![FieldError {
                    field: field.clone(),
                    reason: reason.clone(),
                }]),
            ),
            AppError::Unavailable(_) => (
                "The store is temporarily unavailable, retry the request".to_string(),
                None,
            ),
            AppError::Internal(_) => ("An internal server error occurred".to_string(), None),
            _ => (self.to_string(), None),
        };
        ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                details,
            },
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Internal(_) => log::error!("Request failed: {}", self),
            AppError::Unavailable(_) => log::warn!("Request failed: {}", self),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

/// Failures that stop a binary before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create database connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Failed to run database migrations: {0}")]
    Migrations(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::Entity;
    use actix_web::body::MessageBody;
    use actix_web::ResponseError;

    fn body_json(err: &AppError) -> serde_json::Value {
        let bytes = err
            .error_response()
            .into_body()
            .try_into_bytes()
            .expect("body is in memory");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order not found".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500_and_hides_details() {
        let err = AppError::Internal("connection string leaked".to_string());
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(&err);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("leaked"));
    }

    #[test]
    fn validation_error_carries_field_details() {
        let err = AppError::Validation {
            field: "items[0].quantity".to_string(),
            reason: "quantity must be a positive integer".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = body_json(&err);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "items[0].quantity");
    }

    #[test]
    fn stock_and_conflict_map_to_409() {
        let stock = AppError::InsufficientStock {
            product_id: Uuid::new_v4(),
            requested: 3,
            available: 2,
        };
        assert_eq!(stock.status_code(), StatusCode::CONFLICT);
        assert_eq!(body_json(&stock)["error"]["code"], "INSUFFICIENT_STOCK");
        assert_eq!(
            AppError::Conflict("serialization failure".to_string()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn unauthorized_and_unavailable_statuses() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Unavailable("pool timed out".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn domain_errors_map_to_app_errors() {
        let id = Uuid::new_v4();
        let not_found: AppError = DomainError::not_found(Entity::Product, id).into();
        assert!(matches!(not_found, AppError::NotFound(ref m) if m.contains(&id.to_string())));

        let stock: AppError = DomainError::InsufficientStock {
            product_id: id,
            requested: 5,
            available: 1,
        }
        .into();
        assert!(matches!(
            stock,
            AppError::InsufficientStock {
                requested: 5,
                available: 1,
                ..
            }
        ));

        let transient: AppError = DomainError::Transient("timeout".to_string()).into();
        assert!(matches!(transient, AppError::Unavailable(_)));

        let invalid: AppError = DomainError::validation("items", "empty").into();
        assert!(matches!(invalid, AppError::Validation { .. }));
    }

    #[test]
    fn insufficient_stock_display() {
        let id = Uuid::nil();
        assert_eq!(
            AppError::InsufficientStock {
                product_id: id,
                requested: 3,
                available: 2,
            }
            .to_string(),
            format!("Insufficient stock for product {id}: requested 3, available 2")
        );
    }
}
