pub mod admin;
pub mod auth;
pub mod orders;
pub mod products;
pub mod users;

use actix_web::web;
use bigdecimal::BigDecimal;

use crate::errors::AppError;

/// Render a money amount with exactly two decimal places.
pub(crate) fn format_amount(amount: &BigDecimal) -> String {
    amount.with_scale(2).to_string()
}

// Extractor failures use the same error body as everything else.

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation {
            field: "body".to_string(),
            reason: err.to_string(),
        }
        .into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        AppError::Validation {
            field: "path".to_string(),
            reason: err.to_string(),
        }
        .into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation {
            field: "query".to_string(),
            reason: err.to_string(),
        }
        .into()
    })
}
