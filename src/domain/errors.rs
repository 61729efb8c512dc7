use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The kind of record a [`DomainError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Product,
    Order,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => f.write_str("User"),
            Entity::Product => f.write_str("Product"),
            Entity::Order => f.write_str("Order"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i32,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    Transient(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        DomainError::NotFound { entity, id }
    }
}
