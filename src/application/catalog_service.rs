use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use crate::domain::errors::{DomainError, Entity};
use crate::domain::pagination::PageRequest;
use crate::domain::ports::CatalogRepository;
use crate::domain::product::{NewProduct, Product, ProductChanges, ProductPage, ProductSort};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Prices are stored as `NUMERIC(10, 2)`.
const MAX_PRICE: i64 = 100_000_000;

/// Product fields as submitted by a caller, before validation. Creation
/// needs every field; an update needs at least one.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub stock_quantity: Option<i64>,
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    pub fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn list_products(
        &self,
        page: PageRequest,
        sort: ProductSort,
    ) -> Result<ProductPage, DomainError> {
        self.repo.list(page, sort)
    }

    pub fn create_product(&self, input: ProductInput) -> Result<Product, DomainError> {
        let product = self.repo.create(validate_new_product(input)?)?;
        log::info!("Product {} ({}) created", product.id, product.name);
        Ok(product)
    }

    pub fn update_product(&self, id: Uuid, input: ProductInput) -> Result<Product, DomainError> {
        let changes = validate_product_changes(input)?;
        let product = self
            .repo
            .update(id, changes)?
            .ok_or_else(|| DomainError::not_found(Entity::Product, id))?;
        log::info!("Product {} updated", id);
        Ok(product)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.repo.delete(id)? {
            return Err(DomainError::not_found(Entity::Product, id));
        }
        log::info!("Product {} deleted", id);
        Ok(())
    }

    /// Products with fewer than `threshold` units left, and a warning per hit.
    pub fn stock_alert(&self, threshold: i32) -> Result<Vec<Product>, DomainError> {
        let low = self.repo.find_low_stock(threshold)?;

        if low.is_empty() {
            log::info!("No products below the stock threshold of {}", threshold);
        } else {
            log::warn!(
                "Found {} product(s) below the stock threshold of {}",
                low.len(),
                threshold
            );
            for p in &low {
                log::warn!("Low stock: {} ({}) has {} left", p.name, p.id, p.stock_quantity);
            }
        }

        Ok(low)
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, DomainError> {
    value.ok_or_else(|| DomainError::validation(field, format!("{field} is required")))
}

fn text(value: String, field: &str, max_len: usize) -> Result<String, DomainError> {
    let value = value.trim().to_string();
    let len = value.chars().count();
    if len == 0 || len > max_len {
        return Err(DomainError::validation(
            field,
            format!("{field} must be 1 to {max_len} characters"),
        ));
    }
    Ok(value)
}

fn price(raw: &str) -> Result<BigDecimal, DomainError> {
    let invalid = || {
        DomainError::validation(
            "price",
            "price must be a non-negative amount with at most two decimal places",
        )
    };
    let price = BigDecimal::from_str(raw.trim()).map_err(|_| invalid())?;
    let (_, scale) = price.as_bigint_and_exponent();
    if price < BigDecimal::zero() || scale > 2 || price >= BigDecimal::from(MAX_PRICE) {
        return Err(invalid());
    }
    Ok(price)
}

fn stock(raw: i64) -> Result<i32, DomainError> {
    i32::try_from(raw).ok().filter(|s| *s >= 0).ok_or_else(|| {
        DomainError::validation("stockQuantity", "stockQuantity must be a non-negative integer")
    })
}

pub fn validate_new_product(input: ProductInput) -> Result<NewProduct, DomainError> {
    Ok(NewProduct {
        name: text(required(input.name, "name")?, "name", MAX_NAME_LEN)?,
        description: text(
            required(input.description, "description")?,
            "description",
            MAX_DESCRIPTION_LEN,
        )?,
        price: price(&required(input.price, "price")?)?,
        stock_quantity: stock(required(input.stock_quantity, "stockQuantity")?)?,
    })
}

pub fn validate_product_changes(input: ProductInput) -> Result<ProductChanges, DomainError> {
    let changes = ProductChanges {
        name: input
            .name
            .map(|v| text(v, "name", MAX_NAME_LEN))
            .transpose()?,
        description: input
            .description
            .map(|v| text(v, "description", MAX_DESCRIPTION_LEN))
            .transpose()?,
        price: input.price.as_deref().map(price).transpose()?,
        stock_quantity: input.stock_quantity.map(stock).transpose()?,
    };
    if changes.is_empty() {
        return Err(DomainError::validation(
            "body",
            "at least one of name, description, price or stockQuantity is required",
        ));
    }
    Ok(changes)
}
