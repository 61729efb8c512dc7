use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderItemView, OrderView};
use crate::domain::product::{NewProduct, Product, ProductChanges};
use crate::domain::user::{NewUser, User};
use crate::schema::{order_items, orders, products, users};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.product_id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock_quantity: row.stock_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock_quantity: i32,
}

impl From<NewProduct> for NewProductRow {
    fn from(p: NewProduct) -> Self {
        Self {
            product_id: Uuid::new_v4(),
            name: p.name,
            description: p.description,
            price: p.price,
            stock_quantity: p.stock_quantity,
        }
    }
}

/// `None` columns are skipped by the update.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangesRow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub stock_quantity: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductChanges> for ProductChangesRow {
    fn from(c: ProductChanges) -> Self {
        Self {
            name: c.name,
            description: c.description,
            price: c.price,
            stock_quantity: c.stock_quantity,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.user_id,
            email: row.email,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<NewUser> for NewUserRow {
    fn from(u: NewUser) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: u.email,
            name: u.name,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Fails on a status string the domain does not know.
    pub fn into_view(self, items: Vec<OrderItemView>) -> Result<OrderView, DomainError> {
        Ok(OrderView {
            id: self.order_id,
            owner_id: self.user_id,
            total_amount: self.total_amount,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
}

impl OrderItemRow {
    pub fn into_view(self, product_name: String) -> OrderItemView {
        OrderItemView {
            id: self.order_item_id,
            product_id: self.product_id,
            product_name,
            quantity: self.quantity,
            unit_price: self.price,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
}
