use uuid::Uuid;

use super::errors::DomainError;
use super::order::{NewOrder, OrderPage, OrderStatus, OrderView, PlacedOrder};
use super::pagination::PageRequest;
use super::product::{NewProduct, Product, ProductChanges, ProductPage, ProductSort};
use super::user::{NewUser, User};

pub trait OrderRepository: Send + Sync + 'static {
    /// Run the whole placement (idempotency lookup, stock check, decrement
    /// and inserts) as one atomic unit. On error nothing is written.
    fn place(&self, order: NewOrder) -> Result<PlacedOrder, DomainError>;
    fn find_for_owner(&self, id: Uuid, owner_id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list_for_owner(&self, owner_id: Uuid, page: PageRequest) -> Result<OrderPage, DomainError>;
    /// Every owner's orders, newest first, optionally narrowed to one status.
    fn list_all(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn list(&self, page: PageRequest, sort: ProductSort) -> Result<ProductPage, DomainError>;
    fn find_low_stock(&self, threshold: i32) -> Result<Vec<Product>, DomainError>;
    fn create(&self, product: NewProduct) -> Result<Product, DomainError>;
    /// `None` when no product has this id.
    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError>;
    /// `false` when no product has this id. A product still referenced by
    /// order items is a `Conflict`.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    /// Fails with `Conflict` when the email is already registered.
    fn create(&self, user: NewUser) -> Result<User, DomainError>;
}
