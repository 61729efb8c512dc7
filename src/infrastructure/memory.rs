use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::{DomainError, Entity};
use crate::domain::order::{
    price_order, replay_order, NewOrder, OrderItemView, OrderPage, OrderStatus, OrderView,
    PlacedOrder,
};
use crate::domain::pagination::PageRequest;
use crate::domain::ports::{CatalogRepository, OrderRepository, UserRepository};
use crate::domain::product::{NewProduct, Product, ProductChanges, ProductPage, ProductSort};
use crate::domain::user::{NewUser, User};

#[derive(Debug, Clone)]
struct StoredItem {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    id: Uuid,
    owner_id: Uuid,
    total_amount: BigDecimal,
    status: OrderStatus,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    items: Vec<StoredItem>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    /// Oldest first.
    orders: Vec<StoredOrder>,
}

/// The slice of `items` that `page` selects.
fn page_of<T>(items: impl Iterator<Item = T>, page: PageRequest) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(page.limit).unwrap_or(0);
    items.skip(skip).take(take).collect()
}

impl State {
    fn view(&self, order: &StoredOrder) -> OrderView {
        OrderView {
            id: order.id,
            owner_id: order.owner_id,
            total_amount: order.total_amount.clone(),
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: order
                .items
                .iter()
                .map(|i| OrderItemView {
                    id: i.id,
                    product_id: i.product_id,
                    product_name: self
                        .products
                        .get(&i.product_id)
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                })
                .collect(),
        }
    }
}

/// Process-local store implementing both repository ports.
///
/// Every operation runs under a single mutex, so a placement is atomic with
/// respect to every other call on the same store (and its clones).
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: Uuid) {
        let now = Utc::now();
        self.guard().users.insert(
            id,
            User {
                id,
                email: format!("{id}@example.test"),
                name: "Test User".to_string(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn add_product(&self, product: Product) {
        self.guard().products.insert(product.id, product);
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        self.guard().products.get(&id).cloned()
    }

    pub fn set_price(&self, id: Uuid, price: BigDecimal) {
        if let Some(p) = self.guard().products.get_mut(&id) {
            p.price = price;
            p.updated_at = Utc::now();
        }
    }

    pub fn set_status(&self, order_id: Uuid, status: OrderStatus) {
        if let Some(o) = self.guard().orders.iter_mut().find(|o| o.id == order_id) {
            o.status = status;
            o.updated_at = Utc::now();
        }
    }

    pub fn order_count(&self) -> usize {
        self.guard().orders.len()
    }

    // Seeding and inspection helpers tolerate poisoning; repository calls
    // report it as an error instead.
    fn guard(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store poisoned".to_string()))
    }
}

impl OrderRepository for InMemoryStore {
    fn place(&self, order: NewOrder) -> Result<PlacedOrder, DomainError> {
        let mut state = self.lock()?;

        if let Some(key) = order.idempotency_key.as_deref() {
            let existing = state
                .orders
                .iter()
                .find(|o| o.owner_id == order.owner_id && o.idempotency_key.as_deref() == Some(key));
            if let Some(existing) = existing {
                return replay_order(state.view(existing), &order);
            }
        }

        if !state.users.contains_key(&order.owner_id) {
            return Err(DomainError::not_found(Entity::User, order.owner_id));
        }

        let referenced: HashMap<Uuid, Product> = order
            .items
            .iter()
            .filter_map(|i| state.products.get(&i.product_id))
            .map(|p| (p.id, p.clone()))
            .collect();
        let priced = price_order(&order.items, &referenced)?;

        let now = Utc::now();
        for (product_id, qty) in &priced.stock_decrements {
            if let Some(p) = state.products.get_mut(product_id) {
                p.stock_quantity -= qty;
                p.updated_at = now;
            }
        }

        let stored = StoredOrder {
            id: Uuid::new_v4(),
            owner_id: order.owner_id,
            total_amount: priced.total_amount,
            status: OrderStatus::Pending,
            idempotency_key: order.idempotency_key,
            created_at: now,
            updated_at: now,
            items: priced
                .lines
                .into_iter()
                .map(|l| StoredItem {
                    id: Uuid::new_v4(),
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        };
        let view = state.view(&stored);
        state.orders.push(stored);

        Ok(PlacedOrder {
            order: view,
            replayed: false,
        })
    }

    fn find_for_owner(&self, id: Uuid, owner_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == id && o.owner_id == owner_id)
            .map(|o| state.view(o)))
    }

    fn list_for_owner(&self, owner_id: Uuid, page: PageRequest) -> Result<OrderPage, DomainError> {
        let state = self.lock()?;
        let owned: Vec<&StoredOrder> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.owner_id == owner_id)
            .collect();

        Ok(OrderPage {
            total: owned.len() as i64,
            items: page_of(owned.into_iter().map(|o| state.view(o)), page),
        })
    }

    fn list_all(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, DomainError> {
        let state = self.lock()?;
        let matching: Vec<&StoredOrder> = state
            .orders
            .iter()
            .rev()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect();

        Ok(OrderPage {
            total: matching.len() as i64,
            items: page_of(matching.into_iter().map(|o| state.view(o)), page),
        })
    }
}

impl CatalogRepository for InMemoryStore {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    fn list(&self, page: PageRequest, sort: ProductSort) -> Result<ProductPage, DomainError> {
        let state = self.lock()?;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        match sort {
            ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProductSort::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
        }

        Ok(ProductPage {
            total: products.len() as i64,
            items: page_of(products.into_iter(), page),
        })
    }

    fn find_low_stock(&self, threshold: i32) -> Result<Vec<Product>, DomainError> {
        let state = self.lock()?;
        let mut low: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.stock_quantity < threshold)
            .cloned()
            .collect();
        low.sort_by_key(|p| p.stock_quantity);
        Ok(low)
    }

    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            stock_quantity: product.stock_quantity,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.products.insert(product.id, product.clone());
        Ok(product)
    }

    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut state = self.lock()?;
        Ok(state.products.get_mut(&id).map(|product| {
            changes.apply_to(product);
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let referenced = state
            .orders
            .iter()
            .flat_map(|o| &o.items)
            .any(|i| i.product_id == id);
        if referenced {
            return Err(DomainError::Conflict(format!(
                "product {id} is referenced by existing orders"
            )));
        }
        Ok(state.products.remove(&id).is_some())
    }
}

impl UserRepository for InMemoryStore {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict(format!(
                "a user with email {} already exists",
                user.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}
