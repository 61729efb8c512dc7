use std::collections::HashMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::{DomainError, Entity};
use crate::domain::order::{
    price_order, replay_order, NewOrder, OrderItemView, OrderPage, OrderStatus, OrderView,
    PlacedOrder,
};
use crate::domain::pagination::PageRequest;
use crate::domain::ports::OrderRepository;
use crate::domain::product::Product;
use crate::schema::{order_items, orders, products, users};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow, ProductRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::SerializationFailure
                | DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation => {
                    DomainError::Conflict(info.message().to_string())
                }
                // Postgres reports 40P01 without a dedicated kind.
                DatabaseErrorKind::Unknown if info.message().contains("deadlock detected") => {
                    DomainError::Conflict(info.message().to_string())
                }
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
                    DomainError::Transient(info.message().to_string())
                }
                _ => DomainError::Internal(info.message().to_string()),
            },
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Transient(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Attach items (with current product names) to order rows, keeping row order.
fn load_views(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<OrderView>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(|o| o.order_id).collect();

    let items: Vec<(OrderItemRow, String)> = order_items::table
        .inner_join(products::table)
        .filter(order_items::order_id.eq_any(&ids))
        .select((OrderItemRow::as_select(), products::name))
        // Item ids are v7, so this is insertion order.
        .order(order_items::order_item_id)
        .load(conn)?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for (item, product_name) in items {
        by_order
            .entry(item.order_id)
            .or_default()
            .push(item.into_view(product_name));
    }

    rows.into_iter()
        .map(|o| {
            let items = by_order.remove(&o.order_id).unwrap_or_default();
            o.into_view(items)
        })
        .collect()
}

fn place_in_transaction(conn: &mut PgConnection, order: &NewOrder) -> Result<PlacedOrder, DomainError> {
    // 1. Replay an earlier order submitted with the same key.
    if let Some(key) = order.idempotency_key.as_deref() {
        let existing = orders::table
            .filter(orders::user_id.eq(order.owner_id))
            .filter(orders::idempotency_key.eq(key))
            .select(OrderRow::as_select())
            .first(conn)
            .optional()?;
        if let Some(existing) = existing {
            let mut views = load_views(conn, vec![existing])?;
            let view = views
                .pop()
                .ok_or_else(|| DomainError::Internal("replayed order vanished".to_string()))?;
            return replay_order(view, order);
        }
    }

    let owners: i64 = users::table
        .filter(users::user_id.eq(order.owner_id))
        .count()
        .get_result(conn)?;
    if owners == 0 {
        return Err(DomainError::not_found(Entity::User, order.owner_id));
    }

    // 2. Lock every referenced product row. Sorting the ids makes concurrent
    //    placements acquire locks in the same order.
    let mut ids: Vec<Uuid> = order.items.iter().map(|i| i.product_id).collect();
    ids.sort();
    ids.dedup();
    let locked: HashMap<Uuid, Product> = products::table
        .filter(products::product_id.eq_any(&ids))
        .select(ProductRow::as_select())
        .order(products::product_id)
        .for_update()
        .load(conn)?
        .into_iter()
        .map(|row| (row.product_id, Product::from(row)))
        .collect();

    // 3. Check stock and snapshot prices.
    let priced = price_order(&order.items, &locked)?;

    // 4. Take the stock.
    for (product_id, qty) in &priced.stock_decrements {
        diesel::update(products::table.find(*product_id))
            .set((
                products::stock_quantity.eq(products::stock_quantity - *qty),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
    }

    // 5. Insert the order and its items.
    let order_id = Uuid::new_v4();
    let order_row: OrderRow = diesel::insert_into(orders::table)
        .values(&NewOrderRow {
            order_id,
            user_id: order.owner_id,
            total_amount: priced.total_amount,
            status: OrderStatus::Pending.as_str().to_string(),
            idempotency_key: order.idempotency_key.clone(),
        })
        .returning(OrderRow::as_returning())
        .get_result(conn)?;

    let new_items: Vec<NewOrderItemRow> = priced
        .lines
        .into_iter()
        .map(|l| NewOrderItemRow {
            order_item_id: Uuid::now_v7(),
            order_id,
            product_id: l.product_id,
            quantity: l.quantity,
            price: l.unit_price,
        })
        .collect();
    let item_rows: Vec<OrderItemRow> = diesel::insert_into(order_items::table)
        .values(&new_items)
        .returning(OrderItemRow::as_returning())
        .get_results(conn)?;

    let items = item_rows
        .into_iter()
        .map(|row| {
            let name = locked
                .get(&row.product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            row.into_view(name)
        })
        .collect();

    Ok(PlacedOrder {
        order: order_row.into_view(items)?,
        replayed: false,
    })
}

impl OrderRepository for DieselOrderRepository {
    fn place(&self, order: NewOrder) -> Result<PlacedOrder, DomainError> {
        let mut conn = self.pool.get()?;

        conn.build_transaction()
            .read_committed()
            .run::<_, DomainError, _>(|conn| place_in_transaction(conn, &order))
    }

    fn find_for_owner(&self, id: Uuid, owner_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        // Ownership is part of the lookup, so another user's order reads as absent.
        let order = orders::table
            .filter(orders::order_id.eq(id))
            .filter(orders::user_id.eq(owner_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        Ok(load_views(&mut conn, vec![order])?.pop())
    }

    fn list_for_owner(&self, owner_id: Uuid, page: PageRequest) -> Result<OrderPage, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::user_id.eq(owner_id))
                .count()
                .get_result(conn)?;

            let rows = orders::table
                .filter(orders::user_id.eq(owner_id))
                .select(OrderRow::as_select())
                .order((orders::created_at.desc(), orders::order_id.desc()))
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(OrderPage {
                items: load_views(conn, rows)?,
                total,
            })
        })
    }

    fn list_all(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = match status {
                Some(status) => orders::table
                    .filter(orders::status.eq(status.as_str()))
                    .count()
                    .get_result(conn)?,
                None => orders::table.count().get_result(conn)?,
            };

            let mut query = orders::table.select(OrderRow::as_select()).into_boxed();
            if let Some(status) = status {
                query = query.filter(orders::status.eq(status.as_str()));
            }
            let rows = query
                .order((orders::created_at.desc(), orders::order_id.desc()))
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(OrderPage {
                items: load_views(conn, rows)?,
                total,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::errors::{DomainError, Entity};
    use crate::domain::order::{NewOrder, OrderItemRequest, OrderStatus};
    use crate::domain::pagination::PageRequest;
    use crate::domain::ports::OrderRepository;
    use crate::infrastructure::test_support::{seed_product, seed_user, setup_db, stock_of};
    use crate::schema::orders;

    fn new_order(owner_id: Uuid, lines: &[(Uuid, i32)]) -> NewOrder {
        NewOrder {
            owner_id,
            items: lines
                .iter()
                .map(|(product_id, quantity)| OrderItemRequest {
                    product_id: *product_id,
                    quantity: *quantity,
                })
                .collect(),
            idempotency_key: None,
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn place_and_find_roundtrip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Kettle", "10.00", 5);

        let placed = repo
            .place(new_order(owner, &[(p1, 3)]))
            .expect("place failed");

        assert!(!placed.replayed);
        assert_eq!(placed.order.total_amount, dec("30.00"));
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(stock_of(&pool, p1), 2);

        let found = repo
            .find_for_owner(placed.order.id, owner)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].product_name, "Kettle");
        assert_eq!(found.items[0].unit_price, dec("10.00"));
        assert_eq!(found.total_amount, dec("30.00"));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn insufficient_stock_rolls_back_everything() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let plenty = seed_product(&pool, "Plenty", "1.00", 10);
        let scarce = seed_product(&pool, "Scarce", "1.00", 1);

        let err = repo
            .place(new_order(owner, &[(plenty, 4), (scarce, 2)]))
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_id: scarce,
                requested: 2,
                available: 1,
            }
        );
        assert_eq!(stock_of(&pool, plenty), 10);
        assert_eq!(
            repo.list_for_owner(owner, PageRequest::default())
                .expect("list failed")
                .total,
            0
        );
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn unknown_product_and_owner_are_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Real", "1.00", 10);
        let ghost = Uuid::new_v4();

        let err = repo
            .place(new_order(owner, &[(p1, 1), (ghost, 1)]))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found(Entity::Product, ghost));
        assert_eq!(stock_of(&pool, p1), 10);

        let stranger = Uuid::new_v4();
        let err = repo.place(new_order(stranger, &[(p1, 1)])).unwrap_err();
        assert_eq!(err, DomainError::not_found(Entity::User, stranger));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn find_for_other_owner_returns_none() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Mug", "3.00", 5);
        let placed = repo.place(new_order(owner, &[(p1, 1)])).expect("place");

        assert!(repo
            .find_for_owner(placed.order.id, Uuid::new_v4())
            .expect("find")
            .is_none());
        assert!(repo
            .find_for_owner(Uuid::new_v4(), owner)
            .expect("find")
            .is_none());
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn idempotency_key_replays_without_writing() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Lamp", "7.50", 5);
        let mut order = new_order(owner, &[(p1, 2)]);
        order.idempotency_key = Some("checkout-1".to_string());

        let first = repo.place(order.clone()).expect("first");
        let second = repo.place(order).expect("second");

        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(second.order.items.len(), 1);
        assert_eq!(stock_of(&pool, p1), 3);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn concurrent_placements_never_oversell() {
        let (_container, pool) = setup_db().await;
        let repo = Arc::new(DieselOrderRepository::new(pool.clone()));
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Limited", "10.00", 5);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || repo.place(new_order(owner, &[(p1, 3)])))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        for failure in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                failure,
                DomainError::InsufficientStock { .. } | DomainError::Conflict(_)
            ));
        }
        assert_eq!(stock_of(&pool, p1), 2);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn list_paginates_newest_first() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Pen", "1.00", 100);

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(repo.place(new_order(owner, &[(p1, 1)])).expect("place").order.id);
        }

        let page1 = repo
            .list_for_owner(owner, PageRequest::new(Some(1), Some(3)))
            .expect("list page 1 failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        assert_eq!(page1.items[0].id, ids[4]);
        assert!(page1.items.iter().all(|o| o.items.len() == 1));

        let page2 = repo
            .list_for_owner(owner, PageRequest::new(Some(2), Some(3)))
            .expect("list page 2 failed");
        assert_eq!(page2.total, 5);
        assert_eq!(page2.items.len(), 2);
    }

    fn database_error(kind: DatabaseErrorKind, message: &str) -> DomainError {
        DieselError::DatabaseError(kind, Box::new(message.to_string())).into()
    }

    #[test]
    fn deadlocks_and_constraint_violations_are_conflicts() {
        assert!(matches!(
            database_error(DatabaseErrorKind::Unknown, "deadlock detected"),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            database_error(
                DatabaseErrorKind::ForeignKeyViolation,
                "violates foreign key constraint"
            ),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            database_error(DatabaseErrorKind::ClosedConnection, "server closed the connection"),
            DomainError::Transient(_)
        ));
        assert!(matches!(
            database_error(DatabaseErrorKind::Unknown, "division by zero"),
            DomainError::Internal(_)
        ));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn reused_key_with_different_items_conflicts() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let p1 = seed_product(&pool, "Lamp", "7.50", 5);
        let mut first = new_order(owner, &[(p1, 1)]);
        first.idempotency_key = Some("checkout-2".to_string());
        let mut second = new_order(owner, &[(p1, 2)]);
        second.idempotency_key = Some("checkout-2".to_string());

        repo.place(first).expect("first");
        let err = repo.place(second).unwrap_err();

        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(stock_of(&pool, p1), 4);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn list_all_filters_by_status_across_owners() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let (alice, bob) = (seed_user(&pool), seed_user(&pool));
        let p1 = seed_product(&pool, "Pen", "1.00", 100);

        let done = repo.place(new_order(alice, &[(p1, 1)])).expect("place").order.id;
        repo.place(new_order(bob, &[(p1, 2)])).expect("place");
        {
            let mut conn = pool.get().expect("conn");
            diesel::update(orders::table.find(done))
                .set(orders::status.eq(OrderStatus::Completed.as_str()))
                .execute(&mut conn)
                .expect("status update");
        }

        let all = repo.list_all(PageRequest::default(), None).expect("list");
        assert_eq!(all.total, 2);

        let completed = repo
            .list_all(PageRequest::default(), Some(OrderStatus::Completed))
            .expect("list");
        assert_eq!(completed.total, 1);
        assert_eq!(completed.items[0].id, done);
        assert_eq!(completed.items[0].status, OrderStatus::Completed);

        let beyond = repo
            .list_all(PageRequest::new(Some(i64::MAX), Some(100)), None)
            .expect("list");
        assert!(beyond.items.is_empty());
    }
}
