use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::pagination::PageRequest;
use crate::domain::ports::CatalogRepository;
use crate::domain::product::{NewProduct, Product, ProductChanges, ProductPage, ProductSort};
use crate::schema::products;

use super::models::{NewProductRow, ProductChangesRow, ProductRow};

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Product::from))
    }

    fn list(&self, page: PageRequest, sort: ProductSort) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = products::table.count().get_result(conn)?;

            let query = products::table.select(ProductRow::as_select()).into_boxed();
            let query = match sort {
                ProductSort::Newest => query.order(products::created_at.desc()),
                ProductSort::PriceAsc => query.order(products::price.asc()),
                ProductSort::PriceDesc => query.order(products::price.desc()),
            };
            let rows = query
                .then_order_by(products::product_id)
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(ProductPage {
                items: rows.into_iter().map(Product::from).collect(),
                total,
            })
        })
    }

    fn find_low_stock(&self, threshold: i32) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::stock_quantity.lt(threshold))
            .select(ProductRow::as_select())
            .order((products::stock_quantity.asc(), products::product_id))
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(products::table)
            .values(&NewProductRow::from(product))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        Ok(Product::from(row))
    }

    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(products::table.find(id))
            .set(&ProductChangesRow::from(changes))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        Ok(row.map(Product::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        // order_items restricts the delete; that surfaces as a Conflict.
        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselCatalogRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{NewOrder, OrderItemRequest};
    use crate::domain::pagination::PageRequest;
    use crate::domain::ports::{CatalogRepository, OrderRepository};
    use crate::domain::product::{NewProduct, ProductChanges, ProductSort};
    use crate::infrastructure::order_repo::DieselOrderRepository;
    use crate::infrastructure::test_support::{seed_product, seed_user, setup_db};

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn find_by_id_maps_row() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let id = seed_product(&pool, "Teapot", "12.34", 7);

        let product = repo
            .find_by_id(id)
            .expect("find failed")
            .expect("product should exist");

        assert_eq!(product.name, "Teapot");
        assert_eq!(product.description, "Teapot description");
        assert_eq!(product.price.to_string(), "12.34");
        assert_eq!(product.stock_quantity, 7);
        assert!(repo.find_by_id(Uuid::new_v4()).expect("find").is_none());
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn list_sorts_and_paginates() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        seed_product(&pool, "Mid", "5.00", 1);
        seed_product(&pool, "Low", "1.00", 1);
        seed_product(&pool, "High", "9.00", 1);

        let asc = repo
            .list(PageRequest::default(), ProductSort::PriceAsc)
            .expect("list failed");
        let names: Vec<&str> = asc.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Low", "Mid", "High"]);
        assert_eq!(asc.total, 3);

        let desc = repo
            .list(PageRequest::new(Some(2), Some(2)), ProductSort::PriceDesc)
            .expect("list failed");
        assert_eq!(desc.items.len(), 1);
        assert_eq!(desc.items[0].name, "Low");
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn find_low_stock_orders_by_stock() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        seed_product(&pool, "Seven", "1.00", 7);
        seed_product(&pool, "Ten", "1.00", 10);
        seed_product(&pool, "Zero", "1.00", 0);

        let low = repo.find_low_stock(10).expect("query failed");
        let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();

        assert_eq!(names, ["Zero", "Seven"]);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn create_update_and_delete_products() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());

        let created = repo
            .create(NewProduct {
                name: "Grinder".to_string(),
                description: "Burr coffee grinder".to_string(),
                price: BigDecimal::from_str("45.90").expect("decimal"),
                stock_quantity: 8,
            })
            .expect("create failed");
        assert_eq!(created.price.to_string(), "45.90");

        let updated = repo
            .update(
                created.id,
                ProductChanges {
                    stock_quantity: Some(3),
                    ..ProductChanges::default()
                },
            )
            .expect("update failed")
            .expect("product should exist");
        assert_eq!(updated.stock_quantity, 3);
        assert_eq!(updated.name, "Grinder");
        assert!(updated.updated_at >= created.updated_at);

        let missing = ProductChanges {
            stock_quantity: Some(1),
            ..ProductChanges::default()
        };
        assert!(repo
            .update(Uuid::new_v4(), missing)
            .expect("update")
            .is_none());

        assert!(repo.delete(created.id).expect("delete"));
        assert!(!repo.delete(created.id).expect("delete"));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn ordered_product_cannot_be_deleted() {
        let (_container, pool) = setup_db().await;
        let catalog = DieselCatalogRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let owner = seed_user(&pool);
        let id = seed_product(&pool, "Teapot", "12.00", 3);
        orders
            .place(NewOrder {
                owner_id: owner,
                items: vec![OrderItemRequest {
                    product_id: id,
                    quantity: 1,
                }],
                idempotency_key: None,
            })
            .expect("place");

        assert!(matches!(catalog.delete(id), Err(DomainError::Conflict(_))));
        assert!(catalog.find_by_id(id).expect("find").is_some());
    }
}
