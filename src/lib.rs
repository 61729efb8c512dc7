pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::catalog_service::CatalogService;
use application::order_service::OrderService;
use application::user_service::UserService;
use domain::ports::{CatalogRepository, OrderRepository, UserRepository};
use errors::StartupError;
use handlers::auth::AdminToken;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::user_repo::DieselUserRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), StartupError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(StartupError::Migrations)?;
    if !applied.is_empty() {
        log::info!("Applied {} database migration(s)", applied.len());
    }
    Ok(())
}

/// The application services shared by every worker.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub users: UserService,
    /// Token required on `/admin` routes. `None` locks them.
    pub admin_token: Option<String>,
}

impl AppServices {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            orders: OrderService::new(orders),
            catalog: CatalogService::new(catalog),
            users: UserService::new(users),
            admin_token: None,
        }
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self::new(
            Arc::new(DieselOrderRepository::new(pool.clone())),
            Arc::new(DieselCatalogRepository::new(pool.clone())),
            Arc::new(DieselUserRepository::new(pool)),
        )
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    #[cfg(test)]
    pub(crate) fn in_memory(store: &infrastructure::memory::InMemoryStore) -> Self {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }
}

/// Register routes, extractor configs and the API docs.
pub fn configure_app(cfg: &mut web::ServiceConfig, services: &AppServices) {
    cfg.app_data(web::Data::new(services.orders.clone()))
        .app_data(web::Data::new(services.catalog.clone()))
        .app_data(web::Data::new(services.users.clone()))
        .app_data(web::Data::new(AdminToken(services.admin_token.clone())))
        .app_data(handlers::json_config())
        .app_data(handlers::path_config())
        .app_data(handlers::query_config())
        .service(
            web::scope("/orders")
                .route("", web::post().to(handlers::orders::create_order))
                .route("", web::get().to(handlers::orders::list_orders))
                .route("/{id}", web::get().to(handlers::orders::get_order)),
        )
        .service(
            web::scope("/products")
                .route("", web::get().to(handlers::products::list_products))
                .route("/{id}", web::get().to(handlers::products::get_product)),
        )
        .service(web::resource("/users").route(web::post().to(handlers::users::register_user)))
        .service(
            web::scope("/admin")
                .route("/products", web::post().to(handlers::admin::create_product))
                .route("/products/{id}", web::put().to(handlers::admin::update_product))
                .route("/products/{id}", web::delete().to(handlers::admin::delete_product))
                .route("/orders", web::get().to(handlers::admin::list_orders)),
        )
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    services: AppServices,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| configure_app(cfg, &services))
    })
    .bind((host.to_string(), port))?
    .run())
}
