//! One-shot low stock report. Schedule it externally, e.g. daily from cron.

use std::sync::Arc;

use storefront_service::application::catalog_service::CatalogService;
use storefront_service::config::AppConfig;
use storefront_service::errors::StartupError;
use storefront_service::infrastructure::catalog_repo::DieselCatalogRepository;
use storefront_service::{create_pool, run_migrations};

fn main() -> Result<(), StartupError> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, 1)?;
    run_migrations(&pool)?;

    log::info!(
        "Starting stock alert job (threshold {})",
        config.low_stock_threshold
    );
    let catalog = CatalogService::new(Arc::new(DieselCatalogRepository::new(pool)));
    let low = catalog.stock_alert(config.low_stock_threshold)?;
    log::info!("Stock alert job completed, {} product(s) flagged", low.len());

    Ok(())
}
