use storefront_service::config::AppConfig;
use storefront_service::errors::StartupError;
use storefront_service::{build_server, create_pool, run_migrations, AppServices};

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, config.pool_max_size)?;
    run_migrations(&pool)?;

    if config.admin_token.is_none() {
        log::warn!("ADMIN_TOKEN is not set, /admin routes will refuse every request");
    }
    let services = AppServices::from_pool(pool).with_admin_token(config.admin_token);

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(services, &config.host, config.port)?.await?;
    Ok(())
}
