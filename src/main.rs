use std::io;
use std::sync::Arc;

use checkout_service::infrastructure::order_repo::DieselOrderRepository;
use checkout_service::infrastructure::stripe::StripeClient;
use checkout_service::{build_server, create_pool, run_migrations, AppConfig, AppState};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let processor = StripeClient::new(&config.stripe_api_base, config.stripe_timeout)
        .map_err(io::Error::other)?;
    log::info!(
        "Payments in {} via {}",
        config.payments.currency,
        config.stripe_api_base
    );

    let state = AppState::new(
        Arc::new(DieselOrderRepository::new(pool)),
        Arc::new(processor),
        config.payments,
    );

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
