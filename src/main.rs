use std::io;

use dotenvy::dotenv;
use invoice_service::config::Settings;
use invoice_service::{build_server, create_pool, postgres_api, run_migrations, TokenKeys};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings =
        Settings::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let pool = create_pool(&settings.database_url, settings.pool_size).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    log::info!(
        "Starting server at http://{}:{}",
        settings.host,
        settings.port
    );

    build_server(
        postgres_api(pool),
        TokenKeys::from_secret(settings.jwt_secret.as_bytes()),
        &settings.host,
        settings.port,
    )?
    .await
}
