pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::invoice_service::InvoiceService;
use domain::ports::{ActorDirectory, InvoiceNumberAllocator, InvoiceRepository};
use infrastructure::actor_directory::DieselActorDirectory;
use infrastructure::invoice_repo::DieselInvoiceRepository;
use infrastructure::number_sequence::PgSequenceAllocator;

pub use auth::TokenKeys;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// The service as shared with request handlers, independent of storage.
pub type InvoiceApi = InvoiceService<
    Arc<dyn InvoiceRepository>,
    Arc<dyn ActorDirectory>,
    Arc<dyn InvoiceNumberAllocator>,
>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Wire the PostgreSQL adapters into the invoice service.
pub fn postgres_api(pool: DbPool) -> InvoiceApi {
    let repo: Arc<dyn InvoiceRepository> = Arc::new(DieselInvoiceRepository::new(pool.clone()));
    let directory: Arc<dyn ActorDirectory> = Arc::new(DieselActorDirectory::new(pool.clone()));
    let allocator: Arc<dyn InvoiceNumberAllocator> = Arc::new(PgSequenceAllocator::new(pool));
    InvoiceService::new(repo, directory, allocator)
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    api: InvoiceApi,
    keys: TokenKeys,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let api = web::Data::new(api);
    let keys = web::Data::new(keys);

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(api.clone())
            .app_data(keys.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", handlers::ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
