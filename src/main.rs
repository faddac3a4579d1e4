mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod server;
mod services;
mod utils;

use actix_web::{web, HttpServer};
use config::Config;
use database::{MongoDB, MongoUserStore};
use dotenv::dotenv;
use middleware::{AllowedOrigins, MemorySessionStore, SessionSettings};
use server::AppState;
use services::UserRepository;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Nothing else starts until the configuration is complete
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting Expense Tracker API...");

    let db = match MongoDB::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let indexes_ready = match db.ping().await {
        Ok(()) => {
            log::info!("✅ MongoDB connected successfully");
            match db.ensure_indexes().await {
                Ok(()) => true,
                Err(e) => {
                    log::error!("❌ Failed to create indexes, store monitor will retry: {}", e);
                    false
                }
            }
        }
        Err(e) => {
            log::error!("❌ MongoDB unreachable, user routes answer 503 until it recovers: {}", e);
            false
        }
    };

    jobs::store_monitor::start_store_monitor(db.clone(), indexes_ready);

    let session_store = MemorySessionStore::new();
    jobs::session_sweeper::start_session_sweeper(session_store.clone());

    let origins = AllowedOrigins::new(&config.client_url);
    log::info!(
        "🌍 Allowed origins: {}",
        origins.iter().collect::<Vec<_>>().join(", ")
    );

    let state = AppState {
        users: web::Data::new(UserRepository::new(
            Arc::new(MongoUserStore::new(&db)),
            config.bcrypt_cost,
        )),
        origins,
        sessions: SessionSettings::new(
            session_store,
            &config.session_secret,
            config.session_ttl_secs,
            config.session_cookie_secure,
        ),
    };

    log::info!("🌐 Server starting on {}:{}", config.host, config.port);
    log::info!(
        "📚 Swagger UI available at: http://{}:{}/swagger-ui/",
        config.host,
        config.port
    );

    HttpServer::new(move || server::build_app(state.clone()))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
