//! # Rusty-Forum Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod settings;

use std::sync::Arc;

#[cfg(feature = "store-memory")]
use anyhow::Context;
use actix_web::{web, App, HttpServer};
use rf_api::handlers::AppState;
use rf_api::middleware::{cors_policy, security_headers, standard_middleware};
use rf_core::QueryEngine;

use crate::settings::{Settings, StoreKind};

// Storage plugins are compiled in per feature.
#[cfg(feature = "db-sqlite")]
use rf_db_sqlite::SqliteContentStore;

#[cfg(feature = "store-memory")]
use rf_store_memory::MemoryStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load()?;
    log::debug!("settings: {settings:?}");

    // 1. Initialize the storage plugin and inject it into the engine
    let engine = build_engine(&settings).await?;

    // 2. Share one engine across all workers
    let state = web::Data::new(AppState::new(engine));

    log::info!("🚀 Rusty-Forum starting on http://{}:{}", settings.bind_addr, settings.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(security_headers())
            .wrap(cors_policy())
            .configure(rf_api::configure_routes)
    })
    .bind((settings.bind_addr.as_str(), settings.port))?
    .run()
    .await?;

    Ok(())
}

async fn build_engine(settings: &Settings) -> anyhow::Result<QueryEngine> {
    match settings.store {
        #[cfg(feature = "db-sqlite")]
        StoreKind::Sqlite => {
            let store = SqliteContentStore::new(&settings.database_url).await?;
            Ok(QueryEngine::from_store(Arc::new(store)))
        }
        #[cfg(feature = "store-memory")]
        StoreKind::Memory => {
            let store = match &settings.seed_file {
                Some(path) => {
                    let json = std::fs::read_to_string(path)
                        .with_context(|| format!("reading seed file {path}"))?;
                    MemoryStore::from_json(&json)?
                }
                None => {
                    log::warn!("in-memory store starts empty; set RF_SEED_FILE to preload a fixture");
                    MemoryStore::new()
                }
            };
            Ok(QueryEngine::from_store(Arc::new(store)))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("store {other:?} is not compiled into this binary"),
    }
}
