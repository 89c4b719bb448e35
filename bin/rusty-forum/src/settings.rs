//! Runtime settings, layered: built-in defaults, then `rusty-forum.toml` (if
//! present), then `RF_*` environment variables (a `.env` file counts).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// e.g. `sqlite:rusty_forum.db` or `sqlite::memory:`
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub store: StoreKind,
    /// JSON fixture preloaded into the memory store (`RF_SEED_FILE`).
    #[serde(default)]
    pub seed_file: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::builder()?
            .add_source(File::with_name("rusty-forum").required(false))
            .add_source(Environment::with_prefix("RF").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("database_url", "sqlite:rusty_forum.db")?
            .set_default("bind_addr", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("store", "sqlite")
    }
}
