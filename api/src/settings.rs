use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{auth, sqlite, storage};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub sqlite: sqlite::Settings,
    pub storage: storage::Settings,
    pub auth: auth::Settings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Settings {
    /// Layers, lowest priority first: the bundled `config/default.toml`,
    /// an optional `config/local.toml` in the working directory, `GYM__*`
    /// environment variables, then `DATABASE_URL` and `API_PORT`.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                File::with_name(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default"))
                    .required(false),
            )
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("GYM").separator("__"))
            .set_override_option("sqlite.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.port", std::env::var("API_PORT").ok())?
            .build()?
            .try_deserialize()
    }
}
