//! Layered settings: built-in defaults, then an optional `leadsift.toml` (or any
//! other format the `config` crate understands), then `LEADSIFT_*` environment
//! variables, e.g. `LEADSIFT_BIND=0.0.0.0:8080` or `LEADSIFT_DATABASE=contacts.db`.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::construct::PersistenceMode;
use crate::error::Result;
use crate::filter::FilterPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "leadsift";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server listens on.
    pub bind: String,
    /// `:memory:` or the path of an SQLite database file.
    pub database: String,
    /// A `tracing_subscriber::EnvFilter` directive.
    pub log: String,
    /// Adds store error details to 500 responses. Development only.
    pub expose_error_details: bool,
    pub filter_policy: FilterPolicy,
}

impl Settings {
    pub fn load(file: Option<&str>) -> Result<Self> {
        let settings = Config::builder()
            .set_default("bind", "127.0.0.1:8080")?
            .set_default("database", ":memory:")?
            .set_default("log", "info")?
            .set_default("expose_error_details", false)?
            .set_default("filter_policy", "lenient")?
            .add_source(File::with_name(file.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
            .add_source(Environment::with_prefix("LEADSIFT"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        PersistenceMode::from_location(&self.database)
    }
}
