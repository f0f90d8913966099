use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued tokens. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

/// Restaurant image storage.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the image store. Default: "./data/images".
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Maximum accepted image size in bytes. Default: 5 MB.
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/images")
}

fn default_max_image_size() -> u64 {
    5 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_image_size: default_max_image_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., BISTRO__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("BISTRO")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
