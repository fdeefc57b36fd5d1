// Configuration module entry point
// Loads layered configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig};

/// Configuration file looked up when none is given on the command line
pub const DEFAULT_CONFIG_NAME: &str = "config";

/// Directory served under `/app/` unless configured otherwise
pub const DEFAULT_FILEPATH_ROOT: &str = ".";

/// Port bound unless configured otherwise
pub const DEFAULT_PORT: u16 = 8080;

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources are layered: built-in defaults, then the optional file, then
    /// `CHIRPY_`-prefixed environment variables (`CHIRPY_SERVER__PORT=9000`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("files.root", DEFAULT_FILEPATH_ROOT)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("CHIRPY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ServerError::InvalidAddress { addr, source })
    }
}
