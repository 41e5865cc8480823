use crate::error::{Result, VisualizerError};
use std::path::PathBuf;

/// Default number of datasets kept by the store
pub const DEFAULT_RETENTION_LIMIT: usize = 5;

/// Default upper bound for an uploaded CSV body (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Runtime configuration shared by the server and the clients
///
/// Every component receives its configuration explicitly at construction.
/// There is no process-wide credential or endpoint.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL the clients talk to, e.g. `http://127.0.0.1:8000/api`
    pub api_base_url: String,

    /// Shared token checked by the server and sent by the clients
    pub auth_token: String,

    /// Principal recorded as `uploaded_by` for requests carrying the token
    pub auth_principal: String,

    /// Maximum number of datasets the store retains
    pub retention_limit: usize,

    /// Socket address the server listens on
    pub bind_addr: String,

    /// Directory holding the dataset index and uploaded blobs
    pub data_dir: PathBuf,

    /// Largest accepted upload body
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Build a configuration with defaults for everything but the token
    pub fn with_token(auth_token: impl Into<String>) -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            auth_token: auth_token.into(),
            auth_principal: "admin".to_string(),
            retention_limit: DEFAULT_RETENTION_LIMIT,
            bind_addr: "127.0.0.1:8000".to_string(),
            data_dir: PathBuf::from("media"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Load the configuration from `EQUIPMENT_*` environment variables
    ///
    /// # Errors
    /// * `Config` if `EQUIPMENT_AUTH_TOKEN` is unset or a numeric value is invalid
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup
    ///
    /// # Arguments
    /// * `lookup` - Returns the value for a variable name, if set
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup("EQUIPMENT_AUTH_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| VisualizerError::Config("EQUIPMENT_AUTH_TOKEN must be set".into()))?;

        let mut config = Self::with_token(token.trim());

        if let Some(url) = lookup("EQUIPMENT_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(principal) = lookup("EQUIPMENT_AUTH_PRINCIPAL") {
            config.auth_principal = principal;
        }
        if let Some(addr) = lookup("EQUIPMENT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(dir) = lookup("EQUIPMENT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(limit) = lookup("EQUIPMENT_RETENTION_LIMIT") {
            config.retention_limit = parse_number("EQUIPMENT_RETENTION_LIMIT", &limit)?;
            if config.retention_limit == 0 {
                return Err(VisualizerError::Config(
                    "EQUIPMENT_RETENTION_LIMIT must be at least 1".into(),
                ));
            }
        }
        if let Some(bytes) = lookup("EQUIPMENT_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_number("EQUIPMENT_MAX_UPLOAD_BYTES", &bytes)?;
        }

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| VisualizerError::Config(format!("{} is not a valid number: {:?}", key, value)))
}
