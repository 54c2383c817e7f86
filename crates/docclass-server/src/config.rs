//! Server configuration

use axum::http::HeaderValue;
use docclass_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Model artifact on disk; the bundled model is used when unset
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Target field to predict; the model's first target when unset
    #[serde(default)]
    pub target_field: Option<String>,

    /// Cross-origin settings
    #[serde(default)]
    pub cors: CorsConfig,

    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(model) = &cli.model {
            config.model_path = Some(PathBuf::from(model));
        }

        if let Some(target) = &cli.target {
            config.target_field = Some(target.clone());
        }

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.cors.origin_values()?;
        Ok(())
    }

    /// `listen:port` socket address string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            model_path: None,
            target_field: None,
            cors: CorsConfig::default(),
            metrics_enabled: true,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; any origin is allowed when empty
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Allowed origins as header values
    pub fn origin_values(&self) -> Result<Vec<HeaderValue>> {
        self.allowed_origins
            .iter()
            .map(|origin| {
                if origin.trim().is_empty() {
                    return Err(Error::config("CORS origin is empty"));
                }
                HeaderValue::from_str(origin)
                    .map_err(|e| Error::config(format!("invalid CORS origin {:?}: {}", origin, e)))
            })
            .collect()
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}
