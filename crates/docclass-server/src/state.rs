//! Application state shared across all requests

use axum::http::HeaderValue;
use docclass_core::Result;
use docclass_model::{ModelHandle, Predictor};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

use crate::assets;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Prediction pipeline over the shared model handle
    pub predictor: Predictor,

    /// Prometheus metrics handle for rendering, when a recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,

    /// Parsed CORS origins; any origin is allowed when empty
    pub cors_origins: Vec<HeaderValue>,
}

impl AppState {
    /// Build state around an already loaded model
    pub fn new(
        config: ServerConfig,
        handle: ModelHandle,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let cors_origins = config.cors.origin_values()?;
        let handle = Arc::new(handle);
        let predictor = match &config.target_field {
            Some(target) => Predictor::with_target(handle, target)?,
            None => Predictor::new(handle),
        };

        Ok(Self {
            config: Arc::new(config),
            predictor,
            metrics_handle,
            cors_origins,
        })
    }

    /// Load the configured model and build state.
    ///
    /// Any model error is returned to the caller; the server must not start
    /// without a verified model.
    pub fn from_config(
        config: ServerConfig,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let handle = match &config.model_path {
            Some(path) => {
                info!("Loading model from {}", path.display());
                docclass_model::load_file(path)?
            }
            None => {
                info!("Loading bundled model '{}'", assets::BUNDLED_MODEL);
                assets::load_bundled_model()?
            }
        };

        let state = Self::new(config, handle, metrics_handle)?;
        info!(
            model = %state.predictor.handle().info().name,
            target = %state.predictor.target(),
            "Application state initialized"
        );
        Ok(state)
    }
}
