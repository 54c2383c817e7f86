//! docclass Server
//!
//! HTTP front end for the docclass model pipeline. The model is loaded and
//! verified before the listener is bound; every request shares the same
//! read-only handle through [`state::AppState`].

pub mod assets;
pub mod cli;
pub mod config;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::{create_router, PredictResponse};
pub use state::AppState;
