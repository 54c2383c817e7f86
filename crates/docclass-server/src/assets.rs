//! Assets compiled into the binary: the bundled model and the query page

use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use docclass_core::{Error, Result};
use docclass_model::ModelHandle;
use rust_embed::Embed;

/// File name of the bundled model inside `assets/models`
pub const BUNDLED_MODEL: &str = "doc_class.yaml";

#[derive(Embed)]
#[folder = "assets/models"]
struct ModelAssets;

#[derive(Embed)]
#[folder = "assets/static"]
struct StaticAssets;

/// Load the model compiled into the binary
pub fn load_bundled_model() -> Result<ModelHandle> {
    let artifact = <ModelAssets as Embed>::get(BUNDLED_MODEL).ok_or_else(|| {
        Error::model_load(
            format!("bundled model '{}'", BUNDLED_MODEL),
            "not present in the binary",
        )
    })?;
    docclass_model::load_bytes(&artifact.data)
}

/// Serve embedded static files
pub async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if let Some(content) = <StaticAssets as Embed>::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime.as_ref())],
            content.data.into_owned(),
        )
            .into_response();
    }

    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_model_loads() {
        let handle = load_bundled_model().unwrap();
        assert_eq!(handle.info().name, "doc_class");
        assert_eq!(handle.input_fields().len(), 1);
        assert_eq!(
            handle.primary_target().categories,
            vec!["invoice", "receipt", "contract", "resume"]
        );
    }

    #[test]
    fn test_index_page_is_embedded() {
        assert!(<StaticAssets as Embed>::get("index.html").is_some());
    }
}
