use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::remote::storage::PUBLIC_PREFIX;
use crate::remote::FsObjectStorage;

/// Public read access to stored objects, at the same URLs the client hands out.
pub fn router(storage: Arc<FsObjectStorage>) -> Router {
    Router::new()
        .route(&format!("{PUBLIC_PREFIX}/{{bucket}}/{{*path}}"), get(serve))
        .with_state(storage)
}

pub async fn serve(
    State(storage): State<Arc<FsObjectStorage>>,
    Path((bucket, path)): Path<(String, String)>,
) -> Response {
    match storage.read(&bucket, &path).await {
        Ok(Some(data)) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::debug!("Refusing object {}/{}: {}", bucket, path, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
