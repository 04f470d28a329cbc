//! `GET /download/:filename`: stream a live artifact as an attachment.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use super::error::ApiError;
use super::AppContext;

/// Serve an artifact by name.
///
/// Unknown, expired, and malformed names all produce the same 404.
pub async fn download(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let resolved = ctx
        .service
        .artifacts()
        .resolve(&filename)
        .await
        .map_err(|e| {
            tracing::debug!(filename = %filename, "Download refused");
            ApiError::from(e)
        })?;

    let name = resolved.artifact.id.to_string();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
        .map_err(|_| ApiError::NotFound)?;

    tracing::info!(filename = %name, size = resolved.size, "Serving download");

    let body = Body::from_stream(ReaderStream::new(resolved.file));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(resolved.size)),
        ],
        body,
    )
        .into_response())
}
