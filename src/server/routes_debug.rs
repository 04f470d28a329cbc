//! `GET /debug`: operational snapshot.

use axum::{extract::State, Json};

use super::AppContext;
use crate::artifacts::StatusSnapshot;

/// Report transcoder availability and the scratch directory contents.
pub async fn debug_info(State(ctx): State<AppContext>) -> Json<StatusSnapshot> {
    Json(ctx.service.artifacts().status().await)
}
