use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use folio_api_types::{EntryListResponse, EntryResponse};
use tracing::debug;

use crate::application::{error::AppError, render::highlight_stylesheet};

use super::{HttpState, views};

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(super) async fn syntax_stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        highlight_stylesheet(),
    )
}

pub(super) async fn list_entries(
    State(state): State<HttpState>,
    Path(collection): Path<String>,
) -> Result<Json<EntryListResponse>, AppError> {
    let entries = state.content.list(&collection).await?;
    debug!(
        target = "infra::http::handlers",
        collection = %collection,
        entries = entries.len(),
        "Listed collection"
    );

    Ok(Json(EntryListResponse {
        entries: entries.iter().map(views::entry_summary).collect(),
    }))
}

pub(super) async fn entry_detail(
    State(state): State<HttpState>,
    Path((collection, slug)): Path<(String, String)>,
) -> Result<Json<EntryResponse>, AppError> {
    let entry = state.content.get(&collection, &slug).await?;
    Ok(Json(views::entry_response(&entry, &state.site, &collection)))
}

pub(super) async fn fallback() -> AppError {
    AppError::NotFound
}
