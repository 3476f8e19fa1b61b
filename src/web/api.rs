use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::error::AppError;
use crate::models::{Devotional, DevotionalSource, ListQuery, NewDevotional, TodayDevotional};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub visible: Option<bool>,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DevotionalPage {
    pub items: Vec<Devotional>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

// Sync trigger

pub async fn trigger_sync(State(state): State<AppState>) -> Response {
    // One sync at a time; a second trigger waits for the first to finish.
    let _guard = state.sync_lock.lock().await;

    let Some(feed_url) = state.feed_url.as_deref() else {
        return sync_failed(AppError::Config("feed_url is not configured".to_string()));
    };

    match state.sync.run(state.repository.as_ref(), feed_url).await {
        Ok(summary) => {
            info!(
                "Sync finished: {} of {} synced, {} errors",
                summary.synced,
                summary.total,
                summary.errors.len()
            );
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => sync_failed(e),
    }
}

fn sync_failed(e: AppError) -> Response {
    error!("Devotional sync failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Sync failed", "error": e.to_string() })),
    )
        .into_response()
}

// Read interface

pub async fn get_today(
    State(state): State<AppState>,
) -> Result<Json<TodayDevotional>, StatusCode> {
    let today = Utc::now().with_timezone(&state.offset).date_naive();
    match state.repository.today_or_latest(today).await {
        Ok(lookup) => Ok(Json(lookup)),
        Err(e) => {
            error!("Failed to look up today's devotional: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn list_devotionals(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DevotionalPage>, StatusCode> {
    let source = match params.source.as_deref() {
        None => None,
        Some(value) => Some(DevotionalSource::parse(value).ok_or(StatusCode::BAD_REQUEST)?),
    };
    let query = ListQuery::new(
        params.visible,
        source,
        params.page.unwrap_or(1),
        params.limit.unwrap_or(20),
    );

    match state.repository.list_devotionals(query).await {
        Ok((items, total)) => Ok(Json(DevotionalPage {
            items,
            page: query.page,
            limit: query.limit,
            total,
        })),
        Err(e) => {
            error!("Failed to list devotionals: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_devotional(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Devotional>, StatusCode> {
    match state.repository.get_devotional(id).await {
        Ok(Some(devotional)) => Ok(Json(devotional)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get devotional {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Admin operations

pub async fn create_devotional(
    State(state): State<AppState>,
    Json(payload): Json<NewDevotional>,
) -> Result<(StatusCode, Json<Devotional>), StatusCode> {
    if payload.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let id = state
        .repository
        .insert_devotional(payload, DevotionalSource::Manual)
        .await
        .map_err(|e| {
            error!("Failed to create devotional: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match state.repository.get_devotional(id).await {
        Ok(Some(devotional)) => Ok((StatusCode::CREATED, Json(devotional))),
        Ok(None) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        Err(e) => {
            error!("Failed to reload devotional {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn update_devotional(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<NewDevotional>,
) -> Result<Json<Devotional>, StatusCode> {
    if payload.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.repository.update_content(id, payload).await {
        Ok(true) => get_devotional(Path(id), State(state)).await,
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to update devotional {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn set_visibility(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<Devotional>, StatusCode> {
    match state.repository.set_visible(id, payload.visible).await {
        Ok(true) => get_devotional(Path(id), State(state)).await,
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to set visibility of devotional {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn delete_devotional(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match state.repository.delete_devotional(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to delete devotional {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn delete_all_devotionals(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.repository.delete_all_devotionals().await {
        Ok(deleted) => {
            info!("Deleted all {} devotionals", deleted);
            Ok(Json(json!({ "deleted": deleted })))
        }
        Err(e) => {
            error!("Failed to delete devotionals: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn health_check() -> &'static str {
    "ok"
}
