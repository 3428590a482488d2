//! Column endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use crate::domain::{BoardId, Column, ColumnId, ColumnWithCards};
use crate::dto::{CreateColumnRequest, MoveColumnRequest, OkResponse, RenameColumnRequest};
use crate::server::error::ApiError;
use crate::server::extractors::ApiJson;
use crate::server::AppState;
use crate::service::NewColumn;

/// POST /columns
async fn create_column(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateColumnRequest>,
) -> Result<(StatusCode, Json<Column>), ApiError> {
    let column = state
        .services
        .columns
        .create(NewColumn {
            board_id: req.board_id,
            name: req.name,
            position: req.position,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(column)))
}

/// GET /columns/board/{board_id} - columns with nested cards, by position
async fn list_board_columns(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Vec<ColumnWithCards>>, ApiError> {
    let columns = state.services.columns.list_by_board(&board_id).await?;
    Ok(Json(columns))
}

/// GET /columns/{id}
async fn get_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ColumnId>,
) -> Result<Json<Column>, ApiError> {
    let column = state.services.columns.get(&id).await?;
    Ok(Json(column))
}

/// PATCH /columns/{id}/rename
async fn rename_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ColumnId>,
    ApiJson(req): ApiJson<RenameColumnRequest>,
) -> Result<Json<Column>, ApiError> {
    let column = state.services.columns.rename(&id, &req.name).await?;
    Ok(Json(column))
}

/// PATCH /columns/{id}/move
async fn move_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ColumnId>,
    ApiJson(req): ApiJson<MoveColumnRequest>,
) -> Result<Json<Column>, ApiError> {
    let column = state.services.columns.move_to(&id, req.to_position).await?;
    Ok(Json(column))
}

/// DELETE /columns/{id}
async fn delete_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ColumnId>,
) -> Result<Json<OkResponse>, ApiError> {
    state.services.columns.delete(&id).await?;
    Ok(Json(OkResponse::ok()))
}

/// Column routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/columns", post(create_column))
        .route("/columns/board/{board_id}", get(list_board_columns))
        .route("/columns/{id}", get(get_column).delete(delete_column))
        .route("/columns/{id}/rename", patch(rename_column))
        .route("/columns/{id}/move", patch(move_column))
}
