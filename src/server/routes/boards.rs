//! Board endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::domain::{Board, BoardId};
use crate::dto::{BoardNameRequest, OkResponse};
use crate::server::error::ApiError;
use crate::server::extractors::ApiJson;
use crate::server::AppState;

/// GET /boards - newest first
async fn list_boards(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Board>>, ApiError> {
    let boards = state.services.boards.list().await?;
    Ok(Json(boards))
}

/// POST /boards
async fn create_board(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<BoardNameRequest>,
) -> Result<(StatusCode, Json<Board>), ApiError> {
    let board = state.services.boards.create(&req.name).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// GET /boards/{id}
async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BoardId>,
) -> Result<Json<Board>, ApiError> {
    let board = state.services.boards.get(&id).await?;
    Ok(Json(board))
}

/// PATCH /boards/{id}
async fn rename_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BoardId>,
    ApiJson(req): ApiJson<BoardNameRequest>,
) -> Result<Json<Board>, ApiError> {
    let board = state.services.boards.rename(&id, &req.name).await?;
    Ok(Json(board))
}

/// DELETE /boards/{id}
async fn delete_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BoardId>,
) -> Result<Json<OkResponse>, ApiError> {
    state.services.boards.delete(&id).await?;
    Ok(Json(OkResponse::ok()))
}

/// Board routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route(
            "/boards/{id}",
            get(get_board).patch(rename_board).delete(delete_board),
        )
}
