//! Card endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use crate::domain::{Card, CardId};
use crate::dto::{CreateCardRequest, MoveCardRequest, OkResponse, UpdateCardRequest};
use crate::server::error::ApiError;
use crate::server::extractors::ApiJson;
use crate::server::AppState;
use crate::service::{CreateCard, MoveCard};

/// POST /cards
async fn create_card(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
    let card = state
        .services
        .cards
        .create(CreateCard {
            board_id: req.board_id,
            column_id: req.column_id,
            title: req.title,
            description: req.description,
            position: req.position,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// GET /cards/{id}
async fn get_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
) -> Result<Json<Card>, ApiError> {
    let card = state.services.cards.get(&id).await?;
    Ok(Json(card))
}

/// PATCH /cards/{id} - title and/or description
async fn update_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
    ApiJson(req): ApiJson<UpdateCardRequest>,
) -> Result<Json<Card>, ApiError> {
    let card = state.services.cards.update(&id, req.into()).await?;
    Ok(Json(card))
}

/// PATCH /cards/{id}/move
async fn move_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
    ApiJson(req): ApiJson<MoveCardRequest>,
) -> Result<Json<Card>, ApiError> {
    let card = state
        .services
        .cards
        .move_to(
            &id,
            MoveCard {
                to_column_id: req.to_column_id,
                to_position: req.to_position,
            },
        )
        .await?;
    Ok(Json(card))
}

/// DELETE /cards/{id}
async fn delete_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
) -> Result<Json<OkResponse>, ApiError> {
    state.services.cards.delete(&id).await?;
    Ok(Json(OkResponse::ok()))
}

/// Card routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cards", post(create_card))
        .route(
            "/cards/{id}",
            get(get_card).patch(update_card).delete(delete_card),
        )
        .route("/cards/{id}/move", patch(move_card))
}
