//! HTTP access to the mkanban API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Board, BoardId, Card, CardId, Column, ColumnWithCards};
use crate::dto::{
    BoardNameRequest, CreateCardRequest, CreateColumnRequest, MoveCardRequest, OkResponse,
};
use crate::error::KanbanError;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Invalid(#[from] KanbanError),

    #[error("No board selected")]
    NoBoardSelected,
}

/// Operations the client state layer needs from the server
#[async_trait]
pub trait KanbanApi: Send + Sync {
    async fn list_boards(&self) -> ClientResult<Vec<Board>>;

    async fn get_board(&self, id: &BoardId) -> ClientResult<Board>;

    async fn create_board(&self, name: &str) -> ClientResult<Board>;

    async fn list_columns(&self, board_id: &BoardId) -> ClientResult<Vec<ColumnWithCards>>;

    async fn create_column(&self, req: &CreateColumnRequest) -> ClientResult<Column>;

    async fn create_card(&self, req: &CreateCardRequest) -> ClientResult<Card>;

    async fn delete_card(&self, id: &CardId) -> ClientResult<()>;

    async fn move_card(&self, id: &CardId, req: &MoveCardRequest) -> ClientResult<Card>;
}

/// reqwest-backed [`KanbanApi`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

#[async_trait]
impl KanbanApi for ApiClient {
    async fn list_boards(&self) -> ClientResult<Vec<Board>> {
        self.send(self.http.get(self.url("/boards"))).await
    }

    async fn get_board(&self, id: &BoardId) -> ClientResult<Board> {
        self.send(self.http.get(self.url(&format!("/boards/{id}"))))
            .await
    }

    async fn create_board(&self, name: &str) -> ClientResult<Board> {
        let body = BoardNameRequest {
            name: name.to_string(),
        };
        self.send(self.http.post(self.url("/boards")).json(&body))
            .await
    }

    async fn list_columns(&self, board_id: &BoardId) -> ClientResult<Vec<ColumnWithCards>> {
        self.send(self.http.get(self.url(&format!("/columns/board/{board_id}"))))
            .await
    }

    async fn create_column(&self, req: &CreateColumnRequest) -> ClientResult<Column> {
        self.send(self.http.post(self.url("/columns")).json(req))
            .await
    }

    async fn create_card(&self, req: &CreateCardRequest) -> ClientResult<Card> {
        self.send(self.http.post(self.url("/cards")).json(req)).await
    }

    async fn delete_card(&self, id: &CardId) -> ClientResult<()> {
        let _: OkResponse = self
            .send(self.http.delete(self.url(&format!("/cards/{id}"))))
            .await?;
        Ok(())
    }

    async fn move_card(&self, id: &CardId, req: &MoveCardRequest) -> ClientResult<Card> {
        self.send(
            self.http
                .patch(self.url(&format!("/cards/{id}/move")))
                .json(req),
        )
        .await
    }
}

/// Error text for a failed response: the body's `message`, then `error`,
/// then the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error"] {
            if let Some(text) = value.get(field).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
