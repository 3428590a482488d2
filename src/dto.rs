//! JSON request bodies shared by the HTTP server and the API client.
//!
//! Required text fields default to empty so that a missing field reaches
//! entity validation and is reported like any other invalid value.

use crate::domain::{BoardId, CardChanges, ColumnId};
use serde::{Deserialize, Deserializer, Serialize};

/// `POST /boards` and `PATCH /boards/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardNameRequest {
    #[serde(default)]
    pub name: String,
}

/// `POST /columns`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnRequest {
    #[serde(default)]
    pub board_id: BoardId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

/// `PATCH /columns/{id}/rename`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameColumnRequest {
    #[serde(default)]
    pub name: String,
}

/// `PATCH /columns/{id}/move`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveColumnRequest {
    #[serde(alias = "position")]
    pub to_position: i64,
}

/// `POST /cards`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    #[serde(default)]
    pub board_id: BoardId,
    #[serde(default)]
    pub column_id: ColumnId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

/// `PATCH /cards/{id}`.
///
/// An absent `description` keeps the current one, an explicit `null`
/// clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
}

impl From<UpdateCardRequest> for CardChanges {
    fn from(req: UpdateCardRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
        }
    }
}

/// `PATCH /cards/{id}/move`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    #[serde(default)]
    pub to_column_id: ColumnId,
    #[serde(alias = "position")]
    pub to_position: i64,
}

/// Body returned by deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

/// Maps a present field to `Some`, keeping `null` distinguishable from absent
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
