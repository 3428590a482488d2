use crate::domain::{
    card::Card,
    id::{BoardId, ColumnId},
    validation,
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ordered lane within a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    id: ColumnId,
    board_id: BoardId,
    name: String,
    position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Column {
    pub const NAME_MIN: usize = 2;

    pub fn new(board_id: BoardId, name: &str, position: i64) -> Result<Self> {
        let now = Utc::now();
        Self::restore(ColumnId::generate(), board_id, name, position, now, now)
    }

    /// Rebuilds a column from persisted fields, validating all of them
    pub fn restore(
        id: ColumnId,
        board_id: BoardId,
        name: &str,
        position: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let name = Self::normalize_name(name)?;
        let position = validation::check_position("Column position", position)?;
        validation::check_reference("boardId", !board_id.is_empty())?;

        Ok(Self {
            id,
            board_id,
            name,
            position,
            created_at,
            updated_at,
        })
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        let name = Self::normalize_name(name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    pub fn move_to(&mut self, position: i64) -> Result<()> {
        let position = validation::check_position("Column position", position)?;
        self.position = position;
        self.touch();
        Ok(())
    }

    /// Sets a rank computed by the reposition algorithm
    pub(crate) fn assign_rank(&mut self, rank: usize) {
        self.position = i64::try_from(rank).unwrap_or(i64::MAX);
        self.touch();
    }

    pub fn id(&self) -> &ColumnId {
        &self.id
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn normalize_name(name: &str) -> Result<String> {
        validation::normalize_text("Column name", name, Self::NAME_MIN, None)
    }
}

/// A column together with its cards, both ordered by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnWithCards {
    #[serde(flatten)]
    pub column: Column,
    pub cards: Vec<Card>,
}

impl ColumnWithCards {
    pub fn new(column: Column, mut cards: Vec<Card>) -> Self {
        cards.sort_by_key(|c| c.position());
        Self { column, cards }
    }

    pub fn id(&self) -> &ColumnId {
        self.column.id()
    }
}
