use crate::domain::{
    id::{BoardId, CardId, ColumnId},
    validation,
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields needed to create a card
#[derive(Debug, Clone)]
pub struct NewCard {
    pub board_id: BoardId,
    pub column_id: ColumnId,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
}

/// Partial update of a card's details.
///
/// `description: Some(None)` clears the description, `None` keeps it.
#[derive(Debug, Clone, Default)]
pub struct CardChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

/// A unit of work belonging to exactly one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    id: CardId,
    board_id: BoardId,
    column_id: ColumnId,
    title: String,
    description: Option<String>,
    position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Card {
    pub const TITLE_MIN: usize = 2;

    pub fn new(input: NewCard) -> Result<Self> {
        let now = Utc::now();
        Self::restore(CardId::generate(), input, now, now)
    }

    /// Rebuilds a card from persisted fields, validating all of them
    pub fn restore(
        id: CardId,
        fields: NewCard,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let title = Self::normalize_title(&fields.title)?;
        let position = validation::check_position("Card position", fields.position)?;
        validation::check_reference("boardId", !fields.board_id.is_empty())?;
        validation::check_reference("columnId", !fields.column_id.is_empty())?;

        Ok(Self {
            id,
            board_id: fields.board_id,
            column_id: fields.column_id,
            title,
            description: fields.description,
            position,
            created_at,
            updated_at,
        })
    }

    /// Applies title/description changes. Nothing is applied if any check fails.
    pub fn update_details(&mut self, changes: CardChanges) -> Result<()> {
        let title = changes
            .title
            .as_deref()
            .map(Self::normalize_title)
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        self.touch();
        Ok(())
    }

    /// Places the card in `column_id` at `position`
    pub fn move_to(&mut self, column_id: ColumnId, position: i64) -> Result<()> {
        validation::check_reference("toColumnId", !column_id.is_empty())?;
        let position = validation::check_position("toPosition", position)?;

        self.column_id = column_id;
        self.position = position;
        self.touch();
        Ok(())
    }

    /// Copies title, description and `updated_at` from a newer edit,
    /// leaving placement alone
    pub(crate) fn merge_details(&mut self, edited: &Card) {
        self.title = edited.title.clone();
        self.description = edited.description.clone();
        self.updated_at = edited.updated_at;
    }

    /// Sets a rank computed by the reposition algorithm
    pub(crate) fn assign_rank(&mut self, rank: usize) {
        self.position = i64::try_from(rank).unwrap_or(i64::MAX);
        self.touch();
    }

    pub fn id(&self) -> &CardId {
        &self.id
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn column_id(&self) -> &ColumnId {
        &self.column_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
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

    fn normalize_title(title: &str) -> Result<String> {
        validation::normalize_text("Card title", title, Self::TITLE_MIN, None)
    }
}
