use crate::domain::{id::BoardId, validation};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kanban board, the top-level container for columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    id: BoardId,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Board {
    pub const NAME_MIN: usize = 2;
    pub const NAME_MAX: usize = 80;

    /// Creates a new board with a generated id
    pub fn new(name: &str) -> Result<Self> {
        Self::create(BoardId::generate(), name, Utc::now())
    }

    /// Creates a board with an explicit id and timestamp
    pub fn create(id: BoardId, name: &str, now: DateTime<Utc>) -> Result<Self> {
        let name = Self::normalize_name(name)?;
        Ok(Self {
            id,
            name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a board from persisted fields, re-checking the name
    pub fn restore(
        id: BoardId,
        name: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let name = Self::normalize_name(&name)?;
        Ok(Self {
            id,
            name,
            created_at,
            updated_at,
        })
    }

    /// Renames the board. On error the board is left untouched.
    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.rename_at(name, Utc::now())
    }

    pub fn rename_at(&mut self, name: &str, now: DateTime<Utc>) -> Result<()> {
        let name = Self::normalize_name(name)?;
        self.name = name;
        self.updated_at = now;
        Ok(())
    }

    pub fn id(&self) -> &BoardId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn normalize_name(name: &str) -> Result<String> {
        validation::normalize_text("Board name", name, Self::NAME_MIN, Some(Self::NAME_MAX))
    }
}
