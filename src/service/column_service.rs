use crate::{
    domain::{reposition, BoardId, Column, ColumnId, ColumnWithCards},
    error::{KanbanError, Result},
    service::locks::KeyedLocks,
    storage::Storage,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for a new column. Without a position the column goes to the end
/// of its board.
#[derive(Debug, Clone)]
pub struct NewColumn {
    pub board_id: BoardId,
    pub name: String,
    pub position: Option<i64>,
}

/// Column use cases
#[derive(Clone)]
pub struct ColumnService {
    storage: Arc<dyn Storage>,
    locks: KeyedLocks,
}

impl ColumnService {
    pub fn new(storage: Arc<dyn Storage>, locks: KeyedLocks) -> Self {
        Self { storage, locks }
    }

    pub async fn create(&self, input: NewColumn) -> Result<Column> {
        let position = match input.position {
            Some(position) => position,
            None => self.storage.list_columns(&input.board_id).await?.len() as i64,
        };
        let column = Column::new(input.board_id, &input.name, position)?;
        self.require_board(column.board_id()).await?;

        self.storage.create_column(&column).await?;
        info!(
            column_id = %column.id(),
            board_id = %column.board_id(),
            position = column.position(),
            "column created"
        );
        Ok(column)
    }

    /// Columns of a board with their cards, ordered by position
    pub async fn list_by_board(&self, board_id: &BoardId) -> Result<Vec<ColumnWithCards>> {
        self.require_board(board_id).await?;
        let columns = self.storage.list_columns_with_cards(board_id).await?;
        debug!(board_id = %board_id, count = columns.len(), "columns listed");
        Ok(columns)
    }

    pub async fn get(&self, id: &ColumnId) -> Result<Column> {
        self.storage
            .find_column(id)
            .await?
            .ok_or_else(|| KanbanError::not_found("Column", id))
    }

    pub async fn rename(&self, id: &ColumnId, name: &str) -> Result<Column> {
        let mut column = self.get(id).await?;
        column.rename(name)?;
        self.storage.update_column(&column).await?;
        info!(column_id = %id, name = column.name(), "column renamed");
        Ok(column)
    }

    /// Moves a column to `to_position` among its board's columns and
    /// renumbers all of them.
    pub async fn move_to(&self, id: &ColumnId, to_position: i64) -> Result<Column> {
        let board_id = self.get(id).await?.board_id().clone();
        let _guard = self.locks.lock(&board_lock_key(&board_id)).await;

        // Re-read under the lock
        let column = self.get(id).await?;
        let siblings = self.storage.list_columns(&board_id).await?;
        let ordered = reposition(siblings, column, to_position);

        self.storage.update_columns(&ordered).await?;

        let moved = ordered
            .into_iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| KanbanError::not_found("Column", id))?;
        info!(column_id = %id, position = moved.position(), "column moved");
        Ok(moved)
    }

    /// Deletes a column and, through storage, its cards
    pub async fn delete(&self, id: &ColumnId) -> Result<()> {
        self.get(id).await?;
        self.storage.delete_column(id).await?;
        info!(column_id = %id, "column deleted");
        Ok(())
    }

    async fn require_board(&self, board_id: &BoardId) -> Result<()> {
        match self.storage.find_board(board_id).await? {
            Some(_) => Ok(()),
            None => Err(KanbanError::not_found("Board", board_id)),
        }
    }
}

fn board_lock_key(board_id: &BoardId) -> String {
    format!("board:{board_id}")
}
