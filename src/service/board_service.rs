use crate::{
    domain::{Board, BoardId},
    error::{KanbanError, Result},
    storage::Storage,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Board use cases
#[derive(Clone)]
pub struct BoardService {
    storage: Arc<dyn Storage>,
}

impl BoardService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, name: &str) -> Result<Board> {
        let board = Board::new(name)?;
        self.storage.create_board(&board).await?;
        info!(board_id = %board.id(), name = board.name(), "board created");
        Ok(board)
    }

    /// All boards, newest first
    pub async fn list(&self) -> Result<Vec<Board>> {
        let boards = self.storage.list_boards().await?;
        debug!(count = boards.len(), "boards listed");
        Ok(boards)
    }

    pub async fn get(&self, id: &BoardId) -> Result<Board> {
        self.storage
            .find_board(id)
            .await?
            .ok_or_else(|| KanbanError::not_found("Board", id))
    }

    pub async fn rename(&self, id: &BoardId, name: &str) -> Result<Board> {
        let mut board = self.get(id).await?;
        board.rename(name)?;
        self.storage.update_board(&board).await?;
        info!(board_id = %id, name = board.name(), "board renamed");
        Ok(board)
    }

    /// Deletes a board and, through storage, its columns and cards
    pub async fn delete(&self, id: &BoardId) -> Result<()> {
        self.get(id).await?;
        self.storage.delete_board(id).await?;
        info!(board_id = %id, "board deleted");
        Ok(())
    }
}
