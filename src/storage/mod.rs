use crate::{
    domain::{Board, BoardId, Card, CardId, Column, ColumnId, ColumnWithCards},
    error::Result,
};
use async_trait::async_trait;

pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use memory_storage::MemoryStorage;
#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// Persistence for boards
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Inserts a new board
    async fn create_board(&self, board: &Board) -> Result<()>;

    /// Loads a board by ID, `None` when absent
    async fn find_board(&self, id: &BoardId) -> Result<Option<Board>>;

    /// Lists all boards, newest first
    async fn list_boards(&self) -> Result<Vec<Board>>;

    /// Saves the name and `updated_at` of an existing board
    async fn update_board(&self, board: &Board) -> Result<()>;

    /// Deletes a board together with its columns and cards
    async fn delete_board(&self, id: &BoardId) -> Result<()>;
}

/// Persistence for columns
#[async_trait]
pub trait ColumnRepository: Send + Sync {
    async fn create_column(&self, column: &Column) -> Result<()>;

    async fn find_column(&self, id: &ColumnId) -> Result<Option<Column>>;

    /// Lists the columns of a board ordered by position
    async fn list_columns(&self, board_id: &BoardId) -> Result<Vec<Column>>;

    /// Lists the columns of a board with their cards, both ordered by position
    async fn list_columns_with_cards(&self, board_id: &BoardId) -> Result<Vec<ColumnWithCards>>;

    async fn update_column(&self, column: &Column) -> Result<()>;

    /// Saves the positions of several columns as one all-or-nothing write
    async fn update_columns(&self, columns: &[Column]) -> Result<()>;

    /// Deletes a column together with its cards
    async fn delete_column(&self, id: &ColumnId) -> Result<()>;
}

/// Persistence for cards
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn create_card(&self, card: &Card) -> Result<()>;

    async fn find_card(&self, id: &CardId) -> Result<Option<Card>>;

    /// Lists the cards of a column ordered by position
    async fn list_cards(&self, column_id: &ColumnId) -> Result<Vec<Card>>;

    /// Saves title, description and `updated_at`. Column and position only
    /// change through [`update_cards`](Self::update_cards).
    async fn update_card(&self, card: &Card) -> Result<()>;

    /// Saves column and position of several cards as one all-or-nothing write
    async fn update_cards(&self, cards: &[Card]) -> Result<()>;

    async fn delete_card(&self, id: &CardId) -> Result<()>;
}

/// A complete storage backend for the kanban entities
#[async_trait]
pub trait Storage: BoardRepository + ColumnRepository + CardRepository {
    /// Prepares the backend (schema, directories). Safe to call repeatedly.
    async fn initialize(&self) -> Result<()>;

    /// Short name used in logs
    fn backend_name(&self) -> &'static str;
}
