use crate::{
    domain::{Board, BoardId, Card, CardId, Column, ColumnId, ColumnWithCards},
    error::{KanbanError, Result},
    storage::{BoardRepository, CardRepository, ColumnRepository, Storage},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    boards: Vec<Board>,
    columns: HashMap<ColumnId, Column>,
    cards: HashMap<CardId, Card>,
}

/// In-process storage backend.
///
/// Keeps everything in memory and counts successful writes, which makes it
/// the backend of choice for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write operations applied so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn sorted_columns(columns: impl Iterator<Item = Column>) -> Vec<Column> {
    let mut columns: Vec<Column> = columns.collect();
    columns.sort_by(|a, b| {
        a.position()
            .cmp(&b.position())
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });
    columns
}

fn sorted_cards(cards: impl Iterator<Item = Card>) -> Vec<Card> {
    let mut cards: Vec<Card> = cards.collect();
    cards.sort_by(|a, b| {
        a.position()
            .cmp(&b.position())
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });
    cards
}

#[async_trait]
impl BoardRepository for MemoryStorage {
    async fn create_board(&self, board: &Board) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.boards.iter().any(|b| b.id() == board.id()) {
            return Err(KanbanError::Storage(format!(
                "Board {} already exists",
                board.id()
            )));
        }
        tables.boards.push(board.clone());
        self.record_write();
        Ok(())
    }

    async fn find_board(&self, id: &BoardId) -> Result<Option<Board>> {
        let tables = self.tables.read().await;
        Ok(tables.boards.iter().find(|b| b.id() == id).cloned())
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let tables = self.tables.read().await;
        let mut boards: Vec<Board> = tables.boards.iter().rev().cloned().collect();
        boards.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(boards)
    }

    async fn update_board(&self, board: &Board) -> Result<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .boards
            .iter_mut()
            .find(|b| b.id() == board.id())
            .ok_or_else(|| KanbanError::not_found("Board", board.id()))?;
        *slot = board.clone();
        self.record_write();
        Ok(())
    }

    async fn delete_board(&self, id: &BoardId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let before = tables.boards.len();
        tables.boards.retain(|b| b.id() != id);
        if tables.boards.len() == before {
            return Err(KanbanError::not_found("Board", id));
        }
        tables.columns.retain(|_, c| c.board_id() != id);
        tables.cards.retain(|_, c| c.board_id() != id);
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl ColumnRepository for MemoryStorage {
    async fn create_column(&self, column: &Column) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.boards.iter().any(|b| b.id() == column.board_id()) {
            return Err(KanbanError::not_found("Board", column.board_id()));
        }
        tables.columns.insert(column.id().clone(), column.clone());
        self.record_write();
        Ok(())
    }

    async fn find_column(&self, id: &ColumnId) -> Result<Option<Column>> {
        let tables = self.tables.read().await;
        Ok(tables.columns.get(id).cloned())
    }

    async fn list_columns(&self, board_id: &BoardId) -> Result<Vec<Column>> {
        let tables = self.tables.read().await;
        Ok(sorted_columns(
            tables
                .columns
                .values()
                .filter(|c| c.board_id() == board_id)
                .cloned(),
        ))
    }

    async fn list_columns_with_cards(&self, board_id: &BoardId) -> Result<Vec<ColumnWithCards>> {
        let tables = self.tables.read().await;
        let columns = sorted_columns(
            tables
                .columns
                .values()
                .filter(|c| c.board_id() == board_id)
                .cloned(),
        );

        Ok(columns
            .into_iter()
            .map(|column| {
                let cards = sorted_cards(
                    tables
                        .cards
                        .values()
                        .filter(|card| card.column_id() == column.id())
                        .cloned(),
                );
                ColumnWithCards::new(column, cards)
            })
            .collect())
    }

    async fn update_column(&self, column: &Column) -> Result<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .columns
            .get_mut(column.id())
            .ok_or_else(|| KanbanError::not_found("Column", column.id()))?;
        *slot = column.clone();
        self.record_write();
        Ok(())
    }

    async fn update_columns(&self, columns: &[Column]) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(missing) = columns.iter().find(|c| !tables.columns.contains_key(c.id())) {
            return Err(KanbanError::not_found("Column", missing.id()));
        }
        for column in columns {
            tables.columns.insert(column.id().clone(), column.clone());
        }
        self.record_write();
        Ok(())
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.columns.remove(id).is_none() {
            return Err(KanbanError::not_found("Column", id));
        }
        tables.cards.retain(|_, c| c.column_id() != id);
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl CardRepository for MemoryStorage {
    async fn create_card(&self, card: &Card) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.columns.contains_key(card.column_id()) {
            return Err(KanbanError::not_found("Column", card.column_id()));
        }
        tables.cards.insert(card.id().clone(), card.clone());
        self.record_write();
        Ok(())
    }

    async fn find_card(&self, id: &CardId) -> Result<Option<Card>> {
        let tables = self.tables.read().await;
        Ok(tables.cards.get(id).cloned())
    }

    async fn list_cards(&self, column_id: &ColumnId) -> Result<Vec<Card>> {
        let tables = self.tables.read().await;
        Ok(sorted_cards(
            tables
                .cards
                .values()
                .filter(|c| c.column_id() == column_id)
                .cloned(),
        ))
    }

    async fn update_card(&self, card: &Card) -> Result<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .cards
            .get_mut(card.id())
            .ok_or_else(|| KanbanError::not_found("Card", card.id()))?;
        slot.merge_details(card);
        self.record_write();
        Ok(())
    }

    async fn update_cards(&self, cards: &[Card]) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(missing) = cards.iter().find(|c| !tables.cards.contains_key(c.id())) {
            return Err(KanbanError::not_found("Card", missing.id()));
        }
        for card in cards {
            tables.cards.insert(card.id().clone(), card.clone());
        }
        self.record_write();
        Ok(())
    }

    async fn delete_card(&self, id: &CardId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.cards.remove(id).is_none() {
            return Err(KanbanError::not_found("Card", id));
        }
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewCard;

    async fn seeded() -> (MemoryStorage, Board, Column) {
        let storage = MemoryStorage::new();
        let board = Board::new("Roadmap").unwrap();
        storage.create_board(&board).await.unwrap();
        let column = Column::new(board.id().clone(), "Todo", 0).unwrap();
        storage.create_column(&column).await.unwrap();
        (storage, board, column)
    }

    fn card(board: &Board, column: &Column, title: &str, position: i64) -> Card {
        Card::new(NewCard {
            board_id: board.id().clone(),
            column_id: column.id().clone(),
            title: title.to_string(),
            description: None,
            position,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_cards_listed_by_position() {
        let (storage, board, column) = seeded().await;
        storage.create_card(&card(&board, &column, "Second", 1)).await.unwrap();
        storage.create_card(&card(&board, &column, "First", 0)).await.unwrap();

        let cards = storage.list_cards(column.id()).await.unwrap();
        let titles: Vec<&str> = cards.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_delete_board_cascades() {
        let (storage, board, column) = seeded().await;
        let c = card(&board, &column, "Task", 0);
        storage.create_card(&c).await.unwrap();

        storage.delete_board(board.id()).await.unwrap();

        assert!(storage.find_column(column.id()).await.unwrap().is_none());
        assert!(storage.find_card(c.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_update_is_all_or_nothing() {
        let (storage, board, column) = seeded().await;
        let mut stored = card(&board, &column, "Stored", 0);
        storage.create_card(&stored).await.unwrap();
        let ghost = card(&board, &column, "Never saved", 1);
        let writes = storage.write_count();

        stored.move_to(column.id().clone(), 5).unwrap();
        let err = storage.update_cards(&[stored.clone(), ghost]).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(storage.write_count(), writes);
        let reloaded = storage.find_card(stored.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.position(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found_without_write() {
        let storage = MemoryStorage::new();
        let err = storage.delete_card(&CardId::from("nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(storage.write_count(), 0);
    }
}
