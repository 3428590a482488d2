//! Use cases over the storage traits.
//!
//! Each operation loads what it needs, lets the entity validate the change,
//! persists, and returns the updated entity. Absent rows become
//! [`KanbanError::NotFound`](crate::error::KanbanError::NotFound).

use crate::storage::Storage;
use std::sync::Arc;

pub mod board_service;
pub mod card_service;
pub mod column_service;
pub mod locks;

pub use board_service::BoardService;
pub use card_service::{CardService, CreateCard, MoveCard};
pub use column_service::{ColumnService, NewColumn};
pub use locks::KeyedLocks;

/// The three services wired to one storage backend and one lock table
#[derive(Clone)]
pub struct KanbanServices {
    pub boards: BoardService,
    pub columns: ColumnService,
    pub cards: CardService,
}

impl KanbanServices {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let locks = KeyedLocks::new();
        Self {
            boards: BoardService::new(Arc::clone(&storage)),
            columns: ColumnService::new(Arc::clone(&storage), locks.clone()),
            cards: CardService::new(storage, locks),
        }
    }
}
