//! # mkanban
//!
//! Kanban backend: boards hold ordered columns, columns hold ordered cards.
//!
//! The crate is layered the same way top to bottom:
//! - [`domain`] entities validate every change and share the reposition
//!   rules used for cards and columns
//! - [`storage`] persists them behind async repository traits (SQLite or
//!   in-memory)
//! - [`service`] runs the use cases and serializes concurrent moves
//! - [`server`] exposes the services over HTTP with Axum
//! - [`client`] talks to that API and keeps optimistic board state

pub mod client;
pub mod domain;
pub mod dto;
pub mod error;
pub mod server;
pub mod service;
pub mod storage;
pub mod tracing_setup;

// Re-export commonly used types
pub use domain::{
    Board, BoardId, Card, CardChanges, CardId, Column, ColumnId, ColumnWithCards, NewCard,
};
pub use error::{KanbanError, Result};
pub use service::KanbanServices;
pub use storage::Storage;
