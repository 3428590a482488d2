//! Client for the mkanban HTTP API and the board state built on it.

pub mod api;
pub mod store;

pub use api::{ApiClient, ClientError, ClientResult, KanbanApi};
pub use store::BoardStore;
