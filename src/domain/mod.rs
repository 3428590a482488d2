pub mod board;
pub mod card;
pub mod column;
pub mod id;
pub mod reposition;
mod validation;

pub use board::Board;
pub use card::{Card, CardChanges, NewCard};
pub use column::{Column, ColumnWithCards};
pub use id::{BoardId, CardId, ColumnId};
pub use reposition::{clamp_index, renumber, reposition, Ranked};
