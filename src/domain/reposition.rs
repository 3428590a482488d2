//! Position reindexing for ordered collections.
//!
//! Cards within a column and columns within a board both keep a 0-based,
//! gap-free `position`. Moving an item rewrites the rank of every item in
//! the destination collection.

use crate::domain::{card::Card, column::Column, id::CardId, id::ColumnId};

/// An item that occupies a rank inside an ordered collection
pub trait Ranked {
    type Key: PartialEq;

    fn rank_key(&self) -> &Self::Key;

    /// Overwrites the stored position with a computed rank
    fn set_rank(&mut self, rank: usize);
}

impl Ranked for Card {
    type Key = CardId;

    fn rank_key(&self) -> &CardId {
        self.id()
    }

    fn set_rank(&mut self, rank: usize) {
        self.assign_rank(rank);
    }
}

impl Ranked for Column {
    type Key = ColumnId;

    fn rank_key(&self) -> &ColumnId {
        self.id()
    }

    fn set_rank(&mut self, rank: usize) {
        self.assign_rank(rank);
    }
}

/// Clamps a requested position into `[0, len]`
pub fn clamp_index(requested: i64, len: usize) -> usize {
    if requested <= 0 {
        0
    } else {
        usize::try_from(requested).map_or(len, |index| index.min(len))
    }
}

/// Moves `moved` into `items` at `to_position` and renumbers the whole list.
///
/// `items` must already be ordered by position. If `moved` is in `items`
/// (same-collection move) its old entry is dropped first, and the clamp is
/// computed against the shortened list.
pub fn reposition<T: Ranked>(mut items: Vec<T>, moved: T, to_position: i64) -> Vec<T> {
    items.retain(|item| item.rank_key() != moved.rank_key());

    let index = clamp_index(to_position, items.len());
    items.insert(index, moved);

    renumber(&mut items);
    items
}

/// Assigns every item its index as rank
pub fn renumber<T: Ranked>(items: &mut [T]) {
    for (rank, item) in items.iter_mut().enumerate() {
        item.set_rank(rank);
    }
}
