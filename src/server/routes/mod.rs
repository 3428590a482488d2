//! Route handlers organized by resource

pub mod boards;
pub mod cards;
pub mod columns;
pub mod health;
