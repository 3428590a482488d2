//! Field rules shared by the board, column and card entities.
//!
//! Every check works on the proposed value and returns it normalized, so
//! callers only assign once all checks for a mutation have passed.

use crate::error::{KanbanError, Result};

/// Trims `value` and checks its length against `min..=max` characters.
pub(crate) fn normalize_text(
    subject: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KanbanError::validation(format!("{subject} is required")));
    }

    let len = trimmed.chars().count();
    if len < min {
        return Err(KanbanError::validation(format!(
            "{subject} must be at least {min} characters"
        )));
    }
    if let Some(max) = max {
        if len > max {
            return Err(KanbanError::validation(format!(
                "{subject} must be at most {max} characters"
            )));
        }
    }

    Ok(trimmed.to_string())
}

pub(crate) fn check_position(subject: &str, position: i64) -> Result<i64> {
    if position < 0 {
        return Err(KanbanError::validation(format!("{subject} must be >= 0")));
    }
    Ok(position)
}

pub(crate) fn check_reference(field: &str, present: bool) -> Result<()> {
    if present {
        Ok(())
    } else {
        Err(KanbanError::validation(format!("{field} is required")))
    }
}
