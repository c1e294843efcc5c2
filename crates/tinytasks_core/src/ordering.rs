//! Sibling ordering utility.
//!
//! # Responsibility
//! - Move selected elements of an ordered sibling sequence.
//! - Re-stamp `order` fields so they match final positions.
//!
//! # Invariants
//! - After `reorder` or `reindex_after_removal`, orders are exactly `0..n-1`.
//! - Non-moved elements keep their relative order; so do moved ones.
//! - Re-stamping an already contiguous sequence changes nothing.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by ordering operations.
pub type OrderResult<T> = Result<T, OrderError>;

/// Errors from ordering operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A source position does not exist in the sequence.
    IndexOutOfBounds { index: usize, len: usize },
}

impl Display for OrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => write!(
                f,
                "move source index {index} is out of bounds for sequence of length {len}"
            ),
        }
    }
}

impl Error for OrderError {}

/// Entity with a display position among its siblings.
pub trait Ordered {
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

impl<T: Ordered + ?Sized> Ordered for &mut T {
    fn order(&self) -> i64 {
        (**self).order()
    }

    fn set_order(&mut self, order: i64) {
        (**self).set_order(order);
    }
}

/// Returns the order value for an entity appended to `items`.
pub fn next_order<T>(items: &[T]) -> i64 {
    items.len() as i64
}

/// Moves elements at `from` so they land before the element originally at
/// `to`, keeping their relative order.
///
/// `to` is an offset in the original sequence; values past the end append.
pub fn move_offsets<T>(
    items: &mut Vec<T>,
    from: &BTreeSet<usize>,
    to: usize,
) -> OrderResult<()> {
    let len = items.len();
    if let Some(&index) = from.iter().next_back() {
        if index >= len {
            return Err(OrderError::IndexOutOfBounds { index, len });
        }
    }
    if from.is_empty() {
        return Ok(());
    }

    let to = to.min(len);
    let insert_at = to - from.range(..to).count();

    let mut moved = Vec::with_capacity(from.len());
    let mut kept = Vec::with_capacity(len - from.len());
    for (index, item) in items.drain(..).enumerate() {
        if from.contains(&index) {
            moved.push(item);
        } else {
            kept.push(item);
        }
    }

    kept.splice(insert_at..insert_at, moved);
    *items = kept;
    Ok(())
}

/// Re-stamps orders to current positions. Returns how many elements changed.
pub fn reindex_after_removal<T: Ordered>(items: &mut [T]) -> usize {
    let mut changed = 0;
    for (position, item) in items.iter_mut().enumerate() {
        let position = position as i64;
        if item.order() != position {
            item.set_order(position);
            changed += 1;
        }
    }
    changed
}

/// Moves elements at `from` to `to`, then re-stamps every order.
///
/// Returns how many elements received a new order value.
pub fn reorder<T: Ordered>(
    items: &mut Vec<T>,
    from: &BTreeSet<usize>,
    to: usize,
) -> OrderResult<usize> {
    move_offsets(items, from, to)?;
    Ok(reindex_after_removal(items))
}

/// Returns whether orders are exactly `0..n-1` in sequence position.
pub fn is_contiguous<T: Ordered>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(position, item)| item.order() == position as i64)
}
