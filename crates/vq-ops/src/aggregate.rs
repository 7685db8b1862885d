//! Column aggregates.

use std::cmp::Ordering;

use vq_core::view::item_compare;
use vq_core::{Column, ErrorCode, Item, ItemType, View};

use crate::error::{Error, Result};

fn column(view: &View, col: usize) -> Result<&Column> {
    Ok(view.column(col).ok_or(ErrorCode::ColumnOutOfRange)?)
}

fn extreme(view: &View, col: usize, keep: Ordering) -> Result<Item> {
    let column = column(view, col)?;
    let best = (0..column.len())
        .map(|r| column.get(r))
        .reduce(|best, item| {
            if item_compare(&item, &best) == keep {
                item
            } else {
                best
            }
        })
        .ok_or(ErrorCode::NoRows)?;
    if let Item::Error(code) = best {
        return Err(code.into());
    }
    Ok(best)
}

/// Largest value in a column; the first one wins among equals.
pub fn max(view: &View, col: usize) -> Result<Item> {
    extreme(view, col, Ordering::Greater)
}

pub fn min(view: &View, col: usize) -> Result<Item> {
    extreme(view, col, Ordering::Less)
}

/// Sum of a numeric column: ints and wides add up to a `Wide`, floats and
/// doubles to a `Double`.
pub fn sum(view: &View, col: usize) -> Result<Item> {
    let column = column(view, col)?;
    let rows = 0..column.len();
    match view.col_type(col) {
        ItemType::Int | ItemType::Wide => Ok(Item::Wide(
            rows.map(|r| match column.get(r) {
                Item::Int(v) => v as i64,
                Item::Wide(v) => v,
                _ => 0,
            })
            .fold(0i64, i64::wrapping_add),
        )),
        ItemType::Float | ItemType::Double => Ok(Item::Double(
            rows.map(|r| match column.get(r) {
                Item::Float(v) => v as f64,
                Item::Double(v) => v,
                _ => 0.0,
            })
            .sum(),
        )),
        ty => Err(Error::NotNumeric(ty)),
    }
}
