//! Item values and their type tags.
//!
//! An `Item` is one decoded cell: produced by a column access and consumed
//! right away. Items own their payload so they never borrow from the
//! sequence that produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Unknown,
    Int,
    Wide,
    Float,
    Double,
    Str,
    Bytes,
    View,
    Error,
}

impl ItemType {
    /// Map a one-letter type code (as used in descriptions and meta views).
    pub fn from_code(code: u8) -> ItemType {
        match code {
            0 => ItemType::Unknown,
            b'I' => ItemType::Int,
            b'L' => ItemType::Wide,
            b'F' => ItemType::Float,
            b'D' => ItemType::Double,
            b'S' => ItemType::Str,
            b'B' => ItemType::Bytes,
            b'V' => ItemType::View,
            _ => ItemType::Error,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ItemType::Unknown => "",
            ItemType::Int => "I",
            ItemType::Wide => "L",
            ItemType::Float => "F",
            ItemType::Double => "D",
            ItemType::Str => "S",
            ItemType::Bytes => "B",
            ItemType::View => "V",
            ItemType::Error => "E",
        }
    }

    /// Byte width of a fixed-size type, `None` for variable-size ones.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ItemType::Int | ItemType::Float => Some(4),
            ItemType::Wide | ItemType::Double => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Unknown => write!(f, "?"),
            other => write!(f, "{}", other.code()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    Unknown,
    Int(i32),
    Wide(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Bytes(Vec<u8>),
    View(View),
    Error(ErrorCode),
}

impl Item {
    pub fn item_type(&self) -> ItemType {
        match self {
            Item::Unknown => ItemType::Unknown,
            Item::Int(_) => ItemType::Int,
            Item::Wide(_) => ItemType::Wide,
            Item::Float(_) => ItemType::Float,
            Item::Double(_) => ItemType::Double,
            Item::Str(_) => ItemType::Str,
            Item::Bytes(_) => ItemType::Bytes,
            Item::View(_) => ItemType::View,
            Item::Error(_) => ItemType::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Item::Error(_))
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Item::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_wide(&self) -> Option<i64> {
        match self {
            Item::Wide(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Item::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Item::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Item::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&View> {
        match self {
            Item::View(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_view(self) -> Option<View> {
        match self {
            Item::View(v) => Some(v),
            _ => None,
        }
    }

    /// Convert this item to another type, the way a host binding turns a
    /// generic value into a typed cell. Returns `None` when no sensible
    /// conversion exists (e.g. "abc" as an int).
    pub fn convert(&self, ty: ItemType) -> Option<Item> {
        if self.item_type() == ty {
            return Some(self.clone());
        }
        match ty {
            ItemType::Int => match self {
                Item::Wide(v) => i32::try_from(*v).ok().map(Item::Int),
                Item::Str(s) => s.trim().parse().ok().map(Item::Int),
                Item::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok().map(Item::Int),
                _ => None,
            },
            ItemType::Wide => match self {
                Item::Int(v) => Some(Item::Wide(*v as i64)),
                Item::Str(s) => s.trim().parse().ok().map(Item::Wide),
                Item::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok().map(Item::Wide),
                _ => None,
            },
            ItemType::Float => self.as_f64_lossy().map(|d| Item::Float(d as f32)),
            ItemType::Double => self.as_f64_lossy().map(Item::Double),
            ItemType::Str => match self {
                Item::Bytes(b) => String::from_utf8(b.clone()).ok().map(Item::Str),
                other => other.scalar_text().map(Item::Str),
            },
            ItemType::Bytes => match self {
                Item::Str(s) => Some(Item::Bytes(s.clone().into_bytes())),
                other => other.scalar_text().map(|s| Item::Bytes(s.into_bytes())),
            },
            _ => None,
        }
    }

    fn as_f64_lossy(&self) -> Option<f64> {
        match self {
            Item::Int(v) => Some(*v as f64),
            Item::Wide(v) => Some(*v as f64),
            Item::Float(v) => Some(*v as f64),
            Item::Double(v) => Some(*v),
            Item::Str(s) => s.trim().parse().ok(),
            Item::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    fn scalar_text(&self) -> Option<String> {
        match self {
            Item::Int(v) => Some(v.to_string()),
            Item::Wide(v) => Some(v.to_string()),
            Item::Float(v) => Some(v.to_string()),
            Item::Double(v) => Some(v.to_string()),
            Item::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Unknown => write!(f, "?"),
            Item::Int(v) => write!(f, "{}", v),
            Item::Wide(v) => write!(f, "{}", v),
            Item::Float(v) => write!(f, "{}", v),
            Item::Double(v) => write!(f, "{}", v),
            Item::Str(s) => write!(f, "{}", s),
            Item::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Item::View(v) => write!(f, "#{}", v.size()),
            Item::Error(e) => write!(f, "error: {}", e),
        }
    }
}

impl From<i32> for Item {
    fn from(v: i32) -> Self {
        Item::Int(v)
    }
}

impl From<i64> for Item {
    fn from(v: i64) -> Self {
        Item::Wide(v)
    }
}

impl From<f32> for Item {
    fn from(v: f32) -> Self {
        Item::Float(v)
    }
}

impl From<f64> for Item {
    fn from(v: f64) -> Self {
        Item::Double(v)
    }
}

impl From<&str> for Item {
    fn from(v: &str) -> Self {
        Item::Str(v.to_string())
    }
}

impl From<String> for Item {
    fn from(v: String) -> Self {
        Item::Str(v)
    }
}

impl From<Vec<u8>> for Item {
    fn from(v: Vec<u8>) -> Self {
        Item::Bytes(v)
    }
}

impl From<View> for Item {
    fn from(v: View) -> Self {
        Item::View(v)
    }
}

/// Host-side value to typed item conversion.
///
/// Column coercion and view construction from loose values go through this
/// trait, so a binding only has to say how its own value type maps onto
/// items.
pub trait ToItem {
    fn to_item(&self, ty: ItemType) -> Option<Item>;
}

impl<T: Clone + Into<Item>> ToItem for T {
    fn to_item(&self, ty: ItemType) -> Option<Item> {
        self.clone().into().convert(ty)
    }
}
