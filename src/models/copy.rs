//! Book copy (physical inventory) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Prefix shared by every generated inventory number
pub const INVENTORY_PREFIX: &str = "INV-";

/// Longest digit run treated as a sequence number; wider ones do not fit a BIGINT
pub const MAX_INVENTORY_DIGITS: usize = 18;

/// Lifecycle status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    Available,
    Reserved,
    Issued,
    Lost,
    WrittenOff,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "AVAILABLE",
            CopyStatus::Reserved => "RESERVED",
            CopyStatus::Issued => "ISSUED",
            CopyStatus::Lost => "LOST",
            CopyStatus::WrittenOff => "WRITTEN_OFF",
        }
    }

    /// RESERVED and ISSUED are only reached through an order
    pub fn is_order_driven(&self) -> bool {
        matches!(self, CopyStatus::Reserved | CopyStatus::Issued)
    }
}

impl std::str::FromStr for CopyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Ok(CopyStatus::Available),
            "RESERVED" => Ok(CopyStatus::Reserved),
            "ISSUED" => Ok(CopyStatus::Issued),
            "LOST" => Ok(CopyStatus::Lost),
            "WRITTEN_OFF" => Ok(CopyStatus::WrittenOff),
            _ => Err(format!("Invalid copy status: {}", s)),
        }
    }
}

super::impl_text_column!(CopyStatus);

/// Physical copy of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i64,
    pub book_id: i64,
    pub inventory_number: String,
    pub status: CopyStatus,
    /// Populated when queried with a join on books
    #[sqlx(default)]
    #[serde(default)]
    pub book_title: Option<String>,
}

/// Add copy request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBookCopy {
    /// Generated from the last copy of the book when omitted
    #[validate(length(min = 1, max = 64, message = "Inventory number must be 1-64 characters"))]
    pub inventory_number: Option<String>,
    /// Defaults to AVAILABLE
    pub status: Option<CopyStatus>,
}

/// Edit copy request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBookCopy {
    #[validate(length(min = 1, max = 64, message = "Inventory number must be 1-64 characters"))]
    pub inventory_number: String,
    pub status: CopyStatus,
}

/// Row inserted into book_copies
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookCopy {
    pub book_id: i64,
    pub inventory_number: String,
    pub status: CopyStatus,
}

/// Formats an inventory number, zero-padded to at least four digits
pub fn format_inventory_number(number: u64) -> String {
    format!("{}{:04}", INVENTORY_PREFIX, number)
}

/// Computes the inventory number following `last`.
///
/// The digits after the four-character prefix are incremented; a missing or
/// unparsable previous number restarts the sequence at `INV-0001`.
pub fn next_inventory_number(last: Option<&str>) -> String {
    let next = match last {
        None => 1,
        Some(last) => match inventory_sequence(last) {
            Some(n) => n + 1,
            None => {
                tracing::warn!("Invalid inventory number format: {}", last);
                1
            }
        },
    };

    format_inventory_number(next)
}

/// Sequence number after the prefix, when it is 1 to 18 digits
fn inventory_sequence(number: &str) -> Option<u64> {
    let digits = number.get(INVENTORY_PREFIX.len()..)?;
    if digits.is_empty()
        || digits.len() > MAX_INVENTORY_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}
