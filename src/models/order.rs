//! Borrowing order model and the order/copy state machine
//!
//! ```text
//! PENDING ──confirm──▶ ISSUED ──return──▶ RETURNED
//!    │
//!    └──cancel──▶ CANCELED
//! ```
//!
//! Each order status pins the status of the copy it refers to:
//! PENDING ↔ RESERVED, ISSUED ↔ ISSUED, RETURNED/CANCELED ↔ AVAILABLE.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::copy::CopyStatus;
use crate::config::OrdersConfig;

/// Where the reader will use the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Home,
    ReadingRoom,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Home => "HOME",
            OrderType::ReadingRoom => "READING_ROOM",
        }
    }

    /// Loan period in days
    pub fn loan_days(&self, config: &OrdersConfig) -> i64 {
        match self {
            OrderType::Home => config.home_loan_days,
            OrderType::ReadingRoom => config.reading_room_loan_days,
        }
    }

    pub fn due_date(&self, issue_date: NaiveDate, config: &OrdersConfig) -> NaiveDate {
        issue_date + Duration::days(self.loan_days(config))
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HOME" => Ok(OrderType::Home),
            "READING_ROOM" => Ok(OrderType::ReadingRoom),
            _ => Err(format!("Invalid order type: {}", s)),
        }
    }
}

super::impl_text_column!(OrderType);

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Issued,
    Returned,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Issued => "ISSUED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    /// PENDING and ISSUED orders hold their copy
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Issued)
    }

    /// Copy status that accompanies an order in this status
    pub fn copy_status(&self) -> CopyStatus {
        match self {
            OrderStatus::Pending => CopyStatus::Reserved,
            OrderStatus::Issued => CopyStatus::Issued,
            OrderStatus::Returned | OrderStatus::Canceled => CopyStatus::Available,
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Issued)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                | (OrderStatus::Issued, OrderStatus::Returned)
        )
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "ISSUED" => Ok(OrderStatus::Issued),
            "RETURNED" => Ok(OrderStatus::Returned),
            "CANCELED" => Ok(OrderStatus::Canceled),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

super::impl_text_column!(OrderStatus);

/// Order joined with its reader, copy and book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderDetails {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub copy_id: i64,
    pub inventory_number: String,
    pub book_id: i64,
    pub book_title: String,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

impl OrderDetails {
    pub fn author_full_name(&self) -> String {
        super::author_full_name(
            self.author_first_name.as_deref(),
            self.author_last_name.as_deref(),
        )
    }

    /// An issued book whose due date has passed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == OrderStatus::Issued && self.due_date.map(|d| d < today).unwrap_or(false)
    }
}

/// Order as presented to clients
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: OrderDetails,
    pub author_full_name: String,
    pub is_overdue: bool,
}

impl OrderView {
    pub fn new(order: OrderDetails, today: NaiveDate) -> Self {
        Self {
            author_full_name: order.author_full_name(),
            is_overdue: order.is_overdue(today),
            order,
        }
    }
}

/// Order about to be inserted; its copy is reserved in the same transaction
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub copy_id: i64,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl NewOrder {
    /// PENDING order for `copy_id` with the due date implied by `order_type`
    pub fn pending(
        user_id: i64,
        copy_id: i64,
        order_type: OrderType,
        issue_date: NaiveDate,
        config: &OrdersConfig,
    ) -> Self {
        Self {
            user_id,
            copy_id,
            order_type,
            status: OrderStatus::Pending,
            issue_date,
            due_date: order_type.due_date(issue_date, config),
        }
    }
}

/// Status change applied atomically to an order and its copy
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTransition {
    pub order_id: i64,
    pub copy_id: i64,
    /// Status the order must still be in for the update to apply
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

impl OrderTransition {
    pub fn copy_status(&self) -> CopyStatus {
        self.to.copy_status()
    }
}

/// Order request body
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub book_id: i64,
    pub order_type: OrderType,
}

/// Issue confirmation body
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConfirmOrderRequest {
    /// Defaults to the due date computed when the order was placed
    pub due_date: Option<NaiveDate>,
}
