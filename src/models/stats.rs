//! Circulation report types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Book ranked by number of issued or returned orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookStats {
    pub book_id: i64,
    pub title: String,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub genre: Option<String>,
    pub order_count: i64,
}

impl BookStats {
    pub fn author_full_name(&self) -> String {
        super::author_full_name(
            self.author_first_name.as_deref(),
            self.author_last_name.as_deref(),
        )
    }
}

/// Ranked book as shown on the report page
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookStatsView {
    #[serde(flatten)]
    pub stats: BookStats,
    pub author_full_name: String,
}

impl From<BookStats> for BookStatsView {
    fn from(stats: BookStats) -> Self {
        Self {
            author_full_name: stats.author_full_name(),
            stats,
        }
    }
}

/// Active reader ranked by number of issued or returned orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserStats {
    pub user_id: i64,
    pub username: String,
    pub order_count: i64,
}

/// Administrator report page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportDashboard {
    pub total_books: i64,
    pub total_copies: i64,
    pub issued_copies: i64,
    pub completed_orders: i64,
    pub active_users: i64,
    pub top_books: Vec<BookStatsView>,
    pub top_users: Vec<UserStats>,
}
