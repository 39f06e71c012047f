//! Administrator reports

use crate::{
    config::ReportsConfig,
    error::AppResult,
    models::{BookStatsView, CopyStatus, OrderStatus, ReportDashboard, UserStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    config: ReportsConfig,
}

impl ReportsService {
    pub fn new(repository: Repository, config: ReportsConfig) -> Self {
        Self { repository, config }
    }

    /// Inventory and circulation totals with the most requested books and most active readers
    pub async fn dashboard(&self) -> AppResult<ReportDashboard> {
        let repo = &self.repository;

        Ok(ReportDashboard {
            total_books: repo.books.count().await?,
            total_copies: repo.copies.count_all().await?,
            issued_copies: repo.copies.count_by_status(CopyStatus::Issued).await?,
            completed_orders: repo
                .orders
                .count_by_statuses(&[OrderStatus::Returned])
                .await?,
            active_users: repo.users.count_by_status(UserStatus::Active).await?,
            top_books: repo
                .orders
                .top_books(self.config.top_books_limit)
                .await?
                .into_iter()
                .map(BookStatsView::from)
                .collect(),
            top_users: repo.orders.top_users(self.config.top_users_limit).await?,
        })
    }
}
