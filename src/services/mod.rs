//! Business logic services

pub mod books;
pub mod copies;
pub mod orders;
pub mod reports;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub copies: copies::CopiesService,
    pub orders: orders::OrdersService,
    pub users: users::UsersService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            books: books::BooksService::new(repository.clone()),
            copies: copies::CopiesService::new(repository.clone()),
            orders: orders::OrdersService::new(repository.clone(), config.orders.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            reports: reports::ReportsService::new(repository, config.reports.clone()),
        }
    }
}
