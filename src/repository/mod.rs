//! Repository layer for database operations
//!
//! Each aggregate has a trait describing its queries and a PostgreSQL
//! implementation. Services only see the traits, which lets unit tests
//! substitute mocks.

pub mod books;
pub mod copies;
pub mod orders;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::{is_unique_violation, AppError};

pub use books::{BooksRepository, PgBooksRepository};
pub use copies::{CopiesRepository, PgCopiesRepository};
pub use orders::{OrdersRepository, PgOrdersRepository};
pub use users::{PgUsersRepository, UsersRepository};

/// Main repository struct holding one handle per aggregate
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BooksRepository>,
    pub copies: Arc<dyn CopiesRepository>,
    pub orders: Arc<dyn OrdersRepository>,
    pub users: Arc<dyn UsersRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(PgBooksRepository::new(pool.clone())),
            copies: Arc::new(PgCopiesRepository::new(pool.clone())),
            orders: Arc::new(PgOrdersRepository::new(pool.clone())),
            users: Arc::new(PgUsersRepository::new(pool)),
        }
    }
}

/// Maps a unique constraint violation to a Conflict carrying `message`
pub(crate) fn conflict_on_duplicate(err: sqlx::Error, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(err)
    }
}

#[cfg(test)]
impl Repository {
    /// Repository backed by mocks, one per aggregate
    pub(crate) fn mocked(
        books: books::MockBooksRepository,
        copies: copies::MockCopiesRepository,
        orders: orders::MockOrdersRepository,
        users: users::MockUsersRepository,
    ) -> Self {
        Self {
            books: Arc::new(books),
            copies: Arc::new(copies),
            orders: Arc::new(orders),
            users: Arc::new(users),
        }
    }
}
