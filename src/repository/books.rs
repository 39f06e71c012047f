//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, BookInput, PageRequest},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksRepository: Send + Sync {
    /// Filtered page of books ordered by id, with the total match count
    async fn search(&self, filter: &BookFilter, page: PageRequest) -> AppResult<(Vec<Book>, i64)>;

    async fn get_by_id(&self, id: i64) -> AppResult<Book>;

    async fn create(&self, book: &BookInput) -> AppResult<Book>;

    async fn update(&self, id: i64, book: &BookInput) -> AppResult<Book>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    async fn count(&self) -> AppResult<i64>;

    /// Whether any copy of the book carries a PENDING or ISSUED order
    async fn has_active_orders(&self, id: i64) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const BOOK_COLUMNS: &str =
    "id, title, author_first_name, author_last_name, genre, description, cover_url";

const SEARCH_CONDITIONS: &str = r#"
    ($1::text IS NULL OR LOWER(title) LIKE '%' || LOWER($1) || '%')
    AND ($2::text IS NULL
         OR LOWER(author_first_name) LIKE '%' || LOWER($2) || '%'
         OR LOWER(author_last_name) LIKE '%' || LOWER($2) || '%')
    AND ($3::text IS NULL OR LOWER(genre) LIKE '%' || LOWER($3) || '%')
"#;

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn search(&self, filter: &BookFilter, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM books WHERE {}",
            SEARCH_CONDITIONS
        ))
        .bind(&filter.title)
        .bind(&filter.author)
        .bind(&filter.genre)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE {} ORDER BY id LIMIT $4 OFFSET $5",
            BOOK_COLUMNS, SEARCH_CONDITIONS
        ))
        .bind(&filter.title)
        .bind(&filter.author)
        .bind(&filter.genre)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn create(&self, book: &BookInput) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author_first_name, author_last_name, genre, description, cover_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author_first_name)
        .bind(&book.author_last_name)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(&book.cover_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, id: i64, book: &BookInput) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = $2, author_first_name = $3, author_last_name = $4,
                genre = $5, description = $6, cover_url = $7
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(&book.title)
        .bind(&book.author_first_name)
        .bind(&book.author_last_name)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(&book.cover_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn has_active_orders(&self, id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders o
                JOIN book_copies bc ON bc.id = o.copy_id
                WHERE bc.book_id = $1 AND o.order_status IN ('PENDING', 'ISSUED')
            )
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
