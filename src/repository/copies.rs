//! Book copies repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::conflict_on_duplicate;
use crate::{
    error::{AppError, AppResult},
    models::{BookCopy, CopyStatus, NewBookCopy},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CopiesRepository: Send + Sync {
    async fn count_available(&self, book_id: i64) -> AppResult<i64>;

    /// Copies of a book ordered by the numeric part of their inventory number
    async fn list_by_book(&self, book_id: i64) -> AppResult<Vec<BookCopy>>;

    async fn get_by_id(&self, id: i64) -> AppResult<BookCopy>;

    /// Any AVAILABLE copy of the book
    async fn find_available(&self, book_id: i64) -> AppResult<Option<BookCopy>>;

    /// Highest well-formed inventory number of the book, else its last one
    async fn last_inventory_number(&self, book_id: i64) -> AppResult<Option<String>>;

    async fn create(&self, copy: &NewBookCopy) -> AppResult<BookCopy>;

    async fn update(&self, id: i64, inventory_number: &str, status: CopyStatus) -> AppResult<BookCopy>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    async fn count_all(&self) -> AppResult<i64>;

    async fn count_by_status(&self, status: CopyStatus) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct PgCopiesRepository {
    pool: Pool<Postgres>,
}

impl PgCopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const COPY_SELECT: &str = r#"
    SELECT bc.id, bc.book_id, bc.inventory_number, bc.status, b.title AS book_title
    FROM book_copies bc
    JOIN books b ON b.id = bc.book_id
"#;

/// Well-formed `INV-nnnn` numbers sort numerically, anything else sorts last.
/// The digit cap keeps the cast within BIGINT.
const INVENTORY_ORDER: &str = r#"
    CASE WHEN bc.inventory_number ~ '^INV-[0-9]{1,18}$'
         THEN CAST(SUBSTRING(bc.inventory_number FROM 5) AS BIGINT)
    END
"#;

const DUPLICATE_INVENTORY: &str = "Inventory number already exists for this book";

#[async_trait]
impl CopiesRepository for PgCopiesRepository {
    async fn count_available(&self, book_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_copies WHERE book_id = $1 AND status = 'AVAILABLE'",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_by_book(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(&format!(
            "{} WHERE bc.book_id = $1 ORDER BY {} ASC NULLS LAST, bc.id",
            COPY_SELECT, INVENTORY_ORDER
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(&format!("{} WHERE bc.id = $1", COPY_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book copy with id {} not found", id)))
    }

    async fn find_available(&self, book_id: i64) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(&format!(
            "{} WHERE bc.book_id = $1 AND bc.status = 'AVAILABLE' ORDER BY bc.id LIMIT 1",
            COPY_SELECT
        ))
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(copy)
    }

    async fn last_inventory_number(&self, book_id: i64) -> AppResult<Option<String>> {
        let number: Option<String> = sqlx::query_scalar(&format!(
            r#"
            SELECT bc.inventory_number FROM book_copies bc
            WHERE bc.book_id = $1
            ORDER BY {} DESC NULLS LAST, bc.id DESC
            LIMIT 1
            "#,
            INVENTORY_ORDER
        ))
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(number)
    }

    async fn create(&self, copy: &NewBookCopy) -> AppResult<BookCopy> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO book_copies (book_id, inventory_number, status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(copy.book_id)
        .bind(&copy.inventory_number)
        .bind(copy.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE_INVENTORY))?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: i64, inventory_number: &str, status: CopyStatus) -> AppResult<BookCopy> {
        let result = sqlx::query(
            "UPDATE book_copies SET inventory_number = $2, status = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(inventory_number)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE_INVENTORY))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book copy with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_copies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book copy with id {} not found", id)));
        }

        Ok(())
    }

    async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_copies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_status(&self, status: CopyStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_copies WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;
    use crate::models::copy::MAX_INVENTORY_DIGITS;

    #[test]
    fn test_inventory_order_casts_only_bigint_sized_numbers() {
        let pattern = INVENTORY_ORDER.split('\'').nth(1).unwrap();
        let re = Regex::new(pattern).unwrap();

        assert!(re.is_match("INV-0001"));
        assert!(!re.is_match("INV-99999999999999999999"));
        assert!(!re.is_match("INV-"));

        let widest = format!("INV-{}", "9".repeat(MAX_INVENTORY_DIGITS));
        assert!(re.is_match(&widest));
        assert!(widest[4..].parse::<i64>().is_ok());
    }
}
