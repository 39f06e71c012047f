//! Orders repository for database operations
//!
//! Every write touches an order and its copy together inside one
//! transaction. Updates are conditional on the status the caller observed,
//! so a concurrent change surfaces as a Conflict instead of a lost update.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::conflict_on_duplicate;
use crate::{
    error::{AppError, AppResult},
    models::{BookStats, NewOrder, OrderDetails, OrderStatus, OrderTransition, PageRequest, UserStats},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> AppResult<OrderDetails>;

    /// Orders of one reader, newest first
    async fn list_by_username(&self, username: &str, page: PageRequest) -> AppResult<(Vec<OrderDetails>, i64)>;

    /// All orders, newest first
    async fn list_all(&self, page: PageRequest) -> AppResult<(Vec<OrderDetails>, i64)>;

    /// PENDING and ISSUED orders ordered by reader then newest first
    async fn list_active(&self) -> AppResult<Vec<OrderDetails>>;

    /// Inserts the order and reserves its copy; returns the new order id
    async fn create(&self, order: &NewOrder) -> AppResult<i64>;

    /// Moves the order and its copy to the target statuses
    async fn transition(&self, transition: &OrderTransition) -> AppResult<()>;

    /// Username of the reader with an active order on the copy
    async fn active_holder(&self, copy_id: i64) -> AppResult<Option<String>>;

    async fn has_active_order_for_book(&self, user_id: i64, book_id: i64) -> AppResult<bool>;

    async fn count_active_for_user(&self, user_id: i64) -> AppResult<i64>;

    async fn count_by_statuses(&self, statuses: &[OrderStatus]) -> AppResult<i64>;

    async fn top_books(&self, limit: i64) -> AppResult<Vec<BookStats>>;

    async fn top_users(&self, limit: i64) -> AppResult<Vec<UserStats>>;
}

#[derive(Clone)]
pub struct PgOrdersRepository {
    pool: Pool<Postgres>,
}

impl PgOrdersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.user_id, u.username, o.copy_id, bc.inventory_number,
           b.id AS book_id, b.title AS book_title,
           b.author_first_name, b.author_last_name,
           o.order_type, o.order_status AS status,
           o.issue_date, o.due_date, o.return_date
    FROM orders o
    JOIN users u ON u.id = o.user_id
    JOIN book_copies bc ON bc.id = o.copy_id
    JOIN books b ON b.id = bc.book_id
"#;

const NEWEST_FIRST: &str = "ORDER BY o.issue_date DESC, o.id DESC";

fn status_texts(statuses: &[OrderStatus]) -> Vec<&'static str> {
    statuses.iter().map(OrderStatus::as_str).collect()
}

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn get_by_id(&self, id: i64) -> AppResult<OrderDetails> {
        sqlx::query_as::<_, OrderDetails>(&format!("{} WHERE o.id = $1", ORDER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order with id {} not found", id)))
    }

    async fn list_by_username(&self, username: &str, page: PageRequest) -> AppResult<(Vec<OrderDetails>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE LOWER(u.username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        let orders = sqlx::query_as::<_, OrderDetails>(&format!(
            "{} WHERE LOWER(u.username) = LOWER($1) {} LIMIT $2 OFFSET $3",
            ORDER_SELECT, NEWEST_FIRST
        ))
        .bind(username)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((orders, total))
    }

    async fn list_all(&self, page: PageRequest) -> AppResult<(Vec<OrderDetails>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let orders = sqlx::query_as::<_, OrderDetails>(&format!(
            "{} {} LIMIT $1 OFFSET $2",
            ORDER_SELECT, NEWEST_FIRST
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((orders, total))
    }

    async fn list_active(&self) -> AppResult<Vec<OrderDetails>> {
        let orders = sqlx::query_as::<_, OrderDetails>(&format!(
            r#"
            {} WHERE o.order_status IN ('PENDING', 'ISSUED')
            ORDER BY u.username, o.issue_date DESC, o.id DESC
            "#,
            ORDER_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn create(&self, order: &NewOrder) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        let reserved = sqlx::query(
            "UPDATE book_copies SET status = $2 WHERE id = $1 AND status = 'AVAILABLE'",
        )
        .bind(order.copy_id)
        .bind(order.status.copy_status())
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "Copy {} is no longer available",
                order.copy_id
            )));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, copy_id, order_type, order_status, issue_date, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(order.user_id)
        .bind(order.copy_id)
        .bind(order.order_type)
        .bind(order.status)
        .bind(order.issue_date)
        .bind(order.due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Copy already has an active order"))?;

        tx.commit().await?;

        Ok(id)
    }

    async fn transition(&self, transition: &OrderTransition) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $3, due_date = $4, return_date = $5
            WHERE id = $1 AND order_status = $2
            "#,
        )
        .bind(transition.order_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.due_date)
        .bind(transition.return_date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "Order {} is no longer {}",
                transition.order_id, transition.from
            )));
        }

        sqlx::query("UPDATE book_copies SET status = $2 WHERE id = $1")
            .bind(transition.copy_id)
            .bind(transition.copy_status())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn active_holder(&self, copy_id: i64) -> AppResult<Option<String>> {
        let username: Option<String> = sqlx::query_scalar(
            r#"
            SELECT u.username FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.copy_id = $1 AND o.order_status IN ('PENDING', 'ISSUED')
            LIMIT 1
            "#,
        )
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(username)
    }

    async fn has_active_order_for_book(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders o
                JOIN book_copies bc ON bc.id = o.copy_id
                WHERE o.user_id = $1 AND bc.book_id = $2
                  AND o.order_status IN ('PENDING', 'ISSUED')
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_active_for_user(&self, user_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND order_status IN ('PENDING', 'ISSUED')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_by_statuses(&self, statuses: &[OrderStatus]) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_status = ANY($1)")
            .bind(status_texts(statuses))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn top_books(&self, limit: i64) -> AppResult<Vec<BookStats>> {
        let stats = sqlx::query_as::<_, BookStats>(
            r#"
            SELECT b.id AS book_id, b.title, b.author_first_name, b.author_last_name, b.genre,
                   COUNT(o.id) AS order_count
            FROM orders o
            JOIN book_copies bc ON bc.id = o.copy_id
            JOIN books b ON b.id = bc.book_id
            WHERE o.order_status IN ('ISSUED', 'RETURNED')
            GROUP BY b.id, b.title, b.author_first_name, b.author_last_name, b.genre
            ORDER BY order_count DESC, b.id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn top_users(&self, limit: i64) -> AppResult<Vec<UserStats>> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT u.id AS user_id, u.username, COUNT(o.id) AS order_count
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.order_status IN ('ISSUED', 'RETURNED') AND u.status = 'ACTIVE'
            GROUP BY u.id, u.username
            ORDER BY order_count DESC, u.id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }
}
