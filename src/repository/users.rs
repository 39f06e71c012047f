//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::conflict_on_duplicate;
use crate::{
    error::{AppError, AppResult},
    models::{NewUser, PageRequest, Role, User, UserChanges, UserStatus, UserSummary},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> AppResult<User>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn create(&self, user: &NewUser) -> AppResult<User>;

    async fn update(&self, id: i64, changes: &UserChanges) -> AppResult<User>;

    async fn set_status(&self, id: i64, status: UserStatus) -> AppResult<User>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    /// Users ordered by id, skipping `exclude_username`
    async fn list(&self, exclude_username: &str, page: PageRequest) -> AppResult<(Vec<User>, i64)>;

    /// Users holding at least one PENDING or ISSUED order
    async fn list_with_active_orders(&self) -> AppResult<Vec<UserSummary>>;

    async fn count_by_status(&self, status: UserStatus) -> AppResult<i64>;

    async fn count_by_role(&self, role: Role) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct PgUsersRepository {
    pool: Pool<Postgres>,
}

impl PgUsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.password, u.status, r.name AS role
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User with id {} not found", id))
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn get_by_id(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("{} WHERE u.id = $1", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{} WHERE LOWER(u.username) = LOWER($1)",
            USER_SELECT
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password, status, role_id)
            VALUES ($1, $2, $3, $4, (SELECT id FROM roles WHERE name = $5))
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Username already exists"))?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2,
                role_id = (SELECT id FROM roles WHERE name = $3),
                status = $4,
                password = COALESCE($5, password)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(changes.role)
        .bind(changes.status)
        .bind(&changes.password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        self.get_by_id(id).await
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn list(&self, exclude_username: &str, page: PageRequest) -> AppResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE LOWER(username) <> LOWER($1)",
        )
        .bind(exclude_username)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "{} WHERE LOWER(u.username) <> LOWER($1) ORDER BY u.id LIMIT $2 OFFSET $3",
            USER_SELECT
        ))
        .bind(exclude_username)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    async fn list_with_active_orders(&self) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT DISTINCT u.id, u.username, u.email
            FROM users u
            JOIN orders o ON o.user_id = u.id
            WHERE o.order_status IN ('PENDING', 'ISSUED')
            ORDER BY u.username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn count_by_status(&self, status: UserStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_role(&self, role: Role) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE r.name = $1
            "#,
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
