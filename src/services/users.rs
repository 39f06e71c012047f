//! Authentication and user management service

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{RegisterUser, UpdateUser},
        NewUser, Page, PageRequest, ReaderOrders, Role, User, UserChanges, UserClaims, UserStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new reader account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;

        let username = request.username.trim();
        if username.is_empty() || request.password.trim().is_empty() {
            return Err(AppError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        if let Some(existing) = self.repository.users.find_by_username(username).await? {
            tracing::warn!("Registration of {} clashes with {}", username, existing.username);
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                username: username.to_string(),
                email: request.email.trim().to_string(),
                password_hash: self.hash_password(&request.password)?,
                role: Role::Reader,
                status: UserStatus::Active,
            })
            .await?;

        tracing::info!("User {} registered", user.username);
        Ok(user)
    }

    /// Authenticate user by username and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            tracing::warn!("Failed login for {}", username);
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        if !user.is_active() {
            return Err(AppError::Authentication("User is not active".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create the configured administrator when no ADMIN account exists
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let (Some(username), Some(password)) = (
            self.config.bootstrap_admin_username.as_deref(),
            self.config.bootstrap_admin_password.as_deref(),
        ) else {
            return Ok(());
        };

        if self.repository.users.count_by_role(Role::Admin).await? > 0 {
            return Ok(());
        }

        let admin = self
            .repository
            .users
            .create(&NewUser {
                username: username.to_string(),
                email: format!("{}@localhost", username),
                password_hash: self.hash_password(password)?,
                role: Role::Admin,
                status: UserStatus::Active,
            })
            .await?;

        tracing::warn!(
            "Created bootstrap administrator '{}'; change its password",
            admin.username
        );
        Ok(())
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<User> {
        self.repository
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Every user except `exclude_username`
    pub async fn list_users(&self, exclude_username: &str, page: PageRequest) -> AppResult<Page<User>> {
        let (users, total) = self.repository.users.list(exclude_username, page).await?;
        Ok(Page::new(users, total, page))
    }

    pub async fn count_by_status(&self, status: UserStatus) -> AppResult<i64> {
        self.repository.users.count_by_status(status).await
    }

    /// Update email, role, status and optionally the password
    pub async fn update_user(&self, id: i64, request: UpdateUser) -> AppResult<User> {
        request.validate()?;

        let password_hash = match request.new_password() {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        let user = self
            .repository
            .users
            .update(
                id,
                &UserChanges {
                    email: request.email.trim().to_string(),
                    role: request.role,
                    status: request.status,
                    password_hash,
                },
            )
            .await?;

        tracing::info!("User {} updated", user.username);
        Ok(user)
    }

    /// Flip ACTIVE and BLOCKED
    pub async fn toggle_status(&self, id: i64) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id).await?;
        let updated = self
            .repository
            .users
            .set_status(id, user.status.toggled())
            .await?;

        tracing::info!("User {} is now {}", updated.username, updated.status);
        Ok(updated)
    }

    /// Delete a user together with their order history
    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        let user = self.repository.users.get_by_id(id).await?;

        if self.repository.orders.count_active_for_user(id).await? > 0 {
            tracing::warn!("Refusing to delete user {} with active orders", user.username);
            return Err(AppError::Conflict(format!(
                "User {} has pending or issued orders",
                user.username
            )));
        }

        self.repository.users.delete(id).await?;
        tracing::info!("User {} deleted", user.username);

        Ok(())
    }

    /// Readers with their PENDING and ISSUED orders, by username
    pub async fn get_readers_with_active_orders(&self) -> AppResult<Vec<ReaderOrders>> {
        let users = self.repository.users.list_with_active_orders().await?;
        let mut orders_by_user: HashMap<i64, Vec<_>> = HashMap::new();
        for order in self.repository.orders.list_active().await? {
            orders_by_user.entry(order.user_id).or_default().push(order);
        }

        Ok(users
            .into_iter()
            .map(|user| ReaderOrders {
                orders: orders_by_user.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{OrderStatus, UserSummary},
        repository::{
            books::MockBooksRepository, copies::MockCopiesRepository,
            orders::MockOrdersRepository, users::MockUsersRepository,
        },
        services::fixtures::{order, reader},
    };

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 1,
            bootstrap_admin_username: Some("admin".to_string()),
            bootstrap_admin_password: Some("admin".to_string()),
        }
    }

    fn service(users: MockUsersRepository, orders: MockOrdersRepository) -> UsersService {
        UsersService::new(
            Repository::mocked(
                MockBooksRepository::new(),
                MockCopiesRepository::new(),
                orders,
                users,
            ),
            config(),
        )
    }

    fn with_password(mut user: User, password: &str) -> User {
        let hasher = service(MockUsersRepository::new(), MockOrdersRepository::new());
        user.password = hasher.hash_password(password).unwrap();
        user
    }

    #[tokio::test]
    async fn test_register_creates_active_reader() {
        let mut users = MockUsersRepository::new();
        users.expect_find_by_username().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|u: &NewUser| {
                u.username == "alice"
                    && u.role == Role::Reader
                    && u.status == UserStatus::Active
                    && u.password_hash.starts_with("$argon2")
            })
            .returning(|u| Ok(reader(1, &u.username)));

        let user = service(users, MockOrdersRepository::new())
            .register(RegisterUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let mut users = MockUsersRepository::new();
        users.expect_find_by_username().returning(|_| Ok(None));
        users
            .expect_create()
            .returning(|_| Err(AppError::Conflict("Username already exists".to_string())));

        let err = service(users, MockOrdersRepository::new())
            .register(RegisterUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(msg) if msg == "Username already exists"));
    }

    #[tokio::test]
    async fn test_register_rejects_case_variant_of_existing_username() {
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .withf(|username| username == "alice")
            .returning(|_| Ok(Some(reader(1, "Alice"))));
        users.expect_create().never();

        let err = service(users, MockOrdersRepository::new())
            .register(RegisterUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(msg) if msg == "Username already exists"));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let err = service(MockUsersRepository::new(), MockOrdersRepository::new())
            .register(RegisterUser {
                username: "alice".to_string(),
                email: "not-an-email".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authenticate_issues_token_with_role() {
        let stored = with_password(reader(1, "alice"), "secret");
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));

        let (token, user) = service(users, MockOrdersRepository::new())
            .authenticate("alice", "secret")
            .await
            .unwrap();

        let claims = UserClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Reader);
        assert_eq!(user.id, 1);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let stored = with_password(reader(1, "alice"), "secret");
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));

        let err = service(users, MockOrdersRepository::new())
            .authenticate("alice", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_authenticate_blocked_user() {
        let mut stored = with_password(reader(1, "alice"), "secret");
        stored.status = UserStatus::Blocked;
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));

        let err = service(users, MockOrdersRepository::new())
            .authenticate("alice", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Authentication(msg) if msg == "User is not active"));
    }

    #[tokio::test]
    async fn test_toggle_status_blocks_active_user() {
        let mut users = MockUsersRepository::new();
        users
            .expect_get_by_id()
            .returning(|id| Ok(reader(id, "alice")));
        users
            .expect_set_status()
            .withf(|_, status| *status == UserStatus::Blocked)
            .returning(|id, status| {
                let mut user = reader(id, "alice");
                user.status = status;
                Ok(user)
            });

        let user = service(users, MockOrdersRepository::new())
            .toggle_status(1)
            .await
            .unwrap();
        assert_eq!(user.status, UserStatus::Blocked);
    }

    #[tokio::test]
    async fn test_update_with_blank_password_keeps_hash() {
        let mut users = MockUsersRepository::new();
        users
            .expect_update()
            .withf(|_, changes: &UserChanges| {
                changes.password_hash.is_none() && changes.role == Role::Librarian
            })
            .returning(|id, changes| {
                let mut user = reader(id, "alice");
                user.role = changes.role;
                Ok(user)
            });

        let user = service(users, MockOrdersRepository::new())
            .update_user(
                1,
                UpdateUser {
                    email: "alice@example.com".to_string(),
                    role: Role::Librarian,
                    status: UserStatus::Active,
                    password: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(user.role, Role::Librarian);
    }

    #[tokio::test]
    async fn test_delete_user_with_active_orders_is_refused() {
        let mut users = MockUsersRepository::new();
        users
            .expect_get_by_id()
            .returning(|id| Ok(reader(id, "alice")));
        users.expect_delete().never();
        let mut orders = MockOrdersRepository::new();
        orders.expect_count_active_for_user().returning(|_| Ok(1));

        let err = service(users, orders).delete_user(1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_ensure_admin_skips_when_admin_exists() {
        let mut users = MockUsersRepository::new();
        users.expect_count_by_role().returning(|_| Ok(1));
        users.expect_create().never();

        service(users, MockOrdersRepository::new())
            .ensure_admin()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_admin() {
        let mut users = MockUsersRepository::new();
        users.expect_count_by_role().returning(|_| Ok(0));
        users
            .expect_create()
            .withf(|u: &NewUser| u.username == "admin" && u.role == Role::Admin)
            .times(1)
            .returning(|u| {
                let mut user = reader(1, &u.username);
                user.role = Role::Admin;
                Ok(user)
            });

        service(users, MockOrdersRepository::new())
            .ensure_admin()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_readers_grouped_with_their_orders() {
        let mut users = MockUsersRepository::new();
        users.expect_list_with_active_orders().returning(|| {
            Ok(vec![UserSummary {
                id: 3,
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
            }])
        });
        let mut orders = MockOrdersRepository::new();
        orders.expect_list_active().returning(|| {
            Ok(vec![
                order(1, OrderStatus::Pending),
                order(2, OrderStatus::Issued),
            ])
        });

        let readers = service(users, orders)
            .get_readers_with_active_orders()
            .await
            .unwrap();

        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].user.username, "alice");
        assert_eq!(readers[0].orders.len(), 2);
    }
}
