//! API handlers for the library REST endpoints

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod librarian;
pub mod openapi;
pub mod orders;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Extractor for endpoints open to anonymous visitors that personalise
/// their response for signed-in users
pub struct OptionalUser(pub Option<UserClaims>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
                    .map_err(|e| AppError::Authentication(e.to_string()))?;
                Ok(OptionalUser(Some(claims)))
            }
            None => Ok(OptionalUser(None)),
        }
    }
}

/// Token of the `Authorization: Bearer` header, if any
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Public catalog
        .route("/books", get(catalog::list_books))
        .route("/books/:id", get(catalog::get_book))
        // Reader orders
        .route("/orders", get(orders::list_my_orders).post(orders::create_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        // Librarian
        .route("/librarian/orders", get(librarian::list_orders))
        .route("/librarian/orders/:id/confirm", post(librarian::confirm_order))
        .route("/librarian/orders/:id/return", post(librarian::return_order))
        .route("/librarian/books", get(librarian::list_books))
        .route("/librarian/books/:id", get(librarian::get_book))
        .route("/librarian/readers", get(librarian::list_readers))
        // Admin: users
        .route("/admin/users", get(admin::list_users))
        .route(
            "/admin/users/:id",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/users/:id/toggle-status", post(admin::toggle_user_status))
        // Admin: books and copies
        .route("/admin/books", get(admin::list_books).post(admin::create_book))
        .route(
            "/admin/books/:id",
            get(admin::get_book)
                .put(admin::update_book)
                .delete(admin::delete_book),
        )
        .route(
            "/admin/books/:id/copies/next-inventory-number",
            get(admin::next_inventory_number),
        )
        .route("/admin/books/:id/copies", post(admin::create_copy))
        .route(
            "/admin/copies/:id",
            axum::routing::put(admin::update_copy).delete(admin::delete_copy),
        )
        // Admin: reports
        .route("/admin/reports", get(admin::get_reports))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
