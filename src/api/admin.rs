//! Administration endpoints: accounts, catalog, inventory and reports

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        book::{BookQuery, BookWithCopies},
        copy::{CreateBookCopy, UpdateBookCopy},
        page::PageQuery,
        user::UpdateUser,
        Book, BookCopy, BookInput, Page, ReportDashboard, User,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Suggested inventory number for a new copy
#[derive(Serialize, ToSchema)]
pub struct InventoryNumberResponse {
    pub inventory_number: String,
}

/// List users other than the caller
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Users", body = Page<User>),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<User>>> {
    claims.require_admin()?;

    let users = state
        .services
        .users
        .list_users(claims.username(), query.request())
        .await?;
    Ok(Json(users))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Update email, role, status and password
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.update_user(id, request).await?;
    Ok(Json(user))
}

/// Delete user
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has active orders")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Switch a user between ACTIVE and BLOCKED
#[utoipa::path(
    post,
    path = "/admin/users/{id}/toggle-status",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Status switched", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn toggle_user_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.toggle_status(id).await?;
    Ok(Json(user))
}

/// Search books by title, author and genre
#[utoipa::path(
    get,
    path = "/admin/books",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Books", body = Page<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Page<Book>>> {
    claims.require_admin()?;

    let books = state
        .services
        .books
        .search(&query.filter(), query.page())
        .await?;
    Ok(Json(books))
}

/// Create book
#[utoipa::path(
    post,
    path = "/admin/books",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    let created = state.services.books.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Book with its copies
#[utoipa::path(
    get,
    path = "/admin/books/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookWithCopies),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BookWithCopies>> {
    claims.require_admin()?;

    let book = state.services.books.get_with_copies(id).await?;
    Ok(Json(book))
}

/// Update book
#[utoipa::path(
    put,
    path = "/admin/books/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(book): Json<BookInput>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let updated = state.services.books.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete book with its copies
#[utoipa::path(
    delete,
    path = "/admin/books/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "A copy has an active order")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.books.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Next inventory number for a book
#[utoipa::path(
    get,
    path = "/admin/books/{id}/copies/next-inventory-number",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Suggested inventory number", body = InventoryNumberResponse)
    )
)]
pub async fn next_inventory_number(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
) -> AppResult<Json<InventoryNumberResponse>> {
    claims.require_admin()?;

    let inventory_number = state
        .services
        .copies
        .generate_next_inventory_number(book_id)
        .await?;
    Ok(Json(InventoryNumberResponse { inventory_number }))
}

/// Add a copy to a book
#[utoipa::path(
    post,
    path = "/admin/books/{id}/copies",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = CreateBookCopy,
    responses(
        (status = 201, description = "Copy created", body = BookCopy),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Inventory number already exists"),
        (status = 422, description = "Status is managed by orders")
    )
)]
pub async fn create_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
    Json(request): Json<CreateBookCopy>,
) -> AppResult<(StatusCode, Json<BookCopy>)> {
    claims.require_admin()?;

    let copy = state.services.copies.create_copy(book_id, request).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Edit a copy
#[utoipa::path(
    put,
    path = "/admin/copies/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Copy ID")
    ),
    request_body = UpdateBookCopy,
    responses(
        (status = 200, description = "Copy updated", body = BookCopy),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy held by an active order or duplicate inventory number"),
        (status = 422, description = "Status is managed by orders")
    )
)]
pub async fn update_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(copy_id): Path<i64>,
    Json(request): Json<UpdateBookCopy>,
) -> AppResult<Json<BookCopy>> {
    claims.require_admin()?;

    let copy = state.services.copies.update_copy(copy_id, request).await?;
    Ok(Json(copy))
}

/// Delete a copy
#[utoipa::path(
    delete,
    path = "/admin/copies/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Copy ID")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy held by an active order")
    )
)]
pub async fn delete_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(copy_id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.copies.delete_copy(copy_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Circulation dashboard
#[utoipa::path(
    get,
    path = "/admin/reports",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Report dashboard", body = ReportDashboard)
    )
)]
pub async fn get_reports(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReportDashboard>> {
    claims.require_admin()?;

    let dashboard = state.services.reports.dashboard().await?;
    Ok(Json(dashboard))
}
