//! Public catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{BookDetail, CatalogQuery},
        Book, Page,
    },
    AppState,
};

use super::OptionalUser;

/// Search the catalog by title, author or genre
#[utoipa::path(
    get,
    path = "/books",
    tag = "catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Matching books", body = Page<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Page<Book>>> {
    let books = state
        .services
        .books
        .search(&query.filter(), query.page())
        .await?;
    Ok(Json(books))
}

/// Book page with availability
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "catalog",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BookDetail>> {
    let detail = state
        .services
        .books
        .get_book_detail(id, viewer.as_ref())
        .await?;
    Ok(Json(detail))
}
