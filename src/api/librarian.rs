//! Librarian fulfilment endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{BookHoldings, BookQuery, BookWithCopies},
        order::ConfirmOrderRequest,
        page::PageQuery,
        OrderView, Page, ReaderOrders,
    },
    services::orders::today,
    AppState,
};

use super::AuthenticatedUser;

/// All orders, newest first
#[utoipa::path(
    get,
    path = "/librarian/orders",
    tag = "librarian",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Orders", body = Page<OrderView>),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<OrderView>>> {
    claims.require_librarian()?;

    let orders = state.services.orders.get_all_orders(query.request()).await?;
    Ok(Json(orders))
}

/// Issue the reserved copy of a pending order
#[utoipa::path(
    post,
    path = "/librarian/orders/{id}/confirm",
    tag = "librarian",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    request_body = ConfirmOrderRequest,
    responses(
        (status = 200, description = "Copy issued", body = OrderView),
        (status = 400, description = "Due date in the past"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order changed concurrently"),
        (status = 422, description = "Order is not pending")
    )
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(order_id): Path<i64>,
    Json(request): Json<ConfirmOrderRequest>,
) -> AppResult<Json<OrderView>> {
    claims.require_librarian()?;

    let order = state
        .services
        .orders
        .confirm_order_issue(order_id, request.due_date)
        .await?;
    Ok(Json(OrderView::new(order, today())))
}

/// Record the return of an issued copy
#[utoipa::path(
    post,
    path = "/librarian/orders/{id}/return",
    tag = "librarian",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = OrderView),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Order is not issued")
    )
)]
pub async fn return_order(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> AppResult<Json<OrderView>> {
    claims.require_librarian()?;

    let order = state.services.orders.mark_as_returned(order_id).await?;
    Ok(Json(OrderView::new(order, today())))
}

/// Books with their copies
#[utoipa::path(
    get,
    path = "/librarian/books",
    tag = "librarian",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Books with copies", body = Page<BookWithCopies>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Page<BookWithCopies>>> {
    claims.require_librarian()?;

    let books = state
        .services
        .books
        .search_with_copies(&query.filter(), query.page())
        .await?;
    Ok(Json(books))
}

/// Copies of a book and who holds them
#[utoipa::path(
    get,
    path = "/librarian/books/{id}",
    tag = "librarian",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book holdings", body = BookHoldings),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
) -> AppResult<Json<BookHoldings>> {
    claims.require_librarian()?;

    let holdings = state.services.copies.get_holdings(book_id).await?;
    Ok(Json(holdings))
}

/// Readers with pending or issued orders
#[utoipa::path(
    get,
    path = "/librarian/readers",
    tag = "librarian",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Readers and their active orders", body = Vec<ReaderOrders>)
    )
)]
pub async fn list_readers(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReaderOrders>>> {
    claims.require_librarian()?;

    let readers = state.services.users.get_readers_with_active_orders().await?;
    Ok(Json(readers))
}
