//! Reader order endpoints

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
        order::CreateOrderRequest,
        page::PageQuery,
        OrderView, Page,
    },
    services::orders::today,
    AppState,
};

use super::AuthenticatedUser;

/// Order response with a status message
#[derive(Serialize, ToSchema)]
pub struct OrderResponse {
    pub order: OrderView,
    pub message: String,
}

/// Orders of the signed-in reader
#[utoipa::path(
    get,
    path = "/orders",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Reader's orders, newest first", body = Page<OrderView>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a reader")
    )
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<OrderView>>> {
    claims.require_reader()?;

    let orders = state
        .services
        .orders
        .get_orders_by_username(claims.username(), query.request())
        .await?;
    Ok(Json(orders))
}

/// Request a book for home or reading-room use
#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    security(("bearer_auth" = [])),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Copy reserved", body = OrderResponse),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "Active order already exists for this book"),
        (status = 422, description = "No available copies or user not active")
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderResponse>)> {
    claims.require_reader()?;

    let order = state
        .services
        .orders
        .create_order(request.book_id, claims.username(), request.order_type)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            order: OrderView::new(order, today()),
            message: "Order created successfully".to_string(),
        }),
    ))
}

/// Cancel one of the reader's pending orders
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order canceled", body = OrderResponse),
        (status = 403, description = "Order belongs to another reader"),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Order is not pending")
    )
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> AppResult<Json<OrderResponse>> {
    claims.require_reader()?;

    let order = state
        .services
        .orders
        .cancel_order(order_id, claims.username())
        .await?;

    Ok(Json(OrderResponse {
        order: OrderView::new(order, today()),
        message: "Order canceled".to_string(),
    }))
}
