//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, catalog, health, librarian, orders};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library catalog, inventory and borrowing orders REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Catalog
        catalog::list_books,
        catalog::get_book,
        // Reader orders
        orders::list_my_orders,
        orders::create_order,
        orders::cancel_order,
        // Librarian
        librarian::list_orders,
        librarian::confirm_order,
        librarian::return_order,
        librarian::list_books,
        librarian::get_book,
        librarian::list_readers,
        // Admin
        admin::list_users,
        admin::get_user,
        admin::update_user,
        admin::delete_user,
        admin::toggle_user_status,
        admin::list_books,
        admin::create_book,
        admin::get_book,
        admin::update_book,
        admin::delete_book,
        admin::next_inventory_number,
        admin::create_copy,
        admin::update_copy,
        admin::delete_copy,
        admin::get_reports,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::User,
            crate::models::user::UserSummary,
            crate::models::user::Role,
            crate::models::user::UserStatus,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateUser,
            crate::models::user::ReaderOrders,
            // Books
            crate::models::book::Book,
            crate::models::book::BookInput,
            crate::models::book::SearchField,
            crate::models::book::BookDetail,
            crate::models::book::BookWithCopies,
            crate::models::book::CopyHolding,
            crate::models::book::BookHoldings,
            // Copies
            crate::models::copy::BookCopy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CreateBookCopy,
            crate::models::copy::UpdateBookCopy,
            admin::InventoryNumberResponse,
            // Orders
            crate::models::order::OrderType,
            crate::models::order::OrderStatus,
            crate::models::order::OrderDetails,
            crate::models::order::OrderView,
            crate::models::order::CreateOrderRequest,
            crate::models::order::ConfirmOrderRequest,
            orders::OrderResponse,
            // Reports
            crate::models::stats::BookStats,
            crate::models::stats::BookStatsView,
            crate::models::stats::UserStats,
            crate::models::stats::ReportDashboard,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "catalog", description = "Public book catalog"),
        (name = "orders", description = "Reader borrowing orders"),
        (name = "librarian", description = "Order processing and inventory lookup"),
        (name = "admin", description = "Users, books, copies and reports")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_role_areas() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/books"));
        assert!(paths.contains_key("/orders/{id}/cancel"));
        assert!(paths.contains_key("/librarian/orders/{id}/confirm"));
        assert!(paths.contains_key("/admin/reports"));

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
