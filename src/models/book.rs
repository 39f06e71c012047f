//! Book (catalog title) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    copy::BookCopy,
    page::{PageRequest, CATALOG_PER_PAGE, LIST_PER_PAGE},
    user::UserStatus,
};

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// Create or update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    #[validate(url(message = "Invalid cover URL"))]
    pub cover_url: Option<String>,
}

/// Case-insensitive substring filters applied to the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

impl BookFilter {
    /// Builds a filter, dropping blank values
    pub fn new(title: Option<String>, author: Option<String>, genre: Option<String>) -> Self {
        Self {
            title: non_blank(title),
            author: non_blank(author),
            genre: non_blank(genre),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Field searched by the public catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Author,
    Genre,
}

/// Public catalog query: one field, one search string
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    pub field: Option<SearchField>,
    pub query: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CatalogQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, CATALOG_PER_PAGE)
    }

    pub fn filter(&self) -> BookFilter {
        let query = self.query.clone();
        match self.field {
            Some(SearchField::Title) => BookFilter::new(query, None, None),
            Some(SearchField::Author) => BookFilter::new(None, query, None),
            Some(SearchField::Genre) => BookFilter::new(None, None, query),
            None => BookFilter::default(),
        }
    }
}

/// Administrative book list query with independent filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, LIST_PER_PAGE)
    }

    pub fn filter(&self) -> BookFilter {
        BookFilter::new(self.title.clone(), self.author.clone(), self.genre.clone())
    }
}

/// Public book page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
    pub available_copies: i64,
    /// Whether the viewing user already holds a PENDING or ISSUED order for this book
    pub has_active_order: bool,
    /// Status of the viewing user, when authenticated
    pub user_status: Option<UserStatus>,
}

/// Book with its physical copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookWithCopies {
    pub book: Book,
    pub copies: Vec<BookCopy>,
}

/// Copy annotated with the reader currently holding or having reserved it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CopyHolding {
    pub copy: BookCopy,
    pub held_by: Option<String>,
}

/// Librarian view of a book
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookHoldings {
    pub book: Book,
    pub copies: Vec<CopyHolding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_query_selects_single_field() {
        let query = CatalogQuery {
            field: Some(SearchField::Author),
            query: Some("Tolkien".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.filter(),
            BookFilter {
                title: None,
                author: Some("Tolkien".to_string()),
                genre: None,
            }
        );
    }

    #[test]
    fn test_catalog_query_without_field_is_unfiltered() {
        let query = CatalogQuery {
            query: Some("anything".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter(), BookFilter::default());
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let filter = BookFilter::new(Some("  ".to_string()), Some(" Orwell ".to_string()), None);
        assert_eq!(filter.title, None);
        assert_eq!(filter.author.as_deref(), Some("Orwell"));
    }
}
