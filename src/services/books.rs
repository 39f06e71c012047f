//! Catalog service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookDetail, BookWithCopies},
        Book, BookFilter, BookInput, Page, PageRequest, UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search the catalog
    pub async fn search(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let (books, total) = self.repository.books.search(filter, page).await?;
        Ok(Page::new(books, total, page))
    }

    /// Search the catalog, attaching the copies of each book
    pub async fn search_with_copies(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> AppResult<Page<BookWithCopies>> {
        let (books, total) = self.repository.books.search(filter, page).await?;

        let mut items = Vec::with_capacity(books.len());
        for book in books {
            let copies = self.repository.copies.list_by_book(book.id).await?;
            items.push(BookWithCopies { book, copies });
        }

        Ok(Page::new(items, total, page))
    }

    pub async fn get_by_id(&self, book_id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(book_id).await
    }

    pub async fn get_with_copies(&self, book_id: i64) -> AppResult<BookWithCopies> {
        let book = self.repository.books.get_by_id(book_id).await?;
        let copies = self.repository.copies.list_by_book(book_id).await?;
        Ok(BookWithCopies { book, copies })
    }

    /// Public book page, personalised when a reader is signed in
    pub async fn get_book_detail(
        &self,
        book_id: i64,
        viewer: Option<&UserClaims>,
    ) -> AppResult<BookDetail> {
        let book = self.repository.books.get_by_id(book_id).await?;
        let available_copies = self.repository.copies.count_available(book_id).await?;

        let mut detail = BookDetail {
            book,
            available_copies,
            has_active_order: false,
            user_status: None,
        };

        if let Some(claims) = viewer {
            if let Some(user) = self
                .repository
                .users
                .find_by_username(claims.username())
                .await?
            {
                detail.has_active_order = self
                    .repository
                    .orders
                    .has_active_order_for_book(user.id, book_id)
                    .await?;
                detail.user_status = Some(user.status);
            }
        }

        Ok(detail)
    }

    pub async fn create_book(&self, book: BookInput) -> AppResult<Book> {
        book.validate()?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!("Book {} created: {}", created.id, created.title);
        Ok(created)
    }

    pub async fn update_book(&self, book_id: i64, book: BookInput) -> AppResult<Book> {
        book.validate()?;
        self.repository.books.update(book_id, &book).await
    }

    /// Delete a book with its copies and their order history
    pub async fn delete_book(&self, book_id: i64) -> AppResult<()> {
        let book = self.repository.books.get_by_id(book_id).await?;

        if self.repository.books.has_active_orders(book_id).await? {
            tracing::warn!("Refusing to delete book {} with active orders", book_id);
            return Err(AppError::Conflict(format!(
                "Book '{}' has pending or issued orders",
                book.title
            )));
        }

        self.repository.books.delete(book_id).await?;
        tracing::info!("Book {} deleted", book_id);

        Ok(())
    }

    pub async fn count_books(&self) -> AppResult<i64> {
        self.repository.books.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Role, UserStatus},
        repository::{
            books::MockBooksRepository, copies::MockCopiesRepository,
            orders::MockOrdersRepository, users::MockUsersRepository,
        },
        services::fixtures::{book, reader},
    };

    #[tokio::test]
    async fn test_detail_for_anonymous_viewer() {
        let mut books = MockBooksRepository::new();
        books.expect_get_by_id().returning(|id| Ok(book(id)));
        let mut copies = MockCopiesRepository::new();
        copies.expect_count_available().returning(|_| Ok(3));

        let service = BooksService::new(Repository::mocked(
            books,
            copies,
            MockOrdersRepository::new(),
            MockUsersRepository::new(),
        ));
        let detail = service.get_book_detail(1, None).await.unwrap();

        assert_eq!(detail.available_copies, 3);
        assert!(!detail.has_active_order);
        assert_eq!(detail.user_status, None);
    }

    #[tokio::test]
    async fn test_detail_for_signed_in_reader() {
        let mut books = MockBooksRepository::new();
        books.expect_get_by_id().returning(|id| Ok(book(id)));
        let mut copies = MockCopiesRepository::new();
        copies.expect_count_available().returning(|_| Ok(0));
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(reader(3, "alice"))));
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_has_active_order_for_book()
            .withf(|user_id, book_id| *user_id == 3 && *book_id == 1)
            .returning(|_, _| Ok(true));

        let claims = UserClaims {
            sub: "alice".to_string(),
            user_id: 3,
            role: Role::Reader,
            exp: 0,
            iat: 0,
        };
        let service = BooksService::new(Repository::mocked(books, copies, orders, users));
        let detail = service.get_book_detail(1, Some(&claims)).await.unwrap();

        assert!(detail.has_active_order);
        assert_eq!(detail.user_status, Some(UserStatus::Active));
    }

    #[tokio::test]
    async fn test_delete_book_with_active_orders_is_refused() {
        let mut books = MockBooksRepository::new();
        books.expect_get_by_id().returning(|id| Ok(book(id)));
        books.expect_has_active_orders().returning(|_| Ok(true));
        books.expect_delete().never();

        let service = BooksService::new(Repository::mocked(
            books,
            MockCopiesRepository::new(),
            MockOrdersRepository::new(),
            MockUsersRepository::new(),
        ));
        let err = service.delete_book(1).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_book_requires_title() {
        let service = BooksService::new(Repository::mocked(
            MockBooksRepository::new(),
            MockCopiesRepository::new(),
            MockOrdersRepository::new(),
            MockUsersRepository::new(),
        ));
        let input = BookInput {
            title: String::new(),
            author_first_name: None,
            author_last_name: None,
            genre: None,
            description: None,
            cover_url: None,
        };

        assert!(matches!(
            service.create_book(input).await,
            Err(AppError::Validation(_))
        ));
    }
}
