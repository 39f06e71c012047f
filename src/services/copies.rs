//! Physical copy inventory service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookHoldings, CopyHolding},
        copy::{next_inventory_number, CreateBookCopy, UpdateBookCopy},
        BookCopy, CopyStatus, NewBookCopy,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CopiesService {
    repository: Repository,
}

impl CopiesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_available_copies_count(&self, book_id: i64) -> AppResult<i64> {
        self.repository.copies.count_available(book_id).await
    }

    pub async fn get_all_by_book_id(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        self.repository.copies.list_by_book(book_id).await
    }

    pub async fn get_by_id(&self, copy_id: i64) -> AppResult<BookCopy> {
        self.repository.copies.get_by_id(copy_id).await
    }

    pub async fn count_all(&self) -> AppResult<i64> {
        self.repository.copies.count_all().await
    }

    pub async fn count_by_status(&self, status: CopyStatus) -> AppResult<i64> {
        self.repository.copies.count_by_status(status).await
    }

    /// Inventory number following the book's last one
    pub async fn generate_next_inventory_number(&self, book_id: i64) -> AppResult<String> {
        let last = self.repository.copies.last_inventory_number(book_id).await?;
        Ok(next_inventory_number(last.as_deref()))
    }

    /// Copies of a book with the reader holding each of them
    pub async fn get_holdings(&self, book_id: i64) -> AppResult<BookHoldings> {
        let book = self.repository.books.get_by_id(book_id).await?;
        let copies = self.repository.copies.list_by_book(book_id).await?;

        let mut holdings = Vec::with_capacity(copies.len());
        for copy in copies {
            let held_by = if copy.status.is_order_driven() {
                self.repository.orders.active_holder(copy.id).await?
            } else {
                None
            };
            holdings.push(CopyHolding { copy, held_by });
        }

        Ok(BookHoldings {
            book,
            copies: holdings,
        })
    }

    /// Add a copy to a book
    pub async fn create_copy(&self, book_id: i64, request: CreateBookCopy) -> AppResult<BookCopy> {
        request.validate()?;

        self.repository.books.get_by_id(book_id).await?;

        let status = request.status.unwrap_or(CopyStatus::Available);
        ensure_manual_status(status)?;

        let inventory_number = match request
            .inventory_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            Some(number) => number.to_string(),
            None => self.generate_next_inventory_number(book_id).await?,
        };

        let copy = self
            .repository
            .copies
            .create(&NewBookCopy {
                book_id,
                inventory_number,
                status,
            })
            .await?;

        tracing::info!(
            "Copy {} ({}) added to book {}",
            copy.id,
            copy.inventory_number,
            book_id
        );

        Ok(copy)
    }

    /// Edit a copy's inventory number and status
    pub async fn update_copy(
        &self,
        copy_id: i64,
        mut request: UpdateBookCopy,
    ) -> AppResult<BookCopy> {
        request.inventory_number = request.inventory_number.trim().to_string();
        request.validate()?;

        let copy = self.repository.copies.get_by_id(copy_id).await?;
        self.ensure_not_held(&copy).await?;
        ensure_manual_status(request.status)?;

        self.repository
            .copies
            .update(copy_id, &request.inventory_number, request.status)
            .await
    }

    pub async fn delete_copy(&self, copy_id: i64) -> AppResult<()> {
        let copy = self.repository.copies.get_by_id(copy_id).await?;
        self.ensure_not_held(&copy).await?;

        self.repository.copies.delete(copy_id).await?;
        tracing::info!("Copy {} ({}) deleted", copy.id, copy.inventory_number);

        Ok(())
    }

    async fn ensure_not_held(&self, copy: &BookCopy) -> AppResult<()> {
        match self.repository.orders.active_holder(copy.id).await? {
            Some(username) => {
                tracing::warn!("Copy {} is held by an active order of {}", copy.id, username);
                Err(AppError::Conflict(format!(
                    "Copy {} is reserved or issued to {}",
                    copy.inventory_number, username
                )))
            }
            None => Ok(()),
        }
    }
}

/// RESERVED and ISSUED follow orders and cannot be set by hand
fn ensure_manual_status(status: CopyStatus) -> AppResult<()> {
    if status.is_order_driven() {
        Err(AppError::BusinessRule(format!(
            "Copy status {} is managed by orders",
            status
        )))
    } else {
        Ok(())
    }
}
