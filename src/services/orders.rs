//! Borrowing order workflow
//!
//! Readers request a book, which reserves one of its available copies.
//! Librarians then issue the copy and later mark it returned; a reader may
//! cancel an order while it is still pending.

use chrono::{Local, NaiveDate};

use crate::{
    config::OrdersConfig,
    error::{AppError, AppResult},
    models::{
        BookStats, NewOrder, OrderDetails, OrderStatus, OrderTransition, OrderType, OrderView, Page,
        PageRequest, UserStats,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct OrdersService {
    repository: Repository,
    config: OrdersConfig,
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl OrdersService {
    pub fn new(repository: Repository, config: OrdersConfig) -> Self {
        Self { repository, config }
    }

    /// Reserve an available copy of `book_id` for `username`
    pub async fn create_order(
        &self,
        book_id: i64,
        username: &str,
        order_type: OrderType,
    ) -> AppResult<OrderDetails> {
        let user = self
            .repository
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !user.is_active() {
            tracing::warn!("Blocked user {} tried to order book {}", user.username, book_id);
            return Err(AppError::BusinessRule("User is not active".to_string()));
        }

        // Book must exist before availability means anything
        self.repository.books.get_by_id(book_id).await?;

        if self
            .repository
            .orders
            .has_active_order_for_book(user.id, book_id)
            .await?
        {
            tracing::warn!("User {} already has an active order for book {}", user.username, book_id);
            return Err(AppError::Conflict(
                "You already have an active order for this book".to_string(),
            ));
        }

        let copy = self
            .repository
            .copies
            .find_available(book_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("No available copies of book {}", book_id);
                AppError::BusinessRule("No available copies".to_string())
            })?;

        let order = NewOrder::pending(user.id, copy.id, order_type, today(), &self.config);
        let order_id = self.repository.orders.create(&order).await?;

        tracing::info!(
            "Order {} created: user {} reserved copy {} ({}) of book {}",
            order_id,
            user.username,
            copy.id,
            copy.inventory_number,
            book_id
        );

        self.repository.orders.get_by_id(order_id).await
    }

    /// Cancel a reader's own pending order
    pub async fn cancel_order(&self, order_id: i64, username: &str) -> AppResult<OrderDetails> {
        let order = self.repository.orders.get_by_id(order_id).await?;

        if !order.username.eq_ignore_ascii_case(username) {
            tracing::warn!("User {} tried to cancel order {} of {}", username, order_id, order.username);
            return Err(AppError::Authorization(
                "Unauthorized to cancel this order".to_string(),
            ));
        }

        self.ensure_transition(&order, OrderStatus::Canceled, "Only pending orders can be canceled")?;

        self.apply(&order, OrderStatus::Canceled, None, None).await
    }

    /// Issue the reserved copy, optionally overriding the due date
    pub async fn confirm_order_issue(
        &self,
        order_id: i64,
        due_date: Option<NaiveDate>,
    ) -> AppResult<OrderDetails> {
        let order = self.repository.orders.get_by_id(order_id).await?;

        self.ensure_transition(&order, OrderStatus::Issued, "Order is not in PENDING status")?;

        let today = today();
        let due_date = due_date
            .or(order.due_date)
            .unwrap_or_else(|| order.order_type.due_date(today, &self.config));

        if due_date < today {
            return Err(AppError::Validation(
                "Due date cannot be in the past".to_string(),
            ));
        }

        self.apply(&order, OrderStatus::Issued, Some(due_date), None).await
    }

    /// Record the return of an issued copy
    pub async fn mark_as_returned(&self, order_id: i64) -> AppResult<OrderDetails> {
        let order = self.repository.orders.get_by_id(order_id).await?;

        self.ensure_transition(&order, OrderStatus::Returned, "Only ISSUED orders can be returned")?;

        self.apply(&order, OrderStatus::Returned, order.due_date, Some(today()))
            .await
    }

    fn ensure_transition(&self, order: &OrderDetails, to: OrderStatus, message: &str) -> AppResult<()> {
        if order.status.can_transition_to(to) {
            Ok(())
        } else {
            tracing::warn!(
                "Rejected transition of order {} from {} to {}",
                order.id,
                order.status,
                to
            );
            Err(AppError::BusinessRule(message.to_string()))
        }
    }

    async fn apply(
        &self,
        order: &OrderDetails,
        to: OrderStatus,
        due_date: Option<NaiveDate>,
        return_date: Option<NaiveDate>,
    ) -> AppResult<OrderDetails> {
        let transition = OrderTransition {
            order_id: order.id,
            copy_id: order.copy_id,
            from: order.status,
            to,
            due_date,
            return_date,
        };
        self.repository.orders.transition(&transition).await?;

        tracing::info!(
            "Order {} moved from {} to {}, copy {} is now {}",
            order.id,
            order.status,
            to,
            order.copy_id,
            transition.copy_status()
        );

        self.repository.orders.get_by_id(order.id).await
    }

    /// Orders of one reader, newest first
    pub async fn get_orders_by_username(
        &self,
        username: &str,
        page: PageRequest,
    ) -> AppResult<Page<OrderView>> {
        let (orders, total) = self
            .repository
            .orders
            .list_by_username(username, page)
            .await?;
        Ok(Self::views(orders, total, page))
    }

    /// Every order, newest first
    pub async fn get_all_orders(&self, page: PageRequest) -> AppResult<Page<OrderView>> {
        let (orders, total) = self.repository.orders.list_all(page).await?;
        Ok(Self::views(orders, total, page))
    }

    fn views(orders: Vec<OrderDetails>, total: i64, page: PageRequest) -> Page<OrderView> {
        let today = today();
        Page::new(orders, total, page).map(|order| OrderView::new(order, today))
    }

    pub async fn get_by_id(&self, order_id: i64) -> AppResult<OrderDetails> {
        self.repository.orders.get_by_id(order_id).await
    }

    /// Username of the reader holding or having reserved the copy
    pub async fn get_issued_or_reserved(&self, copy_id: i64) -> AppResult<Option<String>> {
        self.repository.orders.active_holder(copy_id).await
    }

    pub async fn has_active_order_for_book(&self, book_id: i64, user_id: i64) -> AppResult<bool> {
        self.repository
            .orders
            .has_active_order_for_book(user_id, book_id)
            .await
    }

    pub async fn get_count_by_statuses(&self, statuses: &[OrderStatus]) -> AppResult<i64> {
        self.repository.orders.count_by_statuses(statuses).await
    }

    pub async fn get_top_requested_books(&self, limit: i64) -> AppResult<Vec<BookStats>> {
        self.repository.orders.top_books(limit).await
    }

    pub async fn get_top_active_users(&self, limit: i64) -> AppResult<Vec<UserStats>> {
        self.repository.orders.top_users(limit).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        models::{BookCopy, CopyStatus, UserStatus},
        repository::{
            books::MockBooksRepository, copies::MockCopiesRepository,
            orders::MockOrdersRepository, users::MockUsersRepository,
        },
        services::fixtures::{book, order, reader},
    };

    fn service(
        books: MockBooksRepository,
        copies: MockCopiesRepository,
        orders: MockOrdersRepository,
        users: MockUsersRepository,
    ) -> OrdersService {
        OrdersService::new(
            Repository::mocked(books, copies, orders, users),
            OrdersConfig::default(),
        )
    }

    fn orders_only(orders: MockOrdersRepository) -> OrdersService {
        service(
            MockBooksRepository::new(),
            MockCopiesRepository::new(),
            orders,
            MockUsersRepository::new(),
        )
    }

    #[tokio::test]
    async fn test_create_order_reserves_available_copy() {
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(reader(3, "alice"))));

        let mut books = MockBooksRepository::new();
        books.expect_get_by_id().returning(|id| Ok(book(id)));

        let mut copies = MockCopiesRepository::new();
        copies.expect_find_available().returning(|book_id| {
            Ok(Some(BookCopy {
                id: 11,
                book_id,
                inventory_number: "INV-0002".to_string(),
                status: CopyStatus::Available,
                book_title: None,
            }))
        });

        let mut orders = MockOrdersRepository::new();
        orders
            .expect_has_active_order_for_book()
            .returning(|_, _| Ok(false));
        orders
            .expect_create()
            .withf(|o: &NewOrder| {
                o.user_id == 3
                    && o.copy_id == 11
                    && o.status == OrderStatus::Pending
                    && o.due_date == o.issue_date + Duration::days(14)
            })
            .times(1)
            .returning(|_| Ok(42));
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Pending)));

        let created = service(books, copies, orders, users)
            .create_order(5, "alice", OrderType::Home)
            .await
            .unwrap();

        assert_eq!(created.id, 42);
        assert_eq!(created.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_order_without_available_copy() {
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(reader(3, "alice"))));
        let mut books = MockBooksRepository::new();
        books.expect_get_by_id().returning(|id| Ok(book(id)));
        let mut copies = MockCopiesRepository::new();
        copies.expect_find_available().returning(|_| Ok(None));
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_has_active_order_for_book()
            .returning(|_, _| Ok(false));
        orders.expect_create().never();

        let err = service(books, copies, orders, users)
            .create_order(5, "alice", OrderType::ReadingRoom)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(msg) if msg == "No available copies"));
    }

    #[tokio::test]
    async fn test_create_order_unknown_user() {
        let mut users = MockUsersRepository::new();
        users.expect_find_by_username().returning(|_| Ok(None));

        let err = service(
            MockBooksRepository::new(),
            MockCopiesRepository::new(),
            MockOrdersRepository::new(),
            users,
        )
        .create_order(5, "ghost", OrderType::Home)
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(msg) if msg == "User not found"));
    }

    #[tokio::test]
    async fn test_create_order_blocked_user() {
        let mut users = MockUsersRepository::new();
        users.expect_find_by_username().returning(|_| {
            let mut user = reader(3, "alice");
            user.status = UserStatus::Blocked;
            Ok(Some(user))
        });

        let err = service(
            MockBooksRepository::new(),
            MockCopiesRepository::new(),
            MockOrdersRepository::new(),
            users,
        )
        .create_order(5, "alice", OrderType::Home)
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn test_create_order_rejects_second_active_order_for_book() {
        let mut users = MockUsersRepository::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(reader(3, "alice"))));
        let mut books = MockBooksRepository::new();
        books.expect_get_by_id().returning(|id| Ok(book(id)));
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_has_active_order_for_book()
            .returning(|_, _| Ok(true));

        let err = service(books, MockCopiesRepository::new(), orders, users)
            .create_order(5, "alice", OrderType::Home)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_pending_order() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .times(1)
            .returning(|id| Ok(order(id, OrderStatus::Pending)));
        orders
            .expect_transition()
            .withf(|t: &OrderTransition| {
                t.from == OrderStatus::Pending
                    && t.to == OrderStatus::Canceled
                    && t.copy_status() == CopyStatus::Available
                    && t.due_date.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Canceled)));

        let canceled = orders_only(orders).cancel_order(1, "alice").await.unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_cancel_order_of_another_reader() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Pending)));
        orders.expect_transition().never();

        let err = orders_only(orders).cancel_order(1, "mallory").await.unwrap_err();
        assert!(
            matches!(err, AppError::Authorization(msg) if msg == "Unauthorized to cancel this order")
        );
    }

    #[tokio::test]
    async fn test_cancel_issued_order_is_rejected() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Issued)));
        orders.expect_transition().never();

        let err = orders_only(orders).cancel_order(1, "alice").await.unwrap_err();
        assert!(
            matches!(err, AppError::BusinessRule(msg) if msg == "Only pending orders can be canceled")
        );
    }

    #[tokio::test]
    async fn test_confirm_issue_sets_due_date() {
        let due = today() + Duration::days(10);

        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .times(1)
            .returning(|id| Ok(order(id, OrderStatus::Pending)));
        orders
            .expect_transition()
            .withf(move |t: &OrderTransition| {
                t.to == OrderStatus::Issued
                    && t.copy_status() == CopyStatus::Issued
                    && t.due_date == Some(due)
            })
            .times(1)
            .returning(|_| Ok(()));
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Issued)));

        let issued = orders_only(orders)
            .confirm_order_issue(1, Some(due))
            .await
            .unwrap();
        assert_eq!(issued.status, OrderStatus::Issued);
    }

    #[tokio::test]
    async fn test_confirm_issue_requires_pending() {
        for status in [OrderStatus::Issued, OrderStatus::Returned, OrderStatus::Canceled] {
            let mut orders = MockOrdersRepository::new();
            orders
                .expect_get_by_id()
                .returning(move |id| Ok(order(id, status)));
            orders.expect_transition().never();

            let err = orders_only(orders)
                .confirm_order_issue(1, None)
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::BusinessRule(msg) if msg == "Order is not in PENDING status")
            );
        }
    }

    #[tokio::test]
    async fn test_confirm_issue_rejects_past_due_date() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Pending)));
        orders.expect_transition().never();

        let err = orders_only(orders)
            .confirm_order_issue(1, Some(today() - Duration::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_return_issued_order() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .times(1)
            .returning(|id| Ok(order(id, OrderStatus::Issued)));
        orders
            .expect_transition()
            .withf(|t: &OrderTransition| {
                t.from == OrderStatus::Issued
                    && t.to == OrderStatus::Returned
                    && t.copy_status() == CopyStatus::Available
                    && t.return_date == Some(today())
            })
            .times(1)
            .returning(|_| Ok(()));
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Returned)));

        let returned = orders_only(orders).mark_as_returned(1).await.unwrap();
        assert_eq!(returned.status, OrderStatus::Returned);
    }

    #[tokio::test]
    async fn test_return_pending_order_is_rejected() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Pending)));
        orders.expect_transition().never();

        let err = orders_only(orders).mark_as_returned(1).await.unwrap_err();
        assert!(
            matches!(err, AppError::BusinessRule(msg) if msg == "Only ISSUED orders can be returned")
        );
    }

    #[tokio::test]
    async fn test_lost_race_surfaces_as_conflict() {
        let mut orders = MockOrdersRepository::new();
        orders
            .expect_get_by_id()
            .returning(|id| Ok(order(id, OrderStatus::Pending)));
        orders
            .expect_transition()
            .returning(|_| Err(AppError::Conflict("Order 1 is no longer PENDING".to_string())));

        let err = orders_only(orders).cancel_order(1, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_order_pages_flag_overdue() {
        let mut orders = MockOrdersRepository::new();
        orders.expect_list_by_username().returning(|_, _| {
            let mut late = order(1, OrderStatus::Issued);
            late.due_date = Some(today() - Duration::days(2));
            Ok((vec![late, order(2, OrderStatus::Pending)], 12))
        });

        let page = orders_only(orders)
            .get_orders_by_username("alice", PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 2);
        assert!(page.items[0].is_overdue);
        assert!(!page.items[1].is_overdue);
    }
}
