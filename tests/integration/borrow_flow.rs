//! Borrowing scenarios against the in-memory backend

use chrono::{Duration, Utc};
use libris_server::{
    error::{AppError, BorrowRule},
    models::{
        book::BookQuery,
        borrow_request::NewBorrowLine,
        cart::CheckoutInfo,
        enums::{BookStatus, CheckoutFlow, RenewalStatus, RequestStatus, Role},
        message::SendMessage,
    },
};

use crate::common::{admin, borrower, config, seed_books, staff, state, state_with, student};

fn today() -> chrono::NaiveDate {
    Utc::now().date_naive()
}

#[tokio::test]
async fn test_student_quota_is_three() {
    let state = state();
    let books = seed_books(&state, 4).await;
    let reader = student(1).borrower();

    for book in &books[..3] {
        state
            .services
            .cart
            .add_to_cart(&reader, book.id, CheckoutFlow::Catalog)
            .await
            .unwrap();
    }

    let err = state
        .services
        .cart
        .add_to_cart(&reader, books[3].id, CheckoutFlow::Catalog)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::CapacityExceeded { max: 3 })));

    let cart = state.services.cart.get_cart(&reader).await.unwrap();
    assert_eq!(cart.lines.len(), 3);
    assert_eq!(cart.quota, 3);
    // The refused book was never held
    let fourth = state.services.catalog.get_book(books[3].id).await.unwrap();
    assert_eq!(fourth.status, BookStatus::Available);
}

#[tokio::test]
async fn test_staff_quota_is_five() {
    let state = state();
    let books = seed_books(&state, 6).await;
    let reader = staff(2).borrower();

    for book in &books[..5] {
        state
            .services
            .cart
            .add_to_cart(&reader, book.id, CheckoutFlow::Catalog)
            .await
            .unwrap();
    }
    let err = state
        .services
        .cart
        .add_to_cart(&reader, books[5].id, CheckoutFlow::Catalog)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::CapacityExceeded { max: 5 })));
}

#[tokio::test]
async fn test_add_then_remove_restores_status() {
    let state = state();
    let book = seed_books(&state, 1).await.remove(0);
    let reader = borrower(1);

    let cart = state
        .services
        .cart
        .add_to_cart(&reader, book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].due_date, today() + Duration::days(5));

    let held = state.services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(held.status, BookStatus::Pending);
    assert_eq!(held.held_by, Some(1));

    let cart = state.services.cart.remove_from_cart(&reader, book.id).await.unwrap();
    assert!(cart.lines.is_empty());

    let released = state.services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(released.status, BookStatus::Available);
    assert_eq!(released.held_by, None);
}

#[tokio::test]
async fn test_duplicate_and_unavailable_books_are_refused() {
    let state = state();
    let book = seed_books(&state, 1).await.remove(0);

    state
        .services
        .cart
        .add_to_cart(&borrower(1), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();

    let err = state
        .services
        .cart
        .add_to_cart(&borrower(1), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::Duplicate { .. })));

    let err = state
        .services
        .cart
        .add_to_cart(&borrower(2), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::BookUnavailable { .. })));
}

#[tokio::test]
async fn test_borrowed_book_is_refused() {
    let state = state();
    let book = seed_books(&state, 1).await.remove(0);

    state
        .services
        .cart
        .add_to_cart(&borrower(1), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();
    let created = state
        .services
        .cart
        .submit_checkout(&borrower(1), CheckoutInfo::default())
        .await
        .unwrap();
    state.services.lifecycle.accept(created[0].id).await.unwrap();

    let err = state
        .services
        .cart
        .add_to_cart(&borrower(2), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::BookBorrowed { .. })));
}

#[tokio::test]
async fn test_full_borrow_cycle() {
    let state = state();
    let books = seed_books(&state, 2).await;
    let claims = student(1);
    let reader = claims.borrower();

    for (book, flow) in books.iter().zip([CheckoutFlow::Catalog, CheckoutFlow::Search]) {
        state.services.cart.add_to_cart(&reader, book.id, flow).await.unwrap();
    }

    let created = state
        .services
        .cart
        .submit_checkout(&reader, CheckoutInfo::default())
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].checkout_id, created[1].checkout_id);
    assert!(created.iter().all(|r| r.status == RequestStatus::Pending));
    assert_eq!(created[0].return_date, today() + Duration::days(5));
    assert_eq!(created[1].return_date, today() + Duration::days(7));
    assert_eq!(created[0].borrower.email, "reader1@example.org");

    // Cart is emptied and the books stay pending under review
    assert!(state.services.cart.get_cart(&reader).await.unwrap().lines.is_empty());
    for book in &books {
        let book = state.services.catalog.get_book(book.id).await.unwrap();
        assert_eq!(book.status, BookStatus::Pending);
        assert_eq!(book.held_by, None);
    }

    // An active request blocks new borrows
    assert!(state.services.eligibility.check_eligibility(1).await.unwrap());
    let extra = seed_books(&state, 1).await.remove(0);
    let err = state
        .services
        .cart
        .add_to_cart(&reader, extra.id, CheckoutFlow::Catalog)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::AlreadyBorrowed)));

    // Admin accepts one and rejects the other
    let loan = state.services.lifecycle.accept(created[0].id).await.unwrap();
    assert_eq!(loan.status, RequestStatus::Accepted);
    state.services.lifecycle.reject(created[1].id).await.unwrap();

    let borrowed = state.services.catalog.get_book(books[0].id).await.unwrap();
    assert_eq!(borrowed.status, BookStatus::Borrowed);
    let released = state.services.catalog.get_book(books[1].id).await.unwrap();
    assert_eq!(released.status, BookStatus::Available);

    // Borrower asks to return, admin accepts in one step
    let processing = state
        .services
        .lifecycle
        .request_return(&claims, loan.id, Role::Student)
        .await
        .unwrap();
    assert_eq!(processing.status, RequestStatus::Processing);
    assert!(processing.return_requested_at.is_some());

    let returned = state.services.lifecycle.accept_return(loan.id).await.unwrap();
    assert_eq!(returned.status, RequestStatus::Returned);
    assert!(returned.archived_at.is_some());
    let book = state.services.catalog.get_book(books[0].id).await.unwrap();
    assert_eq!(book.status, BookStatus::Available);

    // Retried acceptance is a no-op
    let again = state.services.lifecycle.accept_return(loan.id).await.unwrap();
    assert_eq!(again.status, RequestStatus::Returned);

    // Everything closed: the user may borrow again
    assert!(!state.services.eligibility.check_eligibility(1).await.unwrap());
    state
        .services
        .cart
        .add_to_cart(&reader, extra.id, CheckoutFlow::Catalog)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_checkout_conflict_leaves_cart_untouched() {
    let state = state();
    let books = seed_books(&state, 2).await;
    let reader = borrower(1);

    for book in &books {
        state
            .services
            .cart
            .add_to_cart(&reader, book.id, CheckoutFlow::Catalog)
            .await
            .unwrap();
    }

    // A request for the first book is created behind the cart's back
    state
        .services
        .repository
        .borrows
        .create_checkout(
            &reader,
            today(),
            vec![NewBorrowLine {
                book_id: books[0].id,
                return_date: today() + Duration::days(5),
            }],
        )
        .await
        .unwrap();

    let err = state
        .services
        .cart
        .submit_checkout(&reader, CheckoutInfo::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::AlreadyBorrowed)));
    assert_eq!(state.services.cart.get_cart(&reader).await.unwrap().lines.len(), 2);
}

#[tokio::test]
async fn test_staff_loans_are_longer() {
    let state = state();
    let books = seed_books(&state, 2).await;

    state
        .services
        .cart
        .add_to_cart(&student(1).borrower(), books[0].id, CheckoutFlow::Catalog)
        .await
        .unwrap();
    state
        .services
        .cart
        .add_to_cart(&staff(2).borrower(), books[1].id, CheckoutFlow::Catalog)
        .await
        .unwrap();

    let student_request = state
        .services
        .cart
        .submit_checkout(&student(1).borrower(), CheckoutInfo::default())
        .await
        .unwrap()
        .remove(0);
    let staff_request = state
        .services
        .cart
        .submit_checkout(&staff(2).borrower(), CheckoutInfo::default())
        .await
        .unwrap()
        .remove(0);

    assert!(staff_request.return_date > student_request.return_date);
    assert_eq!(staff_request.return_date, today() + Duration::days(10));
}

#[tokio::test]
async fn test_renewal_rules() {
    let state = state();
    let book = seed_books(&state, 1).await.remove(0);
    let claims = student(1);

    state
        .services
        .cart
        .add_to_cart(&claims.borrower(), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();
    let request = state
        .services
        .cart
        .submit_checkout(&claims.borrower(), CheckoutInfo::default())
        .await
        .unwrap()
        .remove(0);

    // Not yet on loan
    let err = state
        .services
        .lifecycle
        .request_renewal(&claims, request.id, request.return_date + Duration::days(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::InvalidTransition { .. })));

    state.services.lifecycle.accept(request.id).await.unwrap();

    let err = state
        .services
        .lifecycle
        .request_renewal(&claims, request.id, request.return_date + Duration::days(6))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rule(BorrowRule::RenewalOutOfRange { .. })));

    let proposed = request.return_date + Duration::days(5);
    let renewing = state
        .services
        .lifecycle
        .request_renewal(&claims, request.id, proposed)
        .await
        .unwrap();
    assert_eq!(renewing.renewal_status, RenewalStatus::Requested);

    let pending = state.services.lifecycle.renewal_requests().await.unwrap();
    assert_eq!(pending.len(), 1);

    let renewed = state
        .services
        .lifecycle
        .accept_renewal(request.id, None)
        .await
        .unwrap();
    assert_eq!(renewed.renewal_status, RenewalStatus::Renewed);
    assert_eq!(renewed.return_date, proposed);
    assert!(state.services.lifecycle.renewal_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_shows_days_left_and_archive() {
    let state = state();
    let books = seed_books(&state, 2).await;
    let reader = borrower(1);

    for book in &books {
        state
            .services
            .cart
            .add_to_cart(&reader, book.id, CheckoutFlow::Catalog)
            .await
            .unwrap();
    }
    let created = state
        .services
        .cart
        .submit_checkout(&reader, CheckoutInfo::default())
        .await
        .unwrap();
    state.services.lifecycle.accept(created[0].id).await.unwrap();
    state.services.lifecycle.reject(created[1].id).await.unwrap();

    let current = state.services.lifecycle.user_history(1, false).await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].days_left, Some(5));

    let all = state.services.lifecycle.user_history(1, true).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|view| view.request.status == RequestStatus::Rejected));
}

#[tokio::test]
async fn test_admin_views() {
    let state = state();
    let books = seed_books(&state, 3).await;

    for (user_id, book) in [(1, &books[0]), (2, &books[1]), (1, &books[2])] {
        state
            .services
            .cart
            .add_to_cart(&borrower(user_id), book.id, CheckoutFlow::Catalog)
            .await
            .unwrap();
    }
    let first = state
        .services
        .cart
        .submit_checkout(&borrower(1), CheckoutInfo::default())
        .await
        .unwrap();
    state
        .services
        .cart
        .submit_checkout(&borrower(2), CheckoutInfo::default())
        .await
        .unwrap();

    let groups = state.services.lifecycle.active_by_borrower().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].borrower.user_id, 1);
    assert_eq!(groups[0].requests.len(), 2);

    state.services.lifecycle.accept(first[0].id).await.unwrap();
    state
        .services
        .lifecycle
        .request_return(&student(1), first[0].id, Role::Student)
        .await
        .unwrap();
    assert_eq!(state.services.lifecycle.return_requests().await.unwrap().len(), 1);

    state.services.lifecycle.accept_return(first[0].id).await.unwrap();
    assert!(state.services.lifecycle.return_requests().await.unwrap().is_empty());
    assert_eq!(state.services.lifecycle.returned().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_override_must_agree_with_requests() {
    let state = state();
    let book = seed_books(&state, 1).await.remove(0);

    state
        .services
        .cart
        .add_to_cart(&borrower(1), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();

    let err = state
        .services
        .availability
        .set_status(book.id, BookStatus::Available)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let book = state
        .services
        .availability
        .set_status(book.id, BookStatus::Pending)
        .await
        .unwrap();
    assert_eq!(book.held_by, Some(1));
}

#[tokio::test]
async fn test_stale_holds_are_released_by_a_new_cart() {
    let state = state();
    let books = seed_books(&state, 2).await;

    // A hold left behind by an expired session
    state.services.availability.reserve(books[0].id, 1).await.unwrap();

    state
        .services
        .cart
        .add_to_cart(&borrower(1), books[1].id, CheckoutFlow::Catalog)
        .await
        .unwrap();

    let stale = state.services.catalog.get_book(books[0].id).await.unwrap();
    assert_eq!(stale.status, BookStatus::Available);
}

/// Carts and their holds lapse immediately
fn lapsing_state() -> libris_server::AppState {
    let mut config = config();
    config.cart.ttl_seconds = 0;
    state_with(config)
}

#[tokio::test]
async fn test_lapsed_hold_passes_to_next_reader() {
    let state = lapsing_state();
    let book = seed_books(&state, 1).await.remove(0);

    state
        .services
        .cart
        .add_to_cart(&borrower(1), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();

    let view = state
        .services
        .cart
        .add_to_cart(&borrower(2), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();
    assert_eq!(view.lines.len(), 1);

    let book = state.services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(book.status, BookStatus::Pending);
    assert_eq!(book.held_by, Some(2));
}

#[tokio::test]
async fn test_admin_override_clears_lapsed_hold() {
    let state = lapsing_state();
    let book = seed_books(&state, 1).await.remove(0);

    state
        .services
        .cart
        .add_to_cart(&borrower(1), book.id, CheckoutFlow::Catalog)
        .await
        .unwrap();

    let book = state
        .services
        .availability
        .set_status(book.id, BookStatus::Available)
        .await
        .unwrap();
    assert_eq!(book.status, BookStatus::Available);
    assert_eq!(book.held_by, None);
}

#[tokio::test]
async fn test_catalogue_search() {
    let state = state();
    seed_books(&state, 3).await;

    let all = state
        .services
        .catalog
        .list_books(&BookQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let query = BookQuery {
        q: Some("volume 2".to_string()),
        status: None,
    };
    let found = state.services.catalog.list_books(&query).await.unwrap();
    assert_eq!(found.len(), 1);

    let by_author = state
        .services
        .catalog
        .search_books(libris_server::models::book::SearchField::Author, "adichie")
        .await
        .unwrap();
    assert_eq!(by_author.len(), 3);
}

#[tokio::test]
async fn test_messages_are_listed_newest_first() {
    let state = state();

    for text in ["Your book is due", "Please collect your book"] {
        state
            .services
            .messages
            .send(
                &admin(),
                SendMessage {
                    borrower_id: 1,
                    borrower_email: None,
                    message: text.to_string(),
                },
            )
            .await
            .unwrap();
    }

    let messages = state.services.messages.list_for(1).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].body, "Please collect your book");
    assert!(state.services.messages.list_for(2).await.unwrap().is_empty());
}
