//! Random borrower and admin activity keeps books, carts and requests consistent

use proptest::prelude::*;
use std::collections::HashSet;

use libris_server::{
    models::{
        book::{Book, BookQuery},
        borrow_request::{BorrowRequest, RequestFilter},
        cart::CheckoutInfo,
        enums::CheckoutFlow,
        lifecycle::implied_book_status,
        user::UserClaims,
    },
    AppState,
};

use crate::common::{seed_books, staff, state, student};

const USERS: i32 = 3;
const BOOKS: usize = 5;

#[derive(Debug, Clone)]
enum Action {
    Add { user: i32, book: usize, search: bool },
    Remove { user: i32, book: usize },
    Clear { user: i32 },
    Checkout { user: i32 },
    Accept(usize),
    Reject(usize),
    MarkOverdue(usize),
    RequestReturn(usize),
    AcceptReturn(usize),
}

fn action() -> impl Strategy<Value = Action> {
    let user = 1..=USERS;
    let book = 0..BOOKS;
    prop_oneof![
        4 => (user.clone(), book.clone(), any::<bool>())
            .prop_map(|(user, book, search)| Action::Add { user, book, search }),
        1 => (user.clone(), book).prop_map(|(user, book)| Action::Remove { user, book }),
        1 => user.clone().prop_map(|user| Action::Clear { user }),
        2 => user.prop_map(|user| Action::Checkout { user }),
        2 => any::<usize>().prop_map(Action::Accept),
        1 => any::<usize>().prop_map(Action::Reject),
        1 => any::<usize>().prop_map(Action::MarkOverdue),
        1 => any::<usize>().prop_map(Action::RequestReturn),
        1 => any::<usize>().prop_map(Action::AcceptReturn),
    ]
}

fn claims(user: i32) -> UserClaims {
    if user % 2 == 0 {
        staff(user)
    } else {
        student(user)
    }
}

async fn all_requests(state: &AppState) -> Vec<BorrowRequest> {
    let filter = RequestFilter {
        include_archived: true,
        ..RequestFilter::default()
    };
    state.services.repository.borrows.list(&filter).await.unwrap()
}

async fn pick(state: &AppState, index: usize) -> Option<BorrowRequest> {
    let requests = all_requests(state).await;
    if requests.is_empty() {
        None
    } else {
        Some(requests[index % requests.len()].clone())
    }
}

/// Rule violations are expected outcomes; only the resulting state is checked
async fn apply(state: &AppState, books: &[Book], action: Action) {
    let services = &state.services;
    match action {
        Action::Add { user, book, search } => {
            let flow = if search { CheckoutFlow::Search } else { CheckoutFlow::Catalog };
            let _ = services
                .cart
                .add_to_cart(&claims(user).borrower(), books[book].id, flow)
                .await;
        }
        Action::Remove { user, book } => {
            let _ = services
                .cart
                .remove_from_cart(&claims(user).borrower(), books[book].id)
                .await;
        }
        Action::Clear { user } => {
            let _ = services.cart.clear_cart(&claims(user).borrower()).await;
        }
        Action::Checkout { user } => {
            let _ = services
                .cart
                .submit_checkout(&claims(user).borrower(), CheckoutInfo::default())
                .await;
        }
        Action::Accept(index) => {
            if let Some(request) = pick(state, index).await {
                let _ = services.lifecycle.accept(request.id).await;
            }
        }
        Action::Reject(index) => {
            if let Some(request) = pick(state, index).await {
                let _ = services.lifecycle.reject(request.id).await;
            }
        }
        Action::MarkOverdue(index) => {
            if let Some(request) = pick(state, index).await {
                let _ = services.lifecycle.mark_overdue(request.id).await;
            }
        }
        Action::RequestReturn(index) => {
            if let Some(request) = pick(state, index).await {
                let owner = claims(request.borrower.user_id);
                let _ = services
                    .lifecycle
                    .request_return(&owner, request.id, owner.role)
                    .await;
            }
        }
        Action::AcceptReturn(index) => {
            if let Some(request) = pick(state, index).await {
                let _ = services.lifecycle.accept_return(request.id).await;
            }
        }
    }
}

async fn check_consistency(state: &AppState) {
    let books = state
        .services
        .catalog
        .list_books(&BookQuery::default())
        .await
        .unwrap();
    let requests = all_requests(state).await;
    let active: Vec<&BorrowRequest> = requests.iter().filter(|r| r.status.is_active()).collect();

    for book in &books {
        let on_book: Vec<&&BorrowRequest> = active.iter().filter(|r| r.book_id == book.id).collect();
        assert!(on_book.len() <= 1, "book {} has {} active requests", book.id, on_book.len());

        let expected = implied_book_status(on_book.first().map(|r| r.status), book.held_by.is_some());
        assert_eq!(book.status, expected, "book {} drifted", book.id);
        if !on_book.is_empty() {
            assert_eq!(book.held_by, None, "book {} is both held and requested", book.id);
        }
    }

    for user in 1..=USERS {
        let checkouts: HashSet<i32> = active
            .iter()
            .filter(|r| r.borrower.user_id == user)
            .map(|r| r.checkout_id)
            .collect();
        assert!(checkouts.len() <= 1, "user {} has active requests from {:?}", user, checkouts);

        let cart = state.services.cart.get_cart(&claims(user).borrower()).await.unwrap();
        let in_cart: HashSet<i32> = cart.lines.iter().map(|line| line.entry.book.id).collect();
        let held: HashSet<i32> = books
            .iter()
            .filter(|b| b.held_by == Some(user))
            .map(|b| b.id)
            .collect();
        assert_eq!(in_cart, held, "user {} cart and holds disagree", user);
        assert!(cart.lines.len() <= cart.quota as usize);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_books_follow_carts_and_requests(actions in prop::collection::vec(action(), 1..40)) {
        tokio_test::block_on(async {
            let state = state();
            let books = seed_books(&state, BOOKS).await;
            for action in actions {
                apply(&state, &books, action).await;
                check_consistency(&state).await;
            }
        });
    }
}
