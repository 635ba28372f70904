//! Cart and checkout service.
//!
//! Adding a book places a hold on it (`available -> pending`); removing it or
//! clearing the cart releases the hold. Checkout turns the held books into pending
//! borrow requests in one store transaction, then empties the cart. Operations on
//! one user's cart are serialized with [`UserLocks`].

use chrono::{NaiveDate, Utc};

use super::{availability::AvailabilityService, eligibility::EligibilityService, locks::UserLocks};
use crate::{
    error::{AppError, AppResult, BorrowRule},
    models::{
        borrow_request::{BorrowRequest, NewBorrowLine},
        cart::{Cart, CartBook, CartEntry, CartLine, CartView, CheckoutInfo},
        enums::CheckoutFlow,
        user::Borrower,
    },
    policy::LoanPolicy,
    repository::Repository,
};

#[derive(Clone)]
pub struct CartService {
    repository: Repository,
    eligibility: EligibilityService,
    availability: AvailabilityService,
    policy: LoanPolicy,
    locks: UserLocks,
}

impl CartService {
    pub fn new(
        repository: Repository,
        eligibility: EligibilityService,
        availability: AvailabilityService,
        policy: LoanPolicy,
    ) -> Self {
        Self {
            repository,
            eligibility,
            availability,
            policy,
            locks: UserLocks::new(),
        }
    }

    fn view(&self, cart: Cart, borrower: &Borrower, borrow_date: NaiveDate) -> CartView {
        let lines = cart
            .entries
            .into_iter()
            .map(|entry| CartLine {
                due_date: self
                    .policy
                    .compute_due_date(borrow_date, borrower.role, entry.flow),
                entry,
            })
            .collect();
        CartView {
            user_id: cart.user_id,
            quota: self.policy.quota(borrower.role),
            borrow_date,
            lines,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn get_cart(&self, borrower: &Borrower) -> AppResult<CartView> {
        let cart = self.repository.carts.load(borrower.user_id).await?;
        Ok(self.view(cart, borrower, Self::today()))
    }

    /// Add a book to the borrower's cart and hold it
    pub async fn add_to_cart(
        &self,
        borrower: &Borrower,
        book_id: i32,
        flow: CheckoutFlow,
    ) -> AppResult<CartView> {
        let user_id = borrower.user_id;
        let _guard = self.locks.lock(user_id).await;

        if self.eligibility.check_eligibility(user_id).await? {
            return Err(BorrowRule::AlreadyBorrowed.into());
        }

        let mut cart = self.repository.carts.load(user_id).await?;
        if cart.is_empty() {
            // A new session: holds left by an expired cart are stale
            self.availability.release_holds(user_id).await?;
        }

        let max = self.policy.quota(borrower.role);
        if cart.len() >= max as usize {
            return Err(BorrowRule::CapacityExceeded { max }.into());
        }
        if cart.contains(book_id) {
            return Err(BorrowRule::Duplicate { book_id }.into());
        }

        let book = self.availability.reserve(book_id, user_id).await?;
        cart.entries.push(CartEntry {
            book: CartBook::from(&book),
            borrower: borrower.clone(),
            flow,
            added_at: Utc::now(),
        });

        if let Err(e) = self.repository.carts.save(&cart).await {
            tracing::warn!(
                "Saving cart of user {} failed, releasing hold on book {}: {}",
                user_id,
                book_id,
                e
            );
            if let Err(release_err) = self.availability.release(book_id, user_id).await {
                tracing::error!("Releasing hold on book {} failed: {}", book_id, release_err);
            }
            return Err(e);
        }

        tracing::info!("User {} added book {} to cart ({} of {})", user_id, book_id, cart.len(), max);
        Ok(self.view(cart, borrower, Self::today()))
    }

    /// Remove a book from the cart, making it available again
    pub async fn remove_from_cart(&self, borrower: &Borrower, book_id: i32) -> AppResult<CartView> {
        let user_id = borrower.user_id;
        let _guard = self.locks.lock(user_id).await;

        let mut cart = self.repository.carts.load(user_id).await?;
        if !cart.remove(book_id) {
            return Err(AppError::NotFound(format!("Book {} is not in the cart", book_id)));
        }
        self.repository.carts.save(&cart).await?;
        self.availability.release(book_id, user_id).await?;

        tracing::info!("User {} removed book {} from cart", user_id, book_id);
        Ok(self.view(cart, borrower, Self::today()))
    }

    /// Empty the cart and release every hold
    pub async fn clear_cart(&self, borrower: &Borrower) -> AppResult<CartView> {
        let user_id = borrower.user_id;
        let _guard = self.locks.lock(user_id).await;

        self.repository.carts.clear(user_id).await?;
        self.availability.release_holds(user_id).await?;
        Ok(self.view(Cart::empty(user_id), borrower, Self::today()))
    }

    /// Create one pending borrow request per cart entry, then empty the cart
    pub async fn submit_checkout(
        &self,
        borrower: &Borrower,
        info: CheckoutInfo,
    ) -> AppResult<Vec<BorrowRequest>> {
        let user_id = borrower.user_id;
        let _guard = self.locks.lock(user_id).await;

        let today = Self::today();
        let borrow_date = info.borrow_date.unwrap_or(today);
        if borrow_date < today {
            return Err(AppError::Validation(format!(
                "Borrow date {} is in the past",
                borrow_date
            )));
        }

        // The user may have borrowed elsewhere since filling the cart
        if self.eligibility.check_eligibility(user_id).await? {
            return Err(BorrowRule::AlreadyBorrowed.into());
        }

        let cart = self.repository.carts.load(user_id).await?;
        if cart.is_empty() {
            return Err(BorrowRule::EmptyCart.into());
        }

        let lines: Vec<NewBorrowLine> = cart
            .entries
            .iter()
            .map(|entry| NewBorrowLine {
                book_id: entry.book.id,
                return_date: self
                    .policy
                    .compute_due_date(borrow_date, borrower.role, entry.flow),
            })
            .collect();

        let created = self
            .repository
            .borrows
            .create_checkout(borrower, borrow_date, lines)
            .await?;

        // Requests are committed; a leftover cart only blocks new adds until it expires
        if let Err(e) = self.repository.carts.clear(user_id).await {
            tracing::warn!("Clearing cart of user {} after checkout failed: {}", user_id, e);
        }

        tracing::info!(
            "User {} checked out {} book(s) in batch {}",
            user_id,
            created.len(),
            created.first().map(|r| r.checkout_id).unwrap_or_default()
        );
        Ok(created)
    }
}
