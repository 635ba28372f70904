//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::Utc;
use libris_server::{
    config::{AppConfig, StorageBackend},
    models::{
        book::{Book, NewBook},
        enums::Role,
        user::{Borrower, UserClaims},
    },
    repository::Repository,
    AppState,
};

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config
}

/// Application state over a fresh in-memory backend
pub fn state() -> AppState {
    state_with(config())
}

pub fn state_with(config: AppConfig) -> AppState {
    let repository = Repository::in_memory(config.cart.ttl_seconds);
    AppState::new(config, repository).expect("configuration is valid")
}

pub fn claims(user_id: i32, role: Role, admin: bool) -> UserClaims {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user-{}", user_id),
        user_id,
        role,
        full_name: format!("Reader {}", user_id),
        email: format!("reader{}@example.org", user_id),
        phone_no: Some("08012345678".to_string()),
        staff_no: (role == Role::Staff).then(|| format!("ST-{}", user_id)),
        department: Some("Computer Science".to_string()),
        admin,
        exp: now + 3600,
        iat: now,
    }
}

pub fn student(user_id: i32) -> UserClaims {
    claims(user_id, Role::Student, false)
}

pub fn staff(user_id: i32) -> UserClaims {
    claims(user_id, Role::Staff, false)
}

pub fn admin() -> UserClaims {
    claims(1000, Role::Staff, true)
}

pub fn borrower(user_id: i32) -> Borrower {
    student(user_id).borrower()
}

pub fn token(claims: &UserClaims) -> String {
    claims
        .create_token(&config().auth.jwt_secret)
        .expect("token encodes")
}

pub fn new_book(title: &str) -> NewBook {
    NewBook {
        title: title.to_string(),
        author: "Chimamanda Ngozi Adichie".to_string(),
        category: "Fiction".to_string(),
        description: None,
        image_url: None,
    }
}

pub async fn seed_books(state: &AppState, count: usize) -> Vec<Book> {
    let mut books = Vec::with_capacity(count);
    for i in 0..count {
        let book = state
            .services
            .catalog
            .create_book(new_book(&format!("Volume {}", i + 1)))
            .await
            .expect("book is created");
        books.push(book);
    }
    books
}
