//! Integration tests

mod api_tests;
mod borrow_flow;
mod common;
mod http;
mod properties;
