//! Shared storage integration tests.
//!
//! Tests the HistoryStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod history_store_tests;
