//! Integration test entry point for slovnyk-app.
//!
//! Run with: cargo test --test integration

mod harness;
mod session;
