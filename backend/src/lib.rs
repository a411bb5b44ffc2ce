//! Organization directory search gateway.
//!
//! Clients send small query programs (one root operation, its arguments and
//! a field selection) and get back users, departments or management chains
//! from the search backend.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod query;
pub mod repository;

pub use app::{AppState, build_app};
