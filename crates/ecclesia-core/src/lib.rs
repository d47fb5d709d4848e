//! Core types and trait definitions for the Ecclesia donation platform.
//!
//! Defines the donation lifecycle, the recompute-from-source aggregation
//! of project collected totals, and the seams (donation store, checkout
//! gateway, project repositories) that the sqlite and stripe crates plug
//! into. Carries no HTTP or database code of its own, so the
//! reconciliation rules can be tested against in-memory fakes.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod donation;
pub mod error;
pub mod gateway;
pub mod parish;
pub mod project;
pub mod reconcile;
pub mod repository;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
