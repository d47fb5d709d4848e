//! SQLite backend for the Ecclesia donation platform.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Provides the
//! [`DonationStore`](ecclesia_core::store::DonationStore) implementation
//! and both [`ProjectRepository`](ecclesia_core::repository::ProjectRepository)
//! adapters (relational rows and embedded site-config entries).

mod encode;
mod projects;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use projects::{ProjectRows, SiteConfigProjects};
pub use store::SqliteStore;
