//! DCIM Database — SurrealDB connection management, schema migrations
//! and repository implementations for the inventory core.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The shared list-query engine and scoped-uniqueness check
//! - The cascade/restrict/nullify delete executor ([`cascade`])
//! - SurrealDB implementations of every `dcim-core` repository trait

pub mod cascade;
mod connection;
mod error;
mod query;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
