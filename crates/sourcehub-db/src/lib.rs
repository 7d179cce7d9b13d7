//! sourcehub-db — SurrealDB connection management, schema migrations,
//! and repository implementations for the sourcehub domain.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - The polymorphic owner resolver ([`owner::OwnerResolver`])
//! - The aggregation row mapper ([`mapper::map_row`])
//! - Repository implementations for the `sourcehub-core` traits

mod connection;
mod error;
pub mod mapper;
pub mod owner;
pub mod repository;
mod schema;
mod sequence;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::run_migrations;
