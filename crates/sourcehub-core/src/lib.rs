//! sourcehub-core — domain models, repository traits, and the error
//! taxonomy shared by every sourcehub crate.
//!
//! Nothing in this crate touches the database or the event stream; it
//! only defines the contracts the other crates implement.

pub mod contracts;
pub mod error;
pub mod models;
pub mod repository;

pub use error::{Error, Result};
