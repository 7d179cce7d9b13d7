//! Domain models for sourcehub.
//!
//! These are the core types shared across all crates. Each entity module
//! carries its row struct plus the Create*/Update* request shapes and,
//! where the entity is published downstream, its event projection.

pub mod application;
pub mod application_authentication;
pub mod authentication;
pub mod endpoint;
pub mod resource_type;
pub mod rhc_connection;
pub mod source;
pub mod tenant;
