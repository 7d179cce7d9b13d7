//! Outbound side of sourcehub.
//!
//! Everything that leaves the system after a mutation lives here: the
//! pause/resume cascade and its event emission, the forwardable-header
//! filter, the marketplace-token cache backing secret enrichment, and
//! the fire-and-forget availability-check trigger.

pub mod availability;
pub mod cascade;
pub mod headers;
pub mod secrets;

pub use cascade::{LifecycleService, LifecycleState};
