//! Tenant domain model.
//!
//! Every other entity is scoped to exactly one tenant; no entity is ever
//! visible or mutable outside its owning tenant.

use serde::{Deserialize, Serialize};

/// A tenant is an isolated context owning sources and their
/// sub-resources.
///
/// The numeric `id` is the internal storage key. `external_tenant` is the
/// identifier the outside world knows (an account number); event
/// projections carry the external identifier, never the numeric key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    /// Externally visible tenant identifier (account number).
    pub external_tenant: String,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub external_tenant: String,
}
