//! Red Hat Connector connection domain model.
//!
//! Connections are many-to-many with sources through a tenant-tagged
//! join row. The API boundary keeps the relation denormalized: a listed
//! connection carries the ids of all sources it is linked to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Red Hat Connector connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhcConnection {
    pub id: i64,
    /// Unique external connector id.
    pub rhc_id: String,
    /// Opaque payload stored verbatim.
    pub extra: Option<Value>,
    pub availability_status: Option<String>,
    /// Sources linked to this connection for the querying tenant,
    /// aggregated from the join table.
    pub source_ids: Vec<i64>,
}

/// A request coming from the outside to create a connection, linked to
/// one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRhcConnection {
    pub rhc_id: String,
    pub extra: Option<Value>,
    pub source_id: i64,
}

/// A request coming from the outside to update a connection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRhcConnection {
    pub extra: Option<Value>,
    pub availability_status: Option<String>,
}
