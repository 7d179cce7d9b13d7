//! ApplicationAuthentication domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link between one application and one authentication (by UID).
///
/// The link row is itself a valid polymorphic owner for further
/// authentications — an edge case the owner resolver supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAuthentication {
    pub id: i64,
    pub tenant_id: i64,
    pub application_id: i64,
    pub authentication_uid: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a new application↔authentication link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationAuthentication {
    pub application_id: i64,
    pub authentication_uid: String,
}
