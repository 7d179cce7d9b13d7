//! Application domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An application attached to a source (cost management, provisioning,
/// ...). Child of exactly one source and always in the source's tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub tenant_id: i64,
    pub source_id: i64,
    pub application_type_id: i64,
    pub availability_status: Option<String>,
    /// `None` = active; set in lockstep with the owning source when a
    /// pause cascade runs.
    pub paused_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Event projection for the outbound stream.
    pub fn to_event(&self, external_tenant: &str) -> ApplicationEvent {
        ApplicationEvent {
            id: self.id,
            source_id: self.source_id,
            application_type_id: self.application_type_id,
            availability_status: self.availability_status.clone(),
            paused_at: self.paused_at,
            tenant: external_tenant.to_string(),
        }
    }
}

/// Fields required to create a new application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplication {
    pub source_id: i64,
    pub application_type_id: i64,
    pub availability_status: Option<String>,
}

/// Externally-published representation of an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationEvent {
    pub id: i64,
    pub source_id: i64,
    pub application_type_id: i64,
    pub availability_status: Option<String>,
    pub paused_at: Option<DateTime<Utc>>,
    pub tenant: String,
}
