//! Source domain model.
//!
//! A source is one external integration (cloud account, Satellite,
//! OpenShift cluster, ...). It owns applications and endpoints; pausing a
//! source cascades to its applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::application::Application;

/// An external integration registered for a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    /// Stable external UID, if the caller supplied one at creation.
    pub uid: Option<String>,
    pub source_type_id: i64,
    pub availability_status: Option<String>,
    /// `None` = active; `Some` = paused at that instant.
    pub paused_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Event projection for the outbound stream.
    pub fn to_event(&self, external_tenant: &str) -> SourceEvent {
        SourceEvent {
            id: self.id,
            name: self.name.clone(),
            uid: self.uid.clone(),
            source_type_id: self.source_type_id,
            availability_status: self.availability_status.clone(),
            paused_at: self.paused_at,
            tenant: external_tenant.to_string(),
        }
    }
}

/// Fields required to create a new source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSource {
    pub name: String,
    pub uid: Option<String>,
    pub source_type_id: i64,
    pub availability_status: Option<String>,
}

/// Fields that can be updated on an existing source.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSource {
    pub name: Option<String>,
    pub availability_status: Option<String>,
}

/// A source together with its application children, loaded in one
/// consistent read. This is the snapshot the pause/resume cascade
/// iterates over.
#[derive(Debug, Clone)]
pub struct SourceWithApplications {
    pub source: Source,
    pub applications: Vec<Application>,
}

/// Externally-published representation of a source, distinct from its
/// API response shape. Carries the external tenant identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEvent {
    pub id: i64,
    pub name: String,
    pub uid: Option<String>,
    pub source_type_id: i64,
    pub availability_status: Option<String>,
    pub paused_at: Option<DateTime<Utc>>,
    pub tenant: String,
}
