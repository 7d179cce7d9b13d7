//! Authentication domain model.
//!
//! Authentications are the only entity keyed by a string UID rather than
//! a numeric id, and the only one with a polymorphic owner: any of the
//! four [`ResourceType`] kinds can own them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::resource_type::ResourceType;

/// Authtypes whose `extra` field holds externally managed secret
/// material (marketplace tokens). Listings enrich these transiently from
/// the secret provider; the material is never written back.
const EXTERNALLY_MANAGED_AUTHTYPES: &[&str] = &["marketplace-token"];

/// A credential attached to an owning resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authentication {
    /// String UID, not a numeric id.
    pub uid: String,
    pub tenant_id: i64,
    pub resource_type: ResourceType,
    pub resource_id: i64,
    pub authtype: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub availability_status: Option<String>,
    /// Transient secret material fetched from the external provider at
    /// listing time. Never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Authentication {
    /// Whether this authentication's secret material lives in an
    /// external provider and must be fetched at listing time.
    pub fn is_externally_managed(&self) -> bool {
        self.authtype
            .as_deref()
            .is_some_and(|t| EXTERNALLY_MANAGED_AUTHTYPES.contains(&t))
    }

    /// Applies a partial update described by a field→value map, with an
    /// explicit allow-list. Unknown keys are rejected at the boundary.
    pub fn update_by(&mut self, attributes: &serde_json::Map<String, Value>) -> Result<()> {
        for (key, value) in attributes {
            match key.as_str() {
                "name" => self.name = value.as_str().map(str::to_string),
                "username" => self.username = value.as_str().map(str::to_string),
                "availability_status" => {
                    self.availability_status = value.as_str().map(str::to_string);
                }
                unknown => {
                    return Err(Error::bad_request(format!(
                        "authentication field \"{unknown}\" cannot be updated"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Event projection. The internal numeric tenant id is translated to
    /// the external tenant identifier at emission time.
    pub fn to_event(&self, external_tenant: &str) -> AuthenticationEvent {
        AuthenticationEvent {
            uid: self.uid.clone(),
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            authtype: self.authtype.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            availability_status: self.availability_status.clone(),
            tenant: external_tenant.to_string(),
        }
    }
}

/// Fields required to create a new authentication.
///
/// The tenant id is stamped from the caller's context, never taken from
/// the request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthentication {
    pub resource_type: ResourceType,
    pub resource_id: i64,
    pub authtype: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
}

/// Externally-published representation of an authentication. Secret
/// material is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationEvent {
    pub uid: String,
    pub resource_type: ResourceType,
    pub resource_id: i64,
    pub authtype: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub availability_status: Option<String>,
    pub tenant: String,
}
