//! Endpoint domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A network endpoint belonging to a source.
///
/// At most one endpoint per source may be the default, and a role should
/// be unique within a source; both are checked by the storage layer
/// before writes rather than enforced structurally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: i64,
    pub tenant_id: i64,
    pub source_id: i64,
    pub role: Option<String>,
    pub default: bool,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub verify_ssl: Option<bool>,
    pub availability_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Endpoint {
    /// Applies a partial update described by a field→value map.
    ///
    /// Only fields on the allow-list can be touched; an unknown key is
    /// rejected instead of being passed through to storage.
    pub fn update_by(&mut self, attributes: &serde_json::Map<String, Value>) -> Result<()> {
        for (key, value) in attributes {
            match key.as_str() {
                "role" => self.role = as_opt_string(value),
                "default" => {
                    self.default = value.as_bool().ok_or_else(|| {
                        Error::bad_request("field \"default\" must be a boolean")
                    })?;
                }
                "scheme" => self.scheme = as_opt_string(value),
                "host" => self.host = as_opt_string(value),
                "port" => self.port = value.as_i64(),
                "verify_ssl" => self.verify_ssl = value.as_bool(),
                "availability_status" => self.availability_status = as_opt_string(value),
                unknown => {
                    return Err(Error::bad_request(format!(
                        "endpoint field \"{unknown}\" cannot be updated"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn as_opt_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Fields required to create a new endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEndpoint {
    pub source_id: i64,
    pub role: Option<String>,
    pub default: bool,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub verify_ssl: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint() -> Endpoint {
        Endpoint {
            id: 1,
            tenant_id: 1,
            source_id: 1,
            role: None,
            default: false,
            scheme: None,
            host: None,
            port: None,
            verify_ssl: None,
            availability_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn update_by_applies_known_fields() {
        let mut ep = endpoint();
        let attrs = json!({ "host": "example.com", "port": 8443, "default": true });

        ep.update_by(attrs.as_object().unwrap()).unwrap();

        assert_eq!(ep.host.as_deref(), Some("example.com"));
        assert_eq!(ep.port, Some(8443));
        assert!(ep.default);
    }

    #[test]
    fn update_by_rejects_unknown_fields() {
        let mut ep = endpoint();
        let attrs = json!({ "source_id": 99 });

        let err = ep.update_by(attrs.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        // The row must be untouched.
        assert_eq!(ep.source_id, 1);
    }
}
