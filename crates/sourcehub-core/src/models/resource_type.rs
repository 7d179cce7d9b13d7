//! Polymorphic owner tags.
//!
//! An [`Authentication`](crate::models::authentication::Authentication)
//! belongs to exactly one owning resource, identified by a
//! `(ResourceType, resource_id)` pair. The set of owner kinds is closed:
//! adding a kind means adding a variant here plus one dispatch arm in the
//! storage layer, never touching call sites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of resource kinds that can own authentications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Source,
    Endpoint,
    Application,
    ApplicationAuthentication,
}

impl ResourceType {
    /// The tag stored in the `resource_type` column.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceType::Source => "Source",
            ResourceType::Endpoint => "Endpoint",
            ResourceType::Application => "Application",
            ResourceType::ApplicationAuthentication => "ApplicationAuthentication",
        }
    }

    /// Human-readable entity name used in `NotFound` errors.
    pub fn entity_name(self) -> &'static str {
        match self {
            ResourceType::Source => "source",
            ResourceType::Endpoint => "endpoint",
            ResourceType::Application => "application",
            ResourceType::ApplicationAuthentication => "application authentication",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    /// Any tag outside the four known kinds is a terminal failure, never
    /// a fallback. An empty success would be indistinguishable from "no
    /// authentications" and would mask a data-integrity bug.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Source" => Ok(ResourceType::Source),
            "Endpoint" => Ok(ResourceType::Endpoint),
            "Application" => Ok(ResourceType::Application),
            "ApplicationAuthentication" => Ok(ResourceType::ApplicationAuthentication),
            other => Err(Error::UnsupportedResourceType {
                tag: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_tags() {
        for tag in [
            "Source",
            "Endpoint",
            "Application",
            "ApplicationAuthentication",
        ] {
            let parsed: ResourceType = tag.parse().unwrap();
            assert_eq!(parsed.tag(), tag);
        }
    }

    #[test]
    fn rejects_unknown_tags() {
        for tag in ["SourceType", "source", "", "Sources"] {
            let err = tag.parse::<ResourceType>().unwrap_err();
            assert!(matches!(err, Error::UnsupportedResourceType { .. }));
        }
    }
}
