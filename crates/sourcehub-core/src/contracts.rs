//! External collaborator contracts.
//!
//! The outbound message transport, the secret provider, and the
//! availability checker are external systems; the core only depends on
//! these traits. Implementations are injected through constructors so
//! tests can substitute doubles.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::models::source::Source;

/// Headers copied verbatim onto every emitted event for one inbound
/// request (correlation ids, identity).
pub type Headers = BTreeMap<String, String>;

/// Publish sink for the outbound event stream.
///
/// Delivery is at-least-once and is not transactionally coupled to the
/// relational store: callers must tolerate duplicate events on retry.
pub trait EventSink: Send + Sync {
    fn publish(
        &self,
        event: &str,
        payload: Vec<u8>,
        headers: &Headers,
    ) -> impl Future<Output = std::result::Result<(), String>> + Send;
}

/// Per-authentication secret-material provider (marketplace tokens).
///
/// Called once per listed authentication; each call is a remote call
/// that can fail independently.
pub trait SecretStore: Send + Sync {
    fn fetch_extra(
        &self,
        authentication_uid: &str,
        tenant_id: i64,
    ) -> impl Future<Output = std::result::Result<Value, String>> + Send;
}

/// Availability-check collaborator, driven fire-and-forget: the
/// triggering request only confirms the hand-off, never the outcome.
pub trait AvailabilityChecker: Send + Sync + 'static {
    fn check(&self, source: Source) -> impl Future<Output = Result<()>> + Send;
}
