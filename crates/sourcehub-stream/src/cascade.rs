//! Pause/resume cascade with ordered event emission.
//!
//! The row mutation and the event emission are deliberately not one
//! atomic unit: the sink is an external system with no transactional
//! coupling to the store. Rows are persisted first; a publish failure
//! leaves them mutated and reports the failure so the caller can retry.
//! Re-emitting a pause event for an already-paused entity is harmless,
//! so retries of the whole operation are idempotent.

use serde::Serialize;
use tracing::{info, warn};

use sourcehub_core::contracts::{EventSink, Headers};
use sourcehub_core::error::{Error, Result};
use sourcehub_core::repository::{SourceRepository, TenantRepository};

/// Target lifecycle state of a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Paused,
    Active,
}

impl LifecycleState {
    fn is_paused(self) -> bool {
        matches!(self, LifecycleState::Paused)
    }

    fn source_event(self) -> &'static str {
        match self {
            LifecycleState::Paused => "Source.Pause",
            LifecycleState::Active => "Source.Unpause",
        }
    }

    fn application_event(self) -> &'static str {
        match self {
            LifecycleState::Paused => "Application.Pause",
            LifecycleState::Active => "Application.Unpause",
        }
    }
}

/// Drives pause/resume of a source and its applications: one
/// transactional row update, then one event per mutated entity, parent
/// first, children in snapshot order.
pub struct LifecycleService<R, T, S> {
    sources: R,
    tenants: T,
    sink: S,
}

impl<R, T, S> LifecycleService<R, T, S>
where
    R: SourceRepository,
    T: TenantRepository,
    S: EventSink,
{
    pub fn new(sources: R, tenants: T, sink: S) -> Self {
        Self {
            sources,
            tenants,
            sink,
        }
    }

    /// Moves a source and all of its applications to `target`.
    ///
    /// Emits the source event, then one event per application in the
    /// reloaded snapshot order. A publish failure aborts immediately:
    /// remaining children get no event, already-emitted events are not
    /// retracted, and the persisted rows stand either way.
    pub async fn set_lifecycle(
        &self,
        source_id: i64,
        target: LifecycleState,
        headers: &Headers,
    ) -> Result<()> {
        self.sources.set_paused(source_id, target.is_paused()).await?;

        // Reload after the update so the events carry the persisted
        // state, and parent plus children come from one snapshot.
        let snapshot = self.sources.get_with_applications(source_id).await?;
        let tenant = self.tenants.get_by_id(snapshot.source.tenant_id).await?;

        self.publish(
            target.source_event(),
            "source",
            snapshot.source.id.to_string(),
            &snapshot.source.to_event(&tenant.external_tenant),
            headers,
        )
        .await?;

        for application in &snapshot.applications {
            self.publish(
                target.application_event(),
                "application",
                application.id.to_string(),
                &application.to_event(&tenant.external_tenant),
                headers,
            )
            .await?;
        }

        info!(
            source_id,
            applications = snapshot.applications.len(),
            state = ?target,
            "lifecycle cascade completed"
        );

        Ok(())
    }

    async fn publish<E: Serialize>(
        &self,
        event: &str,
        entity: &str,
        id: String,
        projection: &E,
        headers: &Headers,
    ) -> Result<()> {
        let payload = serde_json::to_vec(projection).map_err(|e| Error::Publish {
            event: event.to_string(),
            entity: entity.to_string(),
            id: id.clone(),
            reason: format!("payload serialization failed: {e}"),
        })?;

        if let Err(reason) = self.sink.publish(event, payload, headers).await {
            warn!(event, entity, id, %reason, "event publish failed, aborting cascade");
            return Err(Error::Publish {
                event: event.to_string(),
                entity: entity.to_string(),
                id,
                reason,
            });
        }

        Ok(())
    }
}
