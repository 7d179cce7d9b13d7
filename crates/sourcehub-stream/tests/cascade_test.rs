//! Integration tests for the pause/resume cascade using in-memory
//! SurrealDB repositories and recording event sinks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use sourcehub_core::contracts::{EventSink, Headers};
use sourcehub_core::models::application::CreateApplication;
use sourcehub_core::models::source::CreateSource;
use sourcehub_core::models::tenant::CreateTenant;
use sourcehub_core::repository::{
    ApplicationRepository, SourceRepository, TenantRepository,
};
use sourcehub_db::repository::{
    SurrealApplicationRepository, SurrealSourceRepository, SurrealTenantRepository,
};
use sourcehub_stream::{LifecycleService, LifecycleState};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Sink double that records every published event.
#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<(String, Value, Headers)>>>,
}

impl RecordingSink {
    fn recorded(&self) -> Vec<(String, Value, Headers)> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    async fn publish(
        &self,
        event: &str,
        payload: Vec<u8>,
        headers: &Headers,
    ) -> Result<(), String> {
        let body: Value = serde_json::from_slice(&payload).map_err(|e| e.to_string())?;
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), body, headers.clone()));
        Ok(())
    }
}

/// Sink double that fails on the n-th publish (zero-based) and records
/// the successful ones.
#[derive(Clone)]
struct FailingSink {
    fail_at: usize,
    attempts: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<String>>>,
}

impl FailingSink {
    fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            attempts: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl EventSink for FailingSink {
    async fn publish(
        &self,
        event: &str,
        _payload: Vec<u8>,
        _headers: &Headers,
    ) -> Result<(), String> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt == self.fail_at {
            return Err("broker unavailable".into());
        }
        self.recorded.lock().unwrap().push(event.to_string());
        Ok(())
    }
}

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sourcehub_db::run_migrations(&db).await.unwrap();
    db
}

/// Seeds a tenant plus one source with `applications` children; returns
/// (tenant id, external tenant, source id).
async fn seed(db: &Surreal<Db>, applications: usize) -> (i64, String, i64) {
    let tenant = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            external_tenant: "acct-12345".into(),
        })
        .await
        .unwrap();

    let source = SurrealSourceRepository::new(db.clone(), tenant.id)
        .create(CreateSource {
            name: "cascading".into(),
            uid: None,
            source_type_id: 1,
            availability_status: None,
        })
        .await
        .unwrap();

    let application_repo = SurrealApplicationRepository::new(db.clone(), tenant.id);
    for type_id in 0..applications {
        application_repo
            .create(CreateApplication {
                source_id: source.id,
                application_type_id: type_id as i64,
                availability_status: None,
            })
            .await
            .unwrap();
    }

    (tenant.id, tenant.external_tenant, source.id)
}

#[tokio::test]
async fn pausing_emits_parent_then_children_in_order() {
    let db = setup().await;
    let (tenant_id, external_tenant, source_id) = seed(&db, 2).await;

    let sink = RecordingSink::default();
    let service = LifecycleService::new(
        SurrealSourceRepository::new(db.clone(), tenant_id),
        SurrealTenantRepository::new(db.clone()),
        sink.clone(),
    );

    let headers = Headers::from([(
        "x-rh-insights-request-id".to_string(),
        "req-42".to_string(),
    )]);
    service
        .set_lifecycle(source_id, LifecycleState::Paused, &headers)
        .await
        .unwrap();

    let events = sink.recorded();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].0, "Source.Pause");
    assert_eq!(events[1].0, "Application.Pause");
    assert_eq!(events[2].0, "Application.Pause");

    // Every event carries the forwarded headers and the external
    // tenant identifier, never the numeric key.
    for (_, body, event_headers) in &events {
        assert_eq!(
            event_headers.get("x-rh-insights-request-id").map(String::as_str),
            Some("req-42")
        );
        assert_eq!(body["tenant"], Value::String(external_tenant.clone()));
        assert!(!body["paused_at"].is_null());
    }

    // The rows were persisted before any event went out.
    let snapshot = SurrealSourceRepository::new(db, tenant_id)
        .get_with_applications(source_id)
        .await
        .unwrap();
    assert!(snapshot.source.paused_at.is_some());
    assert!(snapshot.applications.iter().all(|a| a.paused_at.is_some()));
}

#[tokio::test]
async fn resuming_clears_the_stamps_and_emits_unpause() {
    let db = setup().await;
    let (tenant_id, _, source_id) = seed(&db, 1).await;

    let sink = RecordingSink::default();
    let service = LifecycleService::new(
        SurrealSourceRepository::new(db.clone(), tenant_id),
        SurrealTenantRepository::new(db.clone()),
        sink.clone(),
    );

    service
        .set_lifecycle(source_id, LifecycleState::Paused, &Headers::new())
        .await
        .unwrap();
    service
        .set_lifecycle(source_id, LifecycleState::Active, &Headers::new())
        .await
        .unwrap();

    let events = sink.recorded();
    assert_eq!(events.len(), 4);
    assert_eq!(events[2].0, "Source.Unpause");
    assert_eq!(events[3].0, "Application.Unpause");
    assert!(events[3].1["paused_at"].is_null());

    let snapshot = SurrealSourceRepository::new(db, tenant_id)
        .get_with_applications(source_id)
        .await
        .unwrap();
    assert!(snapshot.source.paused_at.is_none());
}

#[tokio::test]
async fn child_publish_failure_aborts_without_touching_later_children() {
    let db = setup().await;
    let (tenant_id, _, source_id) = seed(&db, 3).await;

    // Fails on the second application event (attempt index 2: parent,
    // child, child-fails).
    let sink = FailingSink::new(2);
    let service = LifecycleService::new(
        SurrealSourceRepository::new(db.clone(), tenant_id),
        SurrealTenantRepository::new(db.clone()),
        sink.clone(),
    );

    let err = service
        .set_lifecycle(source_id, LifecycleState::Paused, &Headers::new())
        .await
        .unwrap_err();

    match err {
        sourcehub_core::Error::Publish { event, entity, .. } => {
            assert_eq!(event, "Application.Pause");
            assert_eq!(entity, "application");
        }
        other => panic!("expected Publish error, got {other:?}"),
    }

    // Parent plus first child went out; the third child was never
    // attempted.
    assert_eq!(
        sink.recorded.lock().unwrap().clone(),
        vec!["Source.Pause".to_string(), "Application.Pause".to_string()]
    );
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);

    // The row updates stand even though emission failed.
    let snapshot = SurrealSourceRepository::new(db, tenant_id)
        .get_with_applications(source_id)
        .await
        .unwrap();
    assert!(snapshot.source.paused_at.is_some());
    assert!(snapshot.applications.iter().all(|a| a.paused_at.is_some()));
}

#[tokio::test]
async fn parent_publish_failure_aborts_before_any_child_event() {
    let db = setup().await;
    let (tenant_id, _, source_id) = seed(&db, 2).await;

    let sink = FailingSink::new(0);
    let service = LifecycleService::new(
        SurrealSourceRepository::new(db.clone(), tenant_id),
        SurrealTenantRepository::new(db.clone()),
        sink.clone(),
    );

    let err = service
        .set_lifecycle(source_id, LifecycleState::Paused, &Headers::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        sourcehub_core::Error::Publish { ref entity, .. } if entity == "source"
    ));
    assert!(sink.recorded.lock().unwrap().is_empty());
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_source_fails_before_any_event() {
    let db = setup().await;
    let (tenant_id, _, _) = seed(&db, 0).await;

    let sink = RecordingSink::default();
    let service = LifecycleService::new(
        SurrealSourceRepository::new(db.clone(), tenant_id),
        SurrealTenantRepository::new(db),
        sink.clone(),
    );

    let err = service
        .set_lifecycle(9999, LifecycleState::Paused, &Headers::new())
        .await
        .unwrap_err();
    assert!(matches!(err, sourcehub_core::Error::NotFound { .. }));
    assert!(sink.recorded().is_empty());
}

#[tokio::test]
async fn retrying_a_cascade_is_idempotent() {
    let db = setup().await;
    let (tenant_id, _, source_id) = seed(&db, 1).await;

    let sink = RecordingSink::default();
    let service = LifecycleService::new(
        SurrealSourceRepository::new(db.clone(), tenant_id),
        SurrealTenantRepository::new(db.clone()),
        sink.clone(),
    );

    service
        .set_lifecycle(source_id, LifecycleState::Paused, &Headers::new())
        .await
        .unwrap();
    // A retry after a reported failure re-emits; duplicates are the
    // accepted cost of at-least-once delivery.
    service
        .set_lifecycle(source_id, LifecycleState::Paused, &Headers::new())
        .await
        .unwrap();

    let events = sink.recorded();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|(_, body, _)| !body["paused_at"].is_null()));
}
