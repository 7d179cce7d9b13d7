//! Integration tests for the Authentication and
//! ApplicationAuthentication repository implementations using in-memory
//! SurrealDB.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use sourcehub_core::contracts::SecretStore;
use sourcehub_core::models::application::CreateApplication;
use sourcehub_core::models::application_authentication::CreateApplicationAuthentication;
use sourcehub_core::models::authentication::CreateAuthentication;
use sourcehub_core::models::endpoint::CreateEndpoint;
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::models::source::CreateSource;
use sourcehub_core::repository::{
    ApplicationAuthenticationRepository, ApplicationRepository, AuthenticationRepository,
    EndpointRepository, Pagination, SourceRepository,
};
use sourcehub_db::repository::{
    NoopSecretStore, SurrealApplicationAuthenticationRepository, SurrealApplicationRepository,
    SurrealAuthenticationRepository, SurrealEndpointRepository, SurrealSourceRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Secret store double that counts remote calls and hands out a token
/// derived from the UID.
#[derive(Clone, Default)]
struct CountingSecretStore {
    calls: Arc<AtomicUsize>,
}

impl SecretStore for CountingSecretStore {
    async fn fetch_extra(
        &self,
        authentication_uid: &str,
        _tenant_id: i64,
    ) -> Result<Value, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "token": format!("secret-{authentication_uid}") }))
    }
}

/// Secret store double whose every call fails.
#[derive(Clone, Copy)]
struct FailingSecretStore;

impl SecretStore for FailingSecretStore {
    async fn fetch_extra(
        &self,
        _authentication_uid: &str,
        _tenant_id: i64,
    ) -> Result<Value, String> {
        Err("provider unreachable".into())
    }
}

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sourcehub_db::run_migrations(&db).await.unwrap();
    db
}

async fn seed_source(db: &Surreal<Db>, tenant_id: i64) -> i64 {
    SurrealSourceRepository::new(db.clone(), tenant_id)
        .create(CreateSource {
            name: "auth-holder".into(),
            uid: None,
            source_type_id: 1,
            availability_status: None,
        })
        .await
        .unwrap()
        .id
}

fn create_auth(
    resource_type: ResourceType,
    resource_id: i64,
    authtype: Option<&str>,
) -> CreateAuthentication {
    CreateAuthentication {
        resource_type,
        resource_id,
        authtype: authtype.map(str::to_string),
        name: Some("credential".into()),
        username: Some("admin".into()),
    }
}

// -----------------------------------------------------------------------
// CRUD
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_authentication() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let repo = SurrealAuthenticationRepository::new(db, 1, NoopSecretStore);

    let auth = repo
        .create(create_auth(ResourceType::Source, source_id, Some("username_password")))
        .await
        .unwrap();
    assert!(!auth.uid.is_empty());
    assert_eq!(auth.tenant_id, 1);
    assert_eq!(auth.resource_type, ResourceType::Source);
    assert_eq!(auth.resource_id, source_id);

    let fetched = repo.get_by_uid(&auth.uid).await.unwrap();
    assert_eq!(fetched.uid, auth.uid);
    assert_eq!(fetched.username.as_deref(), Some("admin"));
}

#[tokio::test]
async fn create_does_not_require_the_owner_to_exist_yet() {
    // The bulk-ingestion path writes authentications before their owner
    // row is visible.
    let db = setup().await;
    let repo = SurrealAuthenticationRepository::new(db, 1, NoopSecretStore);

    let auth = repo
        .create(create_auth(ResourceType::Application, 12345, None))
        .await
        .unwrap();
    assert_eq!(auth.resource_id, 12345);
}

#[tokio::test]
async fn fetch_and_update_applies_the_allow_list() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let repo = SurrealAuthenticationRepository::new(db, 1, NoopSecretStore);

    let auth = repo
        .create(create_auth(ResourceType::Source, source_id, None))
        .await
        .unwrap();

    let attrs = json!({ "username": "root", "availability_status": "available" });
    let updated = repo
        .fetch_and_update(&auth.uid, attrs.as_object().unwrap())
        .await
        .unwrap();
    assert_eq!(updated.username.as_deref(), Some("root"));
    assert_eq!(updated.availability_status.as_deref(), Some("available"));
    assert_eq!(updated.name.as_deref(), Some("credential")); // unchanged

    let attrs = json!({ "resource_id": 7 });
    let err = repo
        .fetch_and_update(&auth.uid, attrs.as_object().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, sourcehub_core::Error::BadRequest { .. }));
}

#[tokio::test]
async fn delete_authentication_returns_the_deleted_row() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let repo = SurrealAuthenticationRepository::new(db, 1, NoopSecretStore);

    let auth = repo
        .create(create_auth(ResourceType::Source, source_id, None))
        .await
        .unwrap();
    let deleted = repo.delete(&auth.uid).await.unwrap();
    assert_eq!(deleted.uid, auth.uid);

    assert!(repo.get_by_uid(&auth.uid).await.is_err());
}

#[tokio::test]
async fn authentications_are_tenant_isolated() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let repo = SurrealAuthenticationRepository::new(db.clone(), 1, NoopSecretStore);
    let foreign = SurrealAuthenticationRepository::new(db.clone(), 2, NoopSecretStore);

    let auth = repo
        .create(create_auth(ResourceType::Source, source_id, None))
        .await
        .unwrap();

    assert!(foreign.get_by_uid(&auth.uid).await.is_err());

    // The owner itself is invisible to the other tenant, so the listing
    // fails fast instead of returning an empty page.
    let err = foreign
        .list_for_owner(ResourceType::Source, source_id, Pagination::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, sourcehub_core::Error::NotFound { .. }));

    // An owner of the other tenant never leaks tenant one's rows.
    let foreign_source_id = seed_source(&db, 2).await;
    let listed = foreign
        .list_for_owner(ResourceType::Source, foreign_source_id, Pagination::default(), &[])
        .await
        .unwrap();
    assert!(listed.items.is_empty());
}

// -----------------------------------------------------------------------
// Polymorphic owner listing
// -----------------------------------------------------------------------

#[tokio::test]
async fn list_for_owner_covers_every_owner_kind() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;

    let application = SurrealApplicationRepository::new(db.clone(), 1)
        .create(CreateApplication {
            source_id,
            application_type_id: 1,
            availability_status: None,
        })
        .await
        .unwrap();
    let endpoint = SurrealEndpointRepository::new(db.clone(), 1)
        .create(CreateEndpoint {
            source_id,
            role: None,
            default: false,
            scheme: None,
            host: None,
            port: None,
            verify_ssl: None,
        })
        .await
        .unwrap();

    let auths = SurrealAuthenticationRepository::new(db.clone(), 1, NoopSecretStore);
    let link_auth = auths
        .create(create_auth(ResourceType::Application, application.id, None))
        .await
        .unwrap();
    let link = SurrealApplicationAuthenticationRepository::new(db, 1)
        .create(CreateApplicationAuthentication {
            application_id: application.id,
            authentication_uid: link_auth.uid.clone(),
        })
        .await
        .unwrap();

    let owners = [
        (ResourceType::Source, source_id),
        (ResourceType::Application, application.id),
        (ResourceType::Endpoint, endpoint.id),
        (ResourceType::ApplicationAuthentication, link.id),
    ];
    for (resource_type, resource_id) in owners {
        auths
            .create(create_auth(resource_type, resource_id, None))
            .await
            .unwrap();

        let listed = auths
            .list_for_owner(resource_type, resource_id, Pagination::default(), &[])
            .await
            .unwrap();
        assert!(
            listed.items.iter().all(|a| {
                a.resource_type == resource_type && a.resource_id == resource_id
            }),
            "listing for {resource_type:?} leaked foreign rows"
        );
        assert!(listed.total >= 1);
    }
}

#[tokio::test]
async fn list_for_missing_owner_fails_before_any_secret_call() {
    let db = setup().await;
    let store = CountingSecretStore::default();
    let repo = SurrealAuthenticationRepository::new(db, 1, store.clone());

    for resource_type in [
        ResourceType::Source,
        ResourceType::Endpoint,
        ResourceType::Application,
        ResourceType::ApplicationAuthentication,
    ] {
        let err = repo
            .list_for_owner(resource_type, 404, Pagination::default(), &[])
            .await
            .unwrap_err();
        assert!(
            matches!(err, sourcehub_core::Error::NotFound { .. }),
            "missing {resource_type:?} owner must be NotFound"
        );
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn by_resource_returns_owner_siblings() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let repo = SurrealAuthenticationRepository::new(db, 1, NoopSecretStore);

    let first = repo
        .create(create_auth(ResourceType::Source, source_id, None))
        .await
        .unwrap();
    let second = repo
        .create(create_auth(ResourceType::Source, source_id, None))
        .await
        .unwrap();

    let siblings = repo.by_resource(&first).await.unwrap();
    let uids: Vec<&str> = siblings.iter().map(|a| a.uid.as_str()).collect();
    assert!(uids.contains(&first.uid.as_str()));
    assert!(uids.contains(&second.uid.as_str()));
}

// -----------------------------------------------------------------------
// Secret enrichment
// -----------------------------------------------------------------------

#[tokio::test]
async fn only_externally_managed_rows_are_enriched() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let store = CountingSecretStore::default();
    let repo = SurrealAuthenticationRepository::new(db, 1, store.clone());

    let token = repo
        .create(create_auth(ResourceType::Source, source_id, Some("marketplace-token")))
        .await
        .unwrap();
    repo.create(create_auth(ResourceType::Source, source_id, Some("username_password")))
        .await
        .unwrap();

    let listed = repo
        .list_for_owner(ResourceType::Source, source_id, Pagination::default(), &[])
        .await
        .unwrap();

    // Exactly one remote call: one marketplace token in the batch.
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);

    for auth in &listed.items {
        if auth.uid == token.uid {
            assert_eq!(
                auth.extra,
                Some(json!({ "token": format!("secret-{}", token.uid) }))
            );
        } else {
            assert!(auth.extra.is_none());
        }
    }
}

#[tokio::test]
async fn one_enrichment_failure_fails_the_whole_listing() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let writer = SurrealAuthenticationRepository::new(db.clone(), 1, NoopSecretStore);

    writer
        .create(create_auth(ResourceType::Source, source_id, Some("marketplace-token")))
        .await
        .unwrap();

    let reader = SurrealAuthenticationRepository::new(db, 1, FailingSecretStore);
    let err = reader
        .list_for_owner(ResourceType::Source, source_id, Pagination::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, sourcehub_core::Error::SecretEnrichment { .. }));
}

// -----------------------------------------------------------------------
// Application ↔ Authentication links
// -----------------------------------------------------------------------

#[tokio::test]
async fn link_crud_and_lookups() {
    let db = setup().await;
    let source_id = seed_source(&db, 1).await;
    let application = SurrealApplicationRepository::new(db.clone(), 1)
        .create(CreateApplication {
            source_id,
            application_type_id: 1,
            availability_status: None,
        })
        .await
        .unwrap();
    let auth = SurrealAuthenticationRepository::new(db.clone(), 1, NoopSecretStore)
        .create(create_auth(ResourceType::Application, application.id, None))
        .await
        .unwrap();

    let links = SurrealApplicationAuthenticationRepository::new(db, 1);
    let link = links
        .create(CreateApplicationAuthentication {
            application_id: application.id,
            authentication_uid: auth.uid.clone(),
        })
        .await
        .unwrap();
    assert_eq!(link.application_id, application.id);
    assert_eq!(link.authentication_uid, auth.uid);

    let by_app = links.by_applications(&[application.id]).await.unwrap();
    assert_eq!(by_app.len(), 1);
    assert_eq!(by_app[0].id, link.id);

    let by_auth = links.by_authentications(&[auth.uid.clone()]).await.unwrap();
    assert_eq!(by_auth.len(), 1);

    assert!(links.by_applications(&[]).await.unwrap().is_empty());

    // A second identical link violates the unique pair index.
    let err = links
        .create(CreateApplicationAuthentication {
            application_id: application.id,
            authentication_uid: auth.uid.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, sourcehub_core::Error::Conflict { .. }));

    links.delete(link.id).await.unwrap();
    assert!(links.get_by_id(link.id).await.is_err());
}
