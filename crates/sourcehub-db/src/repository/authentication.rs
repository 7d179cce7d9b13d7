//! SurrealDB implementation of [`AuthenticationRepository`].
//!
//! Authentications are the polymorphic side of the data model: one
//! table, four possible owner kinds. All owner-specific behavior is
//! delegated to [`crate::owner`], so this file contains exactly one
//! listing path regardless of the owner kind.

use chrono::{DateTime, Utc};
use serde_json::Value;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use sourcehub_core::contracts::SecretStore;
use sourcehub_core::error::{Error, Result};
use sourcehub_core::models::authentication::{Authentication, CreateAuthentication};
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::repository::{
    AuthenticationRepository, Filter, PaginatedResult, Pagination,
};

use crate::error::DbError;
use crate::owner::OwnerResolver;
use crate::repository::{CountRow, bind_filters, filter_clause};

/// Columns callers may filter authentications on.
const FILTERABLE: &[(&str, &str)] = &[
    ("authtype", "authtype"),
    ("username", "username"),
    ("availability_status", "availability_status"),
];

#[derive(Debug, SurrealValue)]
struct AuthenticationRow {
    record_uid: String,
    tenant_id: i64,
    resource_type: String,
    resource_id: i64,
    authtype: Option<String>,
    name: Option<String>,
    username: Option<String>,
    availability_status: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuthenticationRow {
    fn into_authentication(self) -> Result<Authentication> {
        // The column is ASSERT-constrained to the four known tags, so a
        // parse failure here means corrupted storage.
        let resource_type: ResourceType = self.resource_type.parse()?;

        Ok(Authentication {
            uid: self.record_uid,
            tenant_id: self.tenant_id,
            resource_type,
            resource_id: self.resource_id,
            authtype: self.authtype,
            name: self.name,
            username: self.username,
            availability_status: self.availability_status,
            extra: None,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Authentication repository, scoped to
/// one tenant and generic over the secret-enrichment collaborator.
#[derive(Clone)]
pub struct SurrealAuthenticationRepository<C: Connection, S: SecretStore> {
    db: Surreal<C>,
    tenant_id: i64,
    secrets: S,
}

impl<C: Connection, S: SecretStore> SurrealAuthenticationRepository<C, S> {
    pub fn new(db: Surreal<C>, tenant_id: i64, secrets: S) -> Self {
        Self {
            db,
            tenant_id,
            secrets,
        }
    }

    /// Populates the transient `extra` field from the secret provider
    /// for externally managed authtypes. One failure fails the whole
    /// batch: partially enriched listings must never reach the caller.
    async fn enrich(&self, authentications: &mut [Authentication]) -> Result<()> {
        for authentication in authentications.iter_mut() {
            if !authentication.is_externally_managed() {
                continue;
            }

            let extra = self
                .secrets
                .fetch_extra(&authentication.uid, self.tenant_id)
                .await
                .map_err(|reason| Error::SecretEnrichment {
                    uid: authentication.uid.clone(),
                    reason,
                })?;

            authentication.extra = Some(extra);
        }

        Ok(())
    }
}

impl<C: Connection, S: SecretStore> AuthenticationRepository
    for SurrealAuthenticationRepository<C, S>
{
    async fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> Result<PaginatedResult<Authentication>> {
        let clause = filter_clause(FILTERABLE, filters)?;

        let count_query = format!(
            "SELECT count() AS total FROM authentication \
             WHERE tenant_id = $tenant{clause} GROUP ALL"
        );
        let mut count_result = bind_filters(self.db.query(count_query), filters)
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let list_query = format!(
            "SELECT meta::id(id) AS record_uid, * FROM authentication \
             WHERE tenant_id = $tenant{clause} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );
        let mut result = bind_filters(self.db.query(list_query), filters)
            .bind(("tenant", self.tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthenticationRow> = result.take(0).map_err(DbError::from)?;
        let mut items = rows
            .into_iter()
            .map(AuthenticationRow::into_authentication)
            .collect::<Result<Vec<_>>>()?;

        self.enrich(&mut items).await?;

        Ok(PaginatedResult {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    async fn list_for_owner(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
        pagination: Pagination,
        filters: &[Filter],
    ) -> Result<PaginatedResult<Authentication>> {
        // Check that the owner exists before touching the
        // authentication relation.
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(resource_type, resource_id)
            .ensure_exists()
            .await?;

        let clause = filter_clause(FILTERABLE, filters)?;

        let count_query = format!(
            "SELECT count() AS total FROM authentication \
             WHERE resource_type = $resource_type \
             AND resource_id = $resource_id \
             AND tenant_id = $tenant{clause} GROUP ALL"
        );
        let mut count_result = bind_filters(self.db.query(count_query), filters)
            .bind(("resource_type", resource_type.tag()))
            .bind(("resource_id", resource_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let list_query = format!(
            "SELECT meta::id(id) AS record_uid, * FROM authentication \
             WHERE resource_type = $resource_type \
             AND resource_id = $resource_id \
             AND tenant_id = $tenant{clause} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );
        let mut result = bind_filters(self.db.query(list_query), filters)
            .bind(("resource_type", resource_type.tag()))
            .bind(("resource_id", resource_id))
            .bind(("tenant", self.tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthenticationRow> = result.take(0).map_err(DbError::from)?;
        let mut items = rows
            .into_iter()
            .map(AuthenticationRow::into_authentication)
            .collect::<Result<Vec<_>>>()?;

        self.enrich(&mut items).await?;

        Ok(PaginatedResult {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    async fn by_resource(&self, authentication: &Authentication) -> Result<Vec<Authentication>> {
        // Same listing path, keyed by the authentication's own owner
        // reference. Unknown tags never reach this point: they fail at
        // parse time with UnsupportedResourceType.
        let result = self
            .list_for_owner(
                authentication.resource_type,
                authentication.resource_id,
                Pagination::default(),
                &[],
            )
            .await?;

        Ok(result.items)
    }

    async fn create(&self, input: CreateAuthentication) -> Result<Authentication> {
        // No owner existence check: the bulk-ingestion path creates
        // authentications whose owner lands in the same transaction
        // scope. The tenant id comes from this repository's scope,
        // never from the input.
        let uid = Uuid::new_v4().to_string();

        self.db
            .query(
                "CREATE type::record('authentication', $uid) SET \
                 tenant_id = $tenant, \
                 resource_type = $resource_type, \
                 resource_id = $resource_id, \
                 authtype = $authtype, \
                 name = $name, \
                 username = $username, \
                 availability_status = NONE",
            )
            .bind(("uid", uid.clone()))
            .bind(("tenant", self.tenant_id))
            .bind(("resource_type", input.resource_type.tag()))
            .bind(("resource_id", input.resource_id))
            .bind(("authtype", input.authtype))
            .bind(("name", input.name))
            .bind(("username", input.username))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_uid(&uid).await
    }

    async fn get_by_uid(&self, uid: &str) -> Result<Authentication> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_uid, * \
                 FROM type::record('authentication', $uid) \
                 WHERE tenant_id = $tenant",
            )
            .bind(("uid", uid.to_string()))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthenticationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "authentication".into(),
        })?;

        row.into_authentication()
    }

    async fn fetch_and_update(
        &self,
        uid: &str,
        attributes: &serde_json::Map<String, Value>,
    ) -> Result<Authentication> {
        let mut authentication = self.get_by_uid(uid).await?;
        authentication.update_by(attributes)?;

        self.db
            .query(
                "UPDATE type::record('authentication', $uid) SET \
                 name = $name, \
                 username = $username, \
                 availability_status = $availability_status \
                 WHERE tenant_id = $tenant",
            )
            .bind(("uid", uid.to_string()))
            .bind(("tenant", self.tenant_id))
            .bind(("name", authentication.name.clone()))
            .bind(("username", authentication.username.clone()))
            .bind((
                "availability_status",
                authentication.availability_status.clone(),
            ))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_uid(uid).await
    }

    async fn delete(&self, uid: &str) -> Result<Authentication> {
        let authentication = self.get_by_uid(uid).await?;

        self.db
            .query("DELETE type::record('authentication', $uid)")
            .bind(("uid", uid.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(authentication)
    }
}

/// Secret store for wiring paths that must never enrich: it fails
/// loudly if an externally managed authentication is listed through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSecretStore;

impl SecretStore for NoopSecretStore {
    async fn fetch_extra(
        &self,
        authentication_uid: &str,
        _tenant_id: i64,
    ) -> std::result::Result<Value, String> {
        Err(format!(
            "no secret store configured (authentication {authentication_uid})"
        ))
    }
}
