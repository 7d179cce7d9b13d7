//! Polymorphic owner resolution.
//!
//! Every association listing goes through this module so the
//! kind-specific predicates live in one place: adding an owner kind
//! means one enum variant in `sourcehub-core` and one arm in
//! [`owner_table`], never a change at call sites.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::Result;
use sourcehub_core::models::resource_type::ResourceType;

use crate::error::DbError;

/// The storage table that backs each owner kind. The dispatch is a
/// closed, exhaustive match: unknown tags never reach this point — they
/// die in `ResourceType::from_str`.
pub fn owner_table(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Source => "source",
        ResourceType::Endpoint => "endpoint",
        ResourceType::Application => "application",
        ResourceType::ApplicationAuthentication => "application_authentication",
    }
}

/// Classifies polymorphic owner references for one tenant.
#[derive(Clone)]
pub struct OwnerResolver<C: Connection> {
    db: Surreal<C>,
    tenant_id: i64,
}

#[derive(Debug, SurrealValue)]
struct ProbeRow {
    #[allow(dead_code)]
    record_id: i64,
}

impl<C: Connection> OwnerResolver<C> {
    pub fn new(db: Surreal<C>, tenant_id: i64) -> Self {
        Self { db, tenant_id }
    }

    /// Returns a handle for the `(kind, id)` owner reference.
    /// Read-only classification; no queries are issued until the handle
    /// is used.
    pub fn resolve(&self, resource_type: ResourceType, resource_id: i64) -> OwnerHandle<'_, C> {
        OwnerHandle {
            db: &self.db,
            tenant_id: self.tenant_id,
            resource_type,
            resource_id,
        }
    }
}

/// A resolved owner reference, scoped to one tenant.
pub struct OwnerHandle<'a, C: Connection> {
    db: &'a Surreal<C>,
    tenant_id: i64,
    resource_type: ResourceType,
    resource_id: i64,
}

impl<C: Connection> OwnerHandle<'_, C> {
    /// Whether the owner row exists for this tenant. A row of another
    /// tenant is indistinguishable from an absent one.
    pub async fn exists(&self) -> Result<bool> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM type::record($table, $id) \
                 WHERE tenant_id = $tenant",
            )
            .bind(("table", owner_table(self.resource_type)))
            .bind(("id", self.resource_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProbeRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    /// Fails with `NotFound` named after the owner kind when the owner
    /// row is absent. Called before any dependent collection is queried.
    pub async fn ensure_exists(&self) -> Result<()> {
        if self.exists().await? {
            Ok(())
        } else {
            Err(DbError::NotFound {
                entity: self.resource_type.entity_name().to_string(),
            }
            .into())
        }
    }
}
