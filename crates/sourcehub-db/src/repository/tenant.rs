//! SurrealDB implementation of [`TenantRepository`].
//!
//! The only repository that is not itself tenant-scoped: it hands out
//! the tenant rows everything else is scoped by.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::Result;
use sourcehub_core::models::tenant::{CreateTenant, Tenant};
use sourcehub_core::repository::TenantRepository;

use crate::error::DbError;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct TenantRow {
    record_id: i64,
    external_tenant: String,
}

impl TenantRow {
    fn into_tenant(self) -> Tenant {
        Tenant {
            id: self.record_id,
            external_tenant: self.external_tenant,
        }
    }
}

#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> Result<Tenant> {
        let id = next_id(&self.db, "tenant").await?;

        self.db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 external_tenant = $external_tenant",
            )
            .bind(("id", id))
            .bind(("external_tenant", input.external_tenant))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Tenant> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('tenant', $id)",
            )
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
        })?;

        Ok(row.into_tenant())
    }
}
