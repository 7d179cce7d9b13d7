//! SurrealDB implementation of [`ApplicationRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::Result;
use sourcehub_core::models::application::{Application, CreateApplication};
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::repository::{ApplicationRepository, PaginatedResult, Pagination};

use crate::error::DbError;
use crate::owner::OwnerResolver;
use crate::repository::CountRow;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
pub(crate) struct ApplicationRow {
    record_id: i64,
    tenant_id: i64,
    source_id: i64,
    application_type_id: i64,
    availability_status: Option<String>,
    paused_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    pub(crate) fn into_application(self) -> Application {
        Application {
            id: self.record_id,
            tenant_id: self.tenant_id,
            source_id: self.source_id,
            application_type_id: self.application_type_id,
            availability_status: self.availability_status,
            paused_at: self.paused_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// SurrealDB implementation of the Application repository, scoped to
/// one tenant.
#[derive(Clone)]
pub struct SurrealApplicationRepository<C: Connection> {
    db: Surreal<C>,
    tenant_id: i64,
}

impl<C: Connection> SurrealApplicationRepository<C> {
    pub fn new(db: Surreal<C>, tenant_id: i64) -> Self {
        Self { db, tenant_id }
    }
}

impl<C: Connection> ApplicationRepository for SurrealApplicationRepository<C> {
    async fn create(&self, input: CreateApplication) -> Result<Application> {
        // Children always share the parent's tenant, so the parent must
        // exist for this tenant first.
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, input.source_id)
            .ensure_exists()
            .await?;

        let id = next_id(&self.db, "application").await?;

        self.db
            .query(
                "CREATE type::record('application', $id) SET \
                 tenant_id = $tenant, \
                 source_id = $source_id, \
                 application_type_id = $application_type_id, \
                 availability_status = $availability_status, \
                 paused_at = NONE",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .bind(("source_id", input.source_id))
            .bind(("application_type_id", input.application_type_id))
            .bind(("availability_status", input.availability_status))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Application> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('application', $id) \
                 WHERE tenant_id = $tenant",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "application".into(),
        })?;

        Ok(row.into_application())
    }

    async fn list_for_source(
        &self,
        source_id: i64,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Application>> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, source_id)
            .ensure_exists()
            .await?;

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM application \
                 WHERE source_id = $source_id AND tenant_id = $tenant GROUP ALL",
            )
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM application \
                 WHERE source_id = $source_id AND tenant_id = $tenant \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows
                .into_iter()
                .map(ApplicationRow::into_application)
                .collect(),
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }
}
