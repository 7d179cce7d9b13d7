//! SurrealDB implementation of [`SourceRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::Result;
use sourcehub_core::models::application::Application;
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::models::source::{
    CreateSource, Source, SourceWithApplications, UpdateSource,
};
use sourcehub_core::repository::{Filter, PaginatedResult, Pagination, SourceRepository};

use crate::error::DbError;
use crate::owner::OwnerResolver;
use crate::repository::application::ApplicationRow;
use crate::repository::{CountRow, bind_filters, filter_clause};
use crate::sequence::next_id;

/// Columns callers may filter sources on.
const FILTERABLE: &[(&str, &str)] = &[
    ("name", "name"),
    ("availability_status", "availability_status"),
];

/// DB-side row struct; `record_id` carries the integer record key.
#[derive(Debug, SurrealValue)]
pub(crate) struct SourceRow {
    record_id: i64,
    tenant_id: i64,
    name: String,
    uid: Option<String>,
    source_type_id: i64,
    availability_status: Option<String>,
    paused_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SourceRow {
    pub(crate) fn into_source(self) -> Source {
        Source {
            id: self.record_id,
            tenant_id: self.tenant_id,
            name: self.name,
            uid: self.uid,
            source_type_id: self.source_type_id,
            availability_status: self.availability_status,
            paused_at: self.paused_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Row struct for statements that return a record's fields without a
/// `meta::id` projection (UPDATE returns the after-state verbatim).
#[derive(Debug, SurrealValue)]
struct SourceFieldsRow {
    tenant_id: i64,
    name: String,
    uid: Option<String>,
    source_type_id: i64,
    availability_status: Option<String>,
    paused_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SourceFieldsRow {
    fn into_source(self, id: i64) -> Source {
        Source {
            id,
            tenant_id: self.tenant_id,
            name: self.name,
            uid: self.uid,
            source_type_id: self.source_type_id,
            availability_status: self.availability_status,
            paused_at: self.paused_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// SurrealDB implementation of the Source repository, scoped to one
/// tenant.
#[derive(Clone)]
pub struct SurrealSourceRepository<C: Connection> {
    db: Surreal<C>,
    tenant_id: i64,
}

impl<C: Connection> SurrealSourceRepository<C> {
    pub fn new(db: Surreal<C>, tenant_id: i64) -> Self {
        Self { db, tenant_id }
    }
}

impl<C: Connection> SourceRepository for SurrealSourceRepository<C> {
    async fn create(&self, input: CreateSource) -> Result<Source> {
        let id = next_id(&self.db, "source").await?;

        self.db
            .query(
                "CREATE type::record('source', $id) SET \
                 tenant_id = $tenant, \
                 name = $name, \
                 uid = $uid, \
                 source_type_id = $source_type_id, \
                 availability_status = $availability_status, \
                 paused_at = NONE",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .bind(("name", input.name))
            .bind(("uid", input.uid))
            .bind(("source_type_id", input.source_type_id))
            .bind(("availability_status", input.availability_status))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Source> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('source', $id) \
                 WHERE tenant_id = $tenant",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "source".into(),
        })?;

        Ok(row.into_source())
    }

    async fn get_with_applications(&self, id: i64) -> Result<SourceWithApplications> {
        // One transaction so the parent and its children come from the
        // same snapshot; the cascade iterates this order.
        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('source', $id) \
                 WHERE tenant_id = $tenant; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM application \
                 WHERE source_id = $id AND tenant_id = $tenant \
                 ORDER BY created_at ASC; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let source_rows: Vec<SourceRow> = result.take(0).map_err(DbError::from)?;
        let source = source_rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "source".into(),
            })?
            .into_source();

        let application_rows: Vec<ApplicationRow> = result.take(1).map_err(DbError::from)?;
        let applications: Vec<Application> = application_rows
            .into_iter()
            .map(ApplicationRow::into_application)
            .collect();

        Ok(SourceWithApplications {
            source,
            applications,
        })
    }

    async fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> Result<PaginatedResult<Source>> {
        let clause = filter_clause(FILTERABLE, filters)?;

        let count_query = format!(
            "SELECT count() AS total FROM source \
             WHERE tenant_id = $tenant{clause} GROUP ALL"
        );
        let mut count_result = bind_filters(self.db.query(count_query), filters)
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM source \
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

        let rows: Vec<SourceRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows.into_iter().map(SourceRow::into_source).collect(),
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    async fn update(&self, id: i64, input: UpdateSource) -> Result<Source> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.availability_status.is_some() {
            sets.push("availability_status = $availability_status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('source', $id) SET {} WHERE tenant_id = $tenant",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id))
            .bind(("tenant", self.tenant_id));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(availability_status) = input.availability_status {
            builder = builder.bind(("availability_status", availability_status));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<SourceFieldsRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "source".into(),
        })?;

        Ok(row.into_source(id))
    }

    async fn delete(&self, id: i64) -> Result<Source> {
        let source = self.get_by_id(id).await?;

        self.db
            .query("DELETE type::record('source', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(source)
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, id)
            .exists()
            .await
    }

    async fn set_paused(&self, id: i64, paused: bool) -> Result<()> {
        let paused_at: Option<DateTime<Utc>> = paused.then(Utc::now);

        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('source', $id) SET \
                 paused_at = $paused_at, updated_at = time::now() \
                 WHERE tenant_id = $tenant; \
                 UPDATE application SET \
                 paused_at = $paused_at, updated_at = time::now() \
                 WHERE source_id = $id AND tenant_id = $tenant; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .bind(("paused_at", paused_at))
            .await
            .map_err(DbError::from)?;

        let updated: Vec<SourceFieldsRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Err(DbError::NotFound {
                entity: "source".into(),
            }
            .into());
        }

        Ok(())
    }
}
