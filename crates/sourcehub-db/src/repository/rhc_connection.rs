//! SurrealDB implementation of [`RhcConnectionRepository`].
//!
//! Connection rows are shared across tenants; tenancy lives on the
//! `source_rhc_connection` join rows. Every read aggregates FROM the
//! join table so a listed connection carries the ids of all sources it
//! is linked to for the querying tenant, and a connection with no link
//! for the tenant is invisible to it.

use serde_json::Value;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::{Error, Result};
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::models::rhc_connection::{
    CreateRhcConnection, RhcConnection, UpdateRhcConnection,
};
use sourcehub_core::models::source::Source;
use sourcehub_core::repository::{
    Filter, PaginatedResult, Pagination, RhcConnectionRepository,
};

use crate::error::DbError;
use crate::mapper::{self, SOURCE_ID_DELIMITER};
use crate::owner::OwnerResolver;
use crate::repository::source::SourceRow;
use crate::repository::{CountRow, bind_filters, filter_clause};
use crate::sequence::next_id;

/// Columns callers may filter connections on. The data lives on the
/// referenced connection record, so the column expressions traverse the
/// join edge.
const FILTERABLE: &[(&str, &str)] = &[
    ("rhc_id", "rhc_connection_id.rhc_id"),
    (
        "availability_status",
        "rhc_connection_id.availability_status",
    ),
];

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: i64,
}

/// Projection shared by every aggregated read. `{clause}` receives the
/// extra WHERE fragments, `{delim}` the source-id delimiter.
fn aggregation_query(clause: &str) -> String {
    format!(
        "SELECT id, rhc_id, extra, availability_status, \
         array::join(source_ids, '{delim}') AS source_ids \
         FROM ( \
         SELECT \
         meta::id(rhc_connection_id) AS id, \
         rhc_connection_id.rhc_id AS rhc_id, \
         rhc_connection_id.extra AS extra, \
         rhc_connection_id.availability_status AS availability_status, \
         array::group(<string> source_id) AS source_ids \
         FROM source_rhc_connection \
         WHERE tenant_id = $tenant{clause} \
         GROUP BY id, rhc_id, extra, availability_status \
         )",
        delim = SOURCE_ID_DELIMITER,
    )
}

/// SurrealDB implementation of the RHC connection repository, scoped to
/// one tenant.
#[derive(Clone)]
pub struct SurrealRhcConnectionRepository<C: Connection> {
    db: Surreal<C>,
    tenant_id: i64,
}

impl<C: Connection> SurrealRhcConnectionRepository<C> {
    pub fn new(db: Surreal<C>, tenant_id: i64) -> Self {
        Self { db, tenant_id }
    }

    async fn connection_id_by_rhc_id(&self, rhc_id: &str) -> Result<Option<i64>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM rhc_connection \
                 WHERE rhc_id = $rhc_id LIMIT 1",
            )
            .bind(("rhc_id", rhc_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row.record_id))
    }
}

impl<C: Connection> RhcConnectionRepository for SurrealRhcConnectionRepository<C> {
    async fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> Result<PaginatedResult<RhcConnection>> {
        let clause = filter_clause(FILTERABLE, filters)?;

        // One join row per (connection, source) pair, so the distinct
        // connection count needs its own grouped subquery.
        let count_query = format!(
            "SELECT count() AS total FROM ( \
             SELECT rhc_connection_id FROM source_rhc_connection \
             WHERE tenant_id = $tenant{clause} \
             GROUP BY rhc_connection_id \
             ) GROUP ALL"
        );
        let mut count_result = bind_filters(self.db.query(count_query), filters)
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let list_query = format!(
            "{} ORDER BY id ASC LIMIT $limit START $offset",
            aggregation_query(&clause)
        );
        let mut result = bind_filters(self.db.query(list_query), filters)
            .bind(("tenant", self.tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<Value> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .iter()
            .map(mapper::map_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(PaginatedResult {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<RhcConnection> {
        let query = aggregation_query(
            " AND rhc_connection_id = type::record('rhc_connection', $conn)",
        );
        let mut result = self
            .db
            .query(query)
            .bind(("tenant", self.tenant_id))
            .bind(("conn", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<Value> = result.take(0).map_err(DbError::from)?;

        if rows.len() > 1 {
            return Err(DbError::Inconsistent(format!(
                "aggregation for rhc_connection {id} returned {} rows",
                rows.len()
            ))
            .into());
        }

        let row = rows.first().ok_or_else(|| DbError::NotFound {
            entity: "rhc_connection".into(),
        })?;

        mapper::map_row(row)
    }

    async fn create(&self, input: CreateRhcConnection) -> Result<RhcConnection> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, input.source_id)
            .ensure_exists()
            .await?;

        // The fresh id is allocated up front; the transaction only uses
        // it when no connection with this rhc_id exists yet.
        let new_id = next_id(&self.db, "rhc_connection").await?;

        let created = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $existing = (SELECT meta::id(id) AS record_id FROM rhc_connection \
                 WHERE rhc_id = $rhc_id LIMIT 1); \
                 LET $conn = IF array::len($existing) > 0 { \
                 $existing[0].record_id \
                 } ELSE { \
                 CREATE type::record('rhc_connection', $new_id) SET \
                 rhc_id = $rhc_id, extra = $extra, availability_status = NONE; \
                 $new_id \
                 }; \
                 CREATE type::record('source_rhc_connection', [$source_id, $conn]) SET \
                 source_id = $source_id, \
                 rhc_connection_id = type::record('rhc_connection', $conn), \
                 tenant_id = $tenant; \
                 COMMIT TRANSACTION;",
            )
            .bind(("rhc_id", input.rhc_id.clone()))
            .bind(("extra", input.extra))
            .bind(("new_id", new_id))
            .bind(("source_id", input.source_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?
            .take_errors();

        if !created.is_empty() {
            // A pre-existing join row makes the composite-keyed CREATE
            // fail and rolls the whole transaction back, so a duplicate
            // request never leaves an orphan connection row. The other
            // statements only report the aborted transaction, so every
            // statement error has to be inspected for the duplicate.
            if created
                .values()
                .any(|error| error.to_string().contains("already exists"))
            {
                let rhc_connection_id = self
                    .connection_id_by_rhc_id(&input.rhc_id)
                    .await?
                    .unwrap_or(new_id);
                return Err(Error::AlreadyLinked {
                    source_id: input.source_id,
                    rhc_connection_id,
                });
            }
            let error = created
                .into_iter()
                .min_by_key(|(index, _)| *index)
                .map(|(_, error)| error)
                .expect("non-empty error map has a first entry");
            return Err(DbError::from(error).into());
        }

        let id = self
            .connection_id_by_rhc_id(&input.rhc_id)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "rhc_connection".into(),
            })?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: i64, input: UpdateRhcConnection) -> Result<RhcConnection> {
        // Visibility check: the connection must be linked to this
        // tenant before it can be updated through it.
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.extra.is_some() {
            sets.push("extra = $extra");
        }
        if input.availability_status.is_some() {
            sets.push("availability_status = $availability_status");
        }

        if !sets.is_empty() {
            let query = format!(
                "UPDATE type::record('rhc_connection', $id) SET {}",
                sets.join(", ")
            );

            let mut builder = self.db.query(&query).bind(("id", id));
            if let Some(extra) = input.extra {
                builder = builder.bind(("extra", extra));
            }
            if let Some(availability_status) = input.availability_status {
                builder = builder.bind(("availability_status", availability_status));
            }

            builder
                .await
                .map_err(DbError::from)?
                .check()
                .map_err(DbError::from)?;
        }

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.get_by_id(id).await?;

        // The join rows go in the same transaction; no dangling edges
        // survive a connection delete.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE source_rhc_connection \
                 WHERE rhc_connection_id = type::record('rhc_connection', $id); \
                 DELETE type::record('rhc_connection', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn related_sources(
        &self,
        rhc_connection_id: i64,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Source>> {
        self.get_by_id(rhc_connection_id).await?;

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM source_rhc_connection \
                 WHERE rhc_connection_id = type::record('rhc_connection', $conn) \
                 AND tenant_id = $tenant GROUP ALL",
            )
            .bind(("conn", rhc_connection_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM source \
                 WHERE tenant_id = $tenant AND meta::id(id) IN ( \
                 SELECT VALUE source_id FROM source_rhc_connection \
                 WHERE rhc_connection_id = type::record('rhc_connection', $conn) \
                 AND tenant_id = $tenant \
                 ) \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("conn", rhc_connection_id))
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

    async fn list_for_source(
        &self,
        source_id: i64,
        pagination: Pagination,
    ) -> Result<PaginatedResult<RhcConnection>> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, source_id)
            .ensure_exists()
            .await?;

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM source_rhc_connection \
                 WHERE source_id = $source_id AND tenant_id = $tenant GROUP ALL",
            )
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        // Aggregate over every tenant join of the matched connections,
        // so each returned connection still carries its full source-id
        // list rather than just the queried source.
        let list_query = format!(
            "{} ORDER BY id ASC LIMIT $limit START $offset",
            aggregation_query(
                " AND rhc_connection_id IN ( \
                 SELECT VALUE rhc_connection_id FROM source_rhc_connection \
                 WHERE source_id = $source_id AND tenant_id = $tenant \
                 )",
            )
        );
        let mut result = self
            .db
            .query(list_query)
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<Value> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .iter()
            .map(mapper::map_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(PaginatedResult {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }
}
