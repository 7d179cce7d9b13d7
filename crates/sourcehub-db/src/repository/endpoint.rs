//! SurrealDB implementation of [`EndpointRepository`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::Result;
use sourcehub_core::models::endpoint::{CreateEndpoint, Endpoint};
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::repository::{EndpointRepository, Filter, PaginatedResult, Pagination};

use crate::error::DbError;
use crate::owner::OwnerResolver;
use crate::repository::{CountRow, bind_filters, filter_clause};
use crate::sequence::next_id;

/// Columns callers may filter endpoints on.
const FILTERABLE: &[(&str, &str)] = &[
    ("role", "role"),
    ("availability_status", "availability_status"),
];

#[derive(Debug, SurrealValue)]
struct EndpointRow {
    record_id: i64,
    tenant_id: i64,
    source_id: i64,
    role: Option<String>,
    is_default: bool,
    scheme: Option<String>,
    host: Option<String>,
    port: Option<i64>,
    verify_ssl: Option<bool>,
    availability_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EndpointRow {
    fn into_endpoint(self) -> Endpoint {
        Endpoint {
            id: self.record_id,
            tenant_id: self.tenant_id,
            source_id: self.source_id,
            role: self.role,
            default: self.is_default,
            scheme: self.scheme,
            host: self.host,
            port: self.port,
            verify_ssl: self.verify_ssl,
            availability_status: self.availability_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct ProbeRow {
    #[allow(dead_code)]
    record_id: i64,
}

/// SurrealDB implementation of the Endpoint repository, scoped to one
/// tenant.
#[derive(Clone)]
pub struct SurrealEndpointRepository<C: Connection> {
    db: Surreal<C>,
    tenant_id: i64,
}

impl<C: Connection> SurrealEndpointRepository<C> {
    pub fn new(db: Surreal<C>, tenant_id: i64) -> Self {
        Self { db, tenant_id }
    }

    async fn probe(&self, query: &str, source_id: i64) -> Result<bool> {
        let mut result = self
            .db
            .query(query)
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProbeRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }
}

impl<C: Connection> EndpointRepository for SurrealEndpointRepository<C> {
    async fn create(&self, input: CreateEndpoint) -> Result<Endpoint> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, input.source_id)
            .ensure_exists()
            .await?;

        let id = next_id(&self.db, "endpoint").await?;

        self.db
            .query(
                "CREATE type::record('endpoint', $id) SET \
                 tenant_id = $tenant, \
                 source_id = $source_id, \
                 role = $role, \
                 is_default = $is_default, \
                 scheme = $scheme, \
                 host = $host, \
                 port = $port, \
                 verify_ssl = $verify_ssl, \
                 availability_status = NONE",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .bind(("source_id", input.source_id))
            .bind(("role", input.role))
            .bind(("is_default", input.default))
            .bind(("scheme", input.scheme))
            .bind(("host", input.host))
            .bind(("port", input.port))
            .bind(("verify_ssl", input.verify_ssl))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Endpoint> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('endpoint', $id) \
                 WHERE tenant_id = $tenant",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EndpointRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "endpoint".into(),
        })?;

        Ok(row.into_endpoint())
    }

    async fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> Result<PaginatedResult<Endpoint>> {
        let clause = filter_clause(FILTERABLE, filters)?;

        let count_query = format!(
            "SELECT count() AS total FROM endpoint \
             WHERE tenant_id = $tenant{clause} GROUP ALL"
        );
        let mut count_result = bind_filters(self.db.query(count_query), filters)
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM endpoint \
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

        let rows: Vec<EndpointRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows.into_iter().map(EndpointRow::into_endpoint).collect(),
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    async fn list_for_source(
        &self,
        source_id: i64,
        pagination: Pagination,
        filters: &[Filter],
    ) -> Result<PaginatedResult<Endpoint>> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Source, source_id)
            .ensure_exists()
            .await?;

        let clause = filter_clause(FILTERABLE, filters)?;

        let count_query = format!(
            "SELECT count() AS total FROM endpoint \
             WHERE source_id = $source_id AND tenant_id = $tenant{clause} GROUP ALL"
        );
        let mut count_result = bind_filters(self.db.query(count_query), filters)
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;
        let total = CountRow::first_total(count_result.take(0).map_err(DbError::from)?);

        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM endpoint \
             WHERE source_id = $source_id AND tenant_id = $tenant{clause} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );
        let mut result = bind_filters(self.db.query(list_query), filters)
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EndpointRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows.into_iter().map(EndpointRow::into_endpoint).collect(),
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }

    async fn fetch_and_update(
        &self,
        id: i64,
        attributes: &serde_json::Map<String, Value>,
    ) -> Result<Endpoint> {
        let mut endpoint = self.get_by_id(id).await?;
        endpoint.update_by(attributes)?;

        self.db
            .query(
                "UPDATE type::record('endpoint', $id) SET \
                 role = $role, \
                 is_default = $is_default, \
                 scheme = $scheme, \
                 host = $host, \
                 port = $port, \
                 verify_ssl = $verify_ssl, \
                 availability_status = $availability_status, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .bind(("role", endpoint.role.clone()))
            .bind(("is_default", endpoint.default))
            .bind(("scheme", endpoint.scheme.clone()))
            .bind(("host", endpoint.host.clone()))
            .bind(("port", endpoint.port))
            .bind(("verify_ssl", endpoint.verify_ssl))
            .bind(("availability_status", endpoint.availability_status.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<Endpoint> {
        let endpoint = self.get_by_id(id).await?;

        self.db
            .query("DELETE type::record('endpoint', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(endpoint)
    }

    async fn can_be_default_for_source(&self, source_id: i64) -> Result<bool> {
        // True when no endpoint of the source is flagged as default yet.
        let has_default = self
            .probe(
                "SELECT meta::id(id) AS record_id FROM endpoint \
                 WHERE source_id = $source_id AND tenant_id = $tenant \
                 AND is_default = true LIMIT 1",
                source_id,
            )
            .await?;

        Ok(!has_default)
    }

    async fn is_role_unique_for_source(&self, role: &str, source_id: i64) -> Result<bool> {
        let role = role.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM endpoint \
                 WHERE source_id = $source_id AND tenant_id = $tenant \
                 AND role = $role LIMIT 1",
            )
            .bind(("source_id", source_id))
            .bind(("tenant", self.tenant_id))
            .bind(("role", role))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProbeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.is_empty())
    }

    async fn source_has_endpoints(&self, source_id: i64) -> Result<bool> {
        self.probe(
            "SELECT meta::id(id) AS record_id FROM endpoint \
             WHERE source_id = $source_id AND tenant_id = $tenant LIMIT 1",
            source_id,
        )
        .await
    }
}
