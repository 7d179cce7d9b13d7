//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and tenant-scoped: an
//! implementation is constructed for one tenant and must never read or
//! write rows of another. Implementations are injected through
//! constructors (no runtime-replaceable globals), so tests can
//! substitute fakes without touching call sites.

use serde_json::Value;

use crate::error::Result;
use crate::models::{
    application::{Application, CreateApplication},
    application_authentication::{ApplicationAuthentication, CreateApplicationAuthentication},
    authentication::{Authentication, CreateAuthentication},
    endpoint::{CreateEndpoint, Endpoint},
    resource_type::ResourceType,
    rhc_connection::{CreateRhcConnection, RhcConnection, UpdateRhcConnection},
    source::{CreateSource, Source, SourceWithApplications, UpdateSource},
    tenant::{CreateTenant, Tenant},
};

/// Pagination parameters for list queries. Bounds result-set size, not
/// wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// A single equality/IN filter on an allow-listed column.
///
/// One value means equality; several mean an IN-list. Filtering on a
/// column outside the entity's allow-list is a `BadRequest`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(field: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = Result<Tenant>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<Tenant>> + Send;
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

pub trait SourceRepository: Send + Sync {
    fn create(&self, input: CreateSource) -> impl Future<Output = Result<Source>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<Source>> + Send;

    /// One consistent read of a source together with its application
    /// children. The cascade iterates the returned snapshot order.
    fn get_with_applications(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<SourceWithApplications>> + Send;

    fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> impl Future<Output = Result<PaginatedResult<Source>>> + Send;

    fn update(&self, id: i64, input: UpdateSource)
    -> impl Future<Output = Result<Source>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<Source>> + Send;

    fn exists(&self, id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Sets or clears `paused_at` on the source and all of its
    /// applications in one transaction. The serialization point for
    /// concurrent pause requests.
    fn set_paused(&self, id: i64, paused: bool) -> impl Future<Output = Result<()>> + Send;
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

pub trait ApplicationRepository: Send + Sync {
    fn create(&self, input: CreateApplication)
    -> impl Future<Output = Result<Application>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<Application>> + Send;

    fn list_for_source(
        &self,
        source_id: i64,
        pagination: Pagination,
    ) -> impl Future<Output = Result<PaginatedResult<Application>>> + Send;
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

pub trait EndpointRepository: Send + Sync {
    fn create(&self, input: CreateEndpoint) -> impl Future<Output = Result<Endpoint>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<Endpoint>> + Send;

    fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> impl Future<Output = Result<PaginatedResult<Endpoint>>> + Send;

    /// Lists the endpoints belonging to one source, existence-checking
    /// the source first.
    fn list_for_source(
        &self,
        source_id: i64,
        pagination: Pagination,
        filters: &[Filter],
    ) -> impl Future<Output = Result<PaginatedResult<Endpoint>>> + Send;

    /// Loads by id, applies an allow-listed partial update, persists.
    fn fetch_and_update(
        &self,
        id: i64,
        attributes: &serde_json::Map<String, Value>,
    ) -> impl Future<Output = Result<Endpoint>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<Endpoint>> + Send;

    /// True when no endpoint of the source is flagged as default yet.
    fn can_be_default_for_source(
        &self,
        source_id: i64,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// True when no endpoint of the source carries the given role.
    fn is_role_unique_for_source(
        &self,
        role: &str,
        source_id: i64,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn source_has_endpoints(&self, source_id: i64) -> impl Future<Output = Result<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Authentications (polymorphic owner)
// ---------------------------------------------------------------------------

pub trait AuthenticationRepository: Send + Sync {
    fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> impl Future<Output = Result<PaginatedResult<Authentication>>> + Send;

    /// Lists the authentications owned by `(resource_type, resource_id)`.
    ///
    /// The owner is existence-checked first; an absent owner fails with
    /// `NotFound` before the authentication relation is touched. Every
    /// returned row is secret-enriched; one enrichment failure fails the
    /// whole call.
    fn list_for_owner(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
        pagination: Pagination,
        filters: &[Filter],
    ) -> impl Future<Output = Result<PaginatedResult<Authentication>>> + Send;

    /// Sibling authentications for the same owner as `authentication`.
    fn by_resource(
        &self,
        authentication: &Authentication,
    ) -> impl Future<Output = Result<Vec<Authentication>>> + Send;

    /// Inserts without existence-checking the owner: the bulk-ingestion
    /// path creates authentications whose owner is created concurrently
    /// in the same transaction scope.
    fn create(
        &self,
        input: CreateAuthentication,
    ) -> impl Future<Output = Result<Authentication>> + Send;

    fn get_by_uid(&self, uid: &str) -> impl Future<Output = Result<Authentication>> + Send;

    /// Loads by UID within the tenant, applies an allow-listed partial
    /// update, persists.
    fn fetch_and_update(
        &self,
        uid: &str,
        attributes: &serde_json::Map<String, Value>,
    ) -> impl Future<Output = Result<Authentication>> + Send;

    fn delete(&self, uid: &str) -> impl Future<Output = Result<Authentication>> + Send;
}

// ---------------------------------------------------------------------------
// Application ↔ Authentication links
// ---------------------------------------------------------------------------

pub trait ApplicationAuthenticationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateApplicationAuthentication,
    ) -> impl Future<Output = Result<ApplicationAuthentication>> + Send;

    fn get_by_id(&self, id: i64)
    -> impl Future<Output = Result<ApplicationAuthentication>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<()>> + Send;

    fn by_applications(
        &self,
        application_ids: &[i64],
    ) -> impl Future<Output = Result<Vec<ApplicationAuthentication>>> + Send;

    fn by_authentications(
        &self,
        authentication_uids: &[String],
    ) -> impl Future<Output = Result<Vec<ApplicationAuthentication>>> + Send;
}

// ---------------------------------------------------------------------------
// RHC connections (aggregated many-to-many)
// ---------------------------------------------------------------------------

pub trait RhcConnectionRepository: Send + Sync {
    fn list(
        &self,
        pagination: Pagination,
        filters: &[Filter],
    ) -> impl Future<Output = Result<PaginatedResult<RhcConnection>>> + Send;

    /// `NotFound` on zero rows; an internal consistency error if the
    /// grouped aggregation unexpectedly yields more than one row.
    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<RhcConnection>> + Send;

    /// Find-or-create by `rhc_id` plus the join-row insert, in one
    /// all-or-nothing transaction. A duplicate link is `AlreadyLinked`;
    /// a rolled-back transaction leaves no orphan connection row.
    fn create(
        &self,
        input: CreateRhcConnection,
    ) -> impl Future<Output = Result<RhcConnection>> + Send;

    fn update(
        &self,
        id: i64,
        input: UpdateRhcConnection,
    ) -> impl Future<Output = Result<RhcConnection>> + Send;

    /// Deletes the connection row and its join rows atomically.
    fn delete(&self, id: i64) -> impl Future<Output = Result<()>> + Send;

    /// The sources linked to one connection for this tenant.
    fn related_sources(
        &self,
        rhc_connection_id: i64,
        pagination: Pagination,
    ) -> impl Future<Output = Result<PaginatedResult<Source>>> + Send;

    /// The connections linked to one source for this tenant.
    fn list_for_source(
        &self,
        source_id: i64,
        pagination: Pagination,
    ) -> impl Future<Output = Result<PaginatedResult<RhcConnection>>> + Send;
}
