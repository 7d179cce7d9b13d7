//! SurrealDB implementations of the `sourcehub-core` repository traits.
//!
//! Every repository is constructed for one tenant; the tenant id is
//! baked into each query rather than trusted from request payloads.

mod application;
mod application_authentication;
mod authentication;
mod endpoint;
mod rhc_connection;
mod source;
mod tenant;

pub use application::SurrealApplicationRepository;
pub use application_authentication::SurrealApplicationAuthenticationRepository;
pub use authentication::{NoopSecretStore, SurrealAuthenticationRepository};
pub use endpoint::SurrealEndpointRepository;
pub use rhc_connection::SurrealRhcConnectionRepository;
pub use source::SurrealSourceRepository;
pub use tenant::SurrealTenantRepository;

use surrealdb::Connection;
use surrealdb::method::Query;
use surrealdb_types::SurrealValue;

use sourcehub_core::error::{Error, Result};
use sourcehub_core::repository::Filter;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    total: u64,
}

impl CountRow {
    pub(crate) fn first_total(rows: Vec<CountRow>) -> u64 {
        rows.first().map(|r| r.total).unwrap_or(0)
    }
}

/// Builds `AND <column> IN $filter_<i>` fragments for the allow-listed
/// filter columns of an entity.
///
/// `allowed` maps the caller-facing field name to the column expression
/// used inside the query. A filter on anything else is a `BadRequest` —
/// unknown fields never reach the query text.
pub(crate) fn filter_clause(allowed: &[(&str, &str)], filters: &[Filter]) -> Result<String> {
    let mut clause = String::new();

    for (i, filter) in filters.iter().enumerate() {
        let column = allowed
            .iter()
            .find(|(name, _)| *name == filter.field)
            .map(|(_, column)| *column)
            .ok_or_else(|| {
                Error::bad_request(format!("cannot filter on field \"{}\"", filter.field))
            })?;

        if filter.values.is_empty() {
            return Err(Error::bad_request(format!(
                "filter on \"{}\" has no values",
                filter.field
            )));
        }

        clause.push_str(&format!(" AND {column} IN $filter_{i}"));
    }

    Ok(clause)
}

/// Binds the value lists for the fragments produced by
/// [`filter_clause`].
pub(crate) fn bind_filters<'r, C: Connection>(
    mut query: Query<'r, C>,
    filters: &[Filter],
) -> Query<'r, C> {
    for (i, filter) in filters.iter().enumerate() {
        query = query.bind((format!("filter_{i}"), filter.values.clone()));
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clause_builds_fragments_in_order() {
        let allowed = [("name", "name"), ("rhc_id", "rhc_connection_id.rhc_id")];
        let filters = vec![
            Filter::new("rhc_id", vec!["a".into()]),
            Filter::new("name", vec!["b".into(), "c".into()]),
        ];

        let clause = filter_clause(&allowed, &filters).unwrap();
        assert_eq!(
            clause,
            " AND rhc_connection_id.rhc_id IN $filter_0 AND name IN $filter_1"
        );
    }

    #[test]
    fn filter_clause_rejects_unlisted_fields() {
        let err = filter_clause(&[("name", "name")], &[Filter::new("tenant_id", vec!["1".into()])])
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn filter_clause_rejects_empty_value_lists() {
        let err = filter_clause(&[("name", "name")], &[Filter::new("name", vec![])]).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }
}
