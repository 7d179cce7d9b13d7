//! Error types for the sourcehub system.
//!
//! Every failure kind callers need to distinguish is a separate variant,
//! so HTTP or CLI layers can map errors to status codes without parsing
//! message text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The target row is absent for this tenant, or belongs to another
    /// tenant (indistinguishable on purpose).
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// A polymorphic owner tag outside the known resource types.
    #[error("unsupported resource type: {tag}")]
    UnsupportedResourceType { tag: String },

    /// Malformed filters, pagination input, or a rejected update field.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// Duplicate many-to-many association attempt.
    #[error("source {source_id} is already linked to connection {rhc_connection_id}")]
    AlreadyLinked {
        source_id: i64,
        rhc_connection_id: i64,
    },

    /// An aggregation row is missing required columns or has the wrong
    /// shape. Internal-consistency class: correct storage never produces
    /// this.
    #[error("malformed row: {message}")]
    MalformedRow { message: String },

    /// Unexpected multiplicity from a grouped query, or a comparable
    /// internal invariant violation.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Event emission to the outbound sink failed. Rows already mutated
    /// stay mutated; the caller decides whether to retry the operation.
    #[error("failed to publish {event} for {entity} {id}: {reason}")]
    Publish {
        event: String,
        entity: String,
        id: String,
        reason: String,
    },

    /// Secret-material enrichment for an authentication failed.
    #[error("secret enrichment failed for authentication {uid}: {reason}")]
    SecretEnrichment { uid: String, reason: String },

    #[error("database error: {0}")]
    Database(String),
}

impl Error {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Error::NotFound {
            entity: entity.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict {
            message: message.into(),
        }
    }

    pub fn malformed_row(message: impl Into<String>) -> Self {
        Error::MalformedRow {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
