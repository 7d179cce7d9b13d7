//! SurrealDB implementation of [`ApplicationAuthenticationRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use sourcehub_core::error::{Error, Result};
use sourcehub_core::models::application_authentication::{
    ApplicationAuthentication, CreateApplicationAuthentication,
};
use sourcehub_core::models::resource_type::ResourceType;
use sourcehub_core::repository::ApplicationAuthenticationRepository;

use crate::error::DbError;
use crate::owner::OwnerResolver;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct ApplicationAuthenticationRow {
    record_id: i64,
    tenant_id: i64,
    application_id: i64,
    authentication_uid: String,
    created_at: DateTime<Utc>,
}

impl ApplicationAuthenticationRow {
    fn into_link(self) -> ApplicationAuthentication {
        ApplicationAuthentication {
            id: self.record_id,
            tenant_id: self.tenant_id,
            application_id: self.application_id,
            authentication_uid: self.authentication_uid,
            created_at: self.created_at,
        }
    }
}

/// SurrealDB implementation of the application-authentication link
/// repository, scoped to one tenant.
#[derive(Clone)]
pub struct SurrealApplicationAuthenticationRepository<C: Connection> {
    db: Surreal<C>,
    tenant_id: i64,
}

impl<C: Connection> SurrealApplicationAuthenticationRepository<C> {
    pub fn new(db: Surreal<C>, tenant_id: i64) -> Self {
        Self { db, tenant_id }
    }
}

impl<C: Connection> ApplicationAuthenticationRepository
    for SurrealApplicationAuthenticationRepository<C>
{
    async fn create(
        &self,
        input: CreateApplicationAuthentication,
    ) -> Result<ApplicationAuthentication> {
        OwnerResolver::new(self.db.clone(), self.tenant_id)
            .resolve(ResourceType::Application, input.application_id)
            .ensure_exists()
            .await?;

        let id = next_id(&self.db, "application_authentication").await?;

        let created = self
            .db
            .query(
                "CREATE type::record('application_authentication', $id) SET \
                 tenant_id = $tenant, \
                 application_id = $application_id, \
                 authentication_uid = $authentication_uid",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .bind(("application_id", input.application_id))
            .bind(("authentication_uid", input.authentication_uid.clone()))
            .await
            .map_err(DbError::from)?
            .check();

        if let Err(error) = created {
            // The unique (tenant, application, authentication) index
            // rejects a second link for the same pair.
            let message = error.to_string();
            if message.contains("already contains") || message.contains("already exists") {
                return Err(Error::conflict(format!(
                    "application {} is already linked to authentication {}",
                    input.application_id, input.authentication_uid
                )));
            }
            return Err(DbError::from(error).into());
        }

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<ApplicationAuthentication> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('application_authentication', $id) \
                 WHERE tenant_id = $tenant",
            )
            .bind(("id", id))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationAuthenticationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "application_authentication".into(),
        })?;

        Ok(row.into_link())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Read-back first so deleting a foreign or absent link reports
        // NotFound instead of silently succeeding.
        self.get_by_id(id).await?;

        self.db
            .query("DELETE type::record('application_authentication', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn by_applications(
        &self,
        application_ids: &[i64],
    ) -> Result<Vec<ApplicationAuthentication>> {
        if application_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM application_authentication \
                 WHERE application_id IN $application_ids AND tenant_id = $tenant \
                 ORDER BY created_at ASC",
            )
            .bind(("application_ids", application_ids.to_vec()))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationAuthenticationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ApplicationAuthenticationRow::into_link)
            .collect())
    }

    async fn by_authentications(
        &self,
        authentication_uids: &[String],
    ) -> Result<Vec<ApplicationAuthentication>> {
        if authentication_uids.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM application_authentication \
                 WHERE authentication_uid IN $authentication_uids AND tenant_id = $tenant \
                 ORDER BY created_at ASC",
            )
            .bind(("authentication_uids", authentication_uids.to_vec()))
            .bind(("tenant", self.tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationAuthenticationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ApplicationAuthenticationRow::into_link)
            .collect())
    }
}
