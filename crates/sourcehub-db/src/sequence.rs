//! Monotonic integer id allocation.
//!
//! Entities keep the numeric ids the API exposes; this replaces a SQL
//! sequence with one `seq` record per table. Ids allocated for writes
//! that later roll back are burned, exactly like sequence values.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SeqRow {
    value: i64,
}

/// Allocates the next id for `table`.
pub(crate) async fn next_id<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
) -> Result<i64, DbError> {
    let mut result = db
        .query("UPSERT type::record('seq', $table) SET value += 1 RETURN `value`")
        .bind(("table", table))
        .await?;

    let rows: Vec<SeqRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(|r| r.value)
        .ok_or_else(|| DbError::Inconsistent(format!("sequence for table {table} returned no row")))
}
