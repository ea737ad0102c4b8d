//! Rename plan export
//!
//! One CSV row per inventoried file. The `new_name` column is left empty
//! for a person to fill in.

use crate::inventory::{Inventory, RenameRow};
use crate::HarvestError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column headers, in output order
pub const RENAME_PLAN_HEADERS: [&str; 7] = [
    "folder_id",
    "original_name",
    "new_name",
    "size",
    "date",
    "file_url",
    "folder_url",
];

/// Writes the rename plan for `inventory` to `path`
///
/// Returns the number of rows written, header excluded.
pub fn write_rename_plan(inventory: &Inventory, path: &Path) -> Result<usize, HarvestError> {
    let file = File::create(path)?;
    let rows = write_rename_plan_to(inventory, file)?;

    if rows == 0 {
        tracing::warn!("Rename plan {} has no rows", path.display());
    } else {
        tracing::info!("Rename plan written to {} ({} rows)", path.display(), rows);
    }
    Ok(rows)
}

/// Writes the rename plan as CSV to any writer
pub fn write_rename_plan_to<W: Write>(inventory: &Inventory, writer: W) -> Result<usize, HarvestError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(RENAME_PLAN_HEADERS)?;

    let mut rows = 0;
    for row in inventory.rename_rows() {
        wtr.write_record(record_fields(&row))?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

fn record_fields<'a>(row: &RenameRow<'a>) -> [&'a str; 7] {
    [
        row.folder_id.as_str(),
        row.file.original_name.as_str(),
        "",
        row.file.size.as_str(),
        row.file.date.as_str(),
        row.file.url.as_str(),
        row.folder_url,
    ]
}
