use uuid::Uuid;

use crate::config::StaffRoster;
use crate::error::{LedgerError, LedgerResult};
use crate::models::SalesRecord;

/// Removes the record at `row_index`. Positions shift after every delete, so
/// the index must come from a fresh read of the table.
pub fn delete_record(records: &[SalesRecord], row_index: usize) -> LedgerResult<Vec<SalesRecord>> {
    if row_index >= records.len() {
        return Err(LedgerError::IndexOutOfRange {
            index: row_index,
            len: records.len(),
        });
    }

    let mut remaining = records.to_vec();
    remaining.remove(row_index);
    Ok(remaining)
}

pub fn delete_record_by_id(records: &[SalesRecord], id: Uuid) -> LedgerResult<Vec<SalesRecord>> {
    let position = records
        .iter()
        .position(|record| record.id == id)
        .ok_or(LedgerError::RecordNotFound { id })?;
    delete_record(records, position)
}

pub fn append_record(
    records: &[SalesRecord],
    record: SalesRecord,
    roster: &StaffRoster,
) -> LedgerResult<Vec<SalesRecord>> {
    record.validate()?;
    if !roster.contains(&record.staff_name) {
        return Err(LedgerError::UnknownStaff {
            name: record.staff_name,
        });
    }

    let mut updated = records.to_vec();
    updated.push(record);
    Ok(updated)
}

/// Appends the incoming records whose ids are not in the table yet.
/// Returns the merged table and how many records were added.
pub fn merge_records(
    records: &[SalesRecord],
    incoming: Vec<SalesRecord>,
) -> (Vec<SalesRecord>, usize) {
    let mut known: std::collections::HashSet<Uuid> =
        records.iter().map(|record| record.id).collect();
    let mut merged = records.to_vec();
    let mut added = 0usize;

    for record in incoming {
        if known.insert(record.id) {
            merged.push(record);
            added += 1;
        }
    }

    (merged, added)
}
