use std::time::Duration;

use crate::error::{LedgerError, LedgerResult};
use crate::models::SalesRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub records: Vec<SalesRecord>,
    pub version: u64,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Whole-table reads and overwrites. A write against a version that is no
/// longer current fails with `Conflict`.
pub trait LedgerStore {
    /// Prepares the backing table (schema, header row).
    async fn init(&self) -> LedgerResult<()>;

    async fn read(&self) -> LedgerResult<Snapshot>;

    /// Replaces the full table and returns the new version.
    async fn write(&self, records: &[SalesRecord], expected_version: u64) -> LedgerResult<u64>;
}

/// One attempt, bounded by `timeout`. No retry.
pub async fn read_with_timeout<S: LedgerStore>(
    store: &S,
    timeout: Duration,
) -> LedgerResult<Snapshot> {
    match tokio::time::timeout(timeout, store.read()).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}

pub async fn write_with_timeout<S: LedgerStore>(
    store: &S,
    records: &[SalesRecord],
    expected_version: u64,
    timeout: Duration,
) -> LedgerResult<u64> {
    match tokio::time::timeout(timeout, store.write(records, expected_version)).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}

/// Read for display. Any failure degrades to an empty table so views can
/// render a placeholder.
pub async fn read_or_empty<S: LedgerStore>(store: &S, timeout: Duration) -> Snapshot {
    match read_with_timeout(store, timeout).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let err = LedgerError::DataUnavailable {
                reason: err.to_string(),
            };
            log::warn!("{err}; continuing with an empty table");
            Snapshot::empty()
        }
    }
}
