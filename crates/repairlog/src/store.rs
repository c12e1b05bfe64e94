//! In-memory record store for repairlog.
//!
//! The store holds the authoritative list of records for the lifetime of the
//! owning session. Nothing is persisted; dropping the store discards every
//! record.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{Record, RecordForm};

/// Ordered, append-only collection of repair records.
///
/// Supports:
/// - Appending with id assignment and serial-number validation
/// - Lookup by id
/// - Filtering by predicate or serial-number substring
/// - Deletion by id
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the end of the store.
    ///
    /// The new id is one more than the largest id currently stored, or `1`
    /// for an empty store.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the serial number is blank. The store is
    /// left unchanged in that case.
    pub fn append(&mut self, form: RecordForm) -> Result<&Record> {
        if !form.has_serial_number() {
            debug!("Rejecting record without serial number");
            return Err(Error::required("sn"));
        }

        let id = self.next_id();
        let index = self.records.len();
        self.records.push(Record::new(id, form));
        debug!("Appended record with id {}", id);

        Ok(&self.records[index])
    }

    /// Append a batch of records in order.
    ///
    /// Returns the number of records appended.
    ///
    /// # Errors
    ///
    /// Stops at the first invalid form. Records appended before it are kept.
    pub fn extend(&mut self, forms: impl IntoIterator<Item = RecordForm>) -> Result<usize> {
        let mut appended = 0;
        for form in forms {
            self.append(form)?;
            appended += 1;
        }
        if appended > 0 {
            info!("Loaded {} records", appended);
        }
        Ok(appended)
    }

    fn next_id(&self) -> u64 {
        self.records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Get a record by its id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All records in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<&Record> {
        self.records.iter().collect()
    }

    /// Records matching a predicate, in insertion order.
    #[must_use]
    pub fn filter<P>(&self, predicate: P) -> Vec<&Record>
    where
        P: Fn(&Record) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    /// Records whose serial number contains `query`, ignoring case.
    ///
    /// An empty query matches every record.
    #[must_use]
    pub fn search_sn(&self, query: &str) -> Vec<&Record> {
        let needle = query.to_lowercase();
        self.filter(|r| r.sn().to_lowercase().contains(&needle))
    }

    /// Serial-number search results, most recent first.
    #[must_use]
    pub fn recent(&self, query: &str) -> Vec<&Record> {
        let mut records = self.search_sn(query);
        records.reverse();
        records
    }

    /// Delete a record by id.
    ///
    /// Returns `true` if a record was removed, `false` if not found.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() < before;
        if removed {
            info!("Deleted record {}", id);
        } else {
            debug!("No record with id {} to delete", id);
        }
        removed
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
