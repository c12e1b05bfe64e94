//! Request/response operations over a record store.
//!
//! [`RepairDesk`] owns the [`RecordStore`] for a session and the renderer
//! used for exports. Every operation runs to completion and returns its
//! result; nothing is redrawn or re-read behind the caller's back.

use tracing::{info, warn};

use crate::auth::{AdminGuard, Session};
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::flatten::{flatten, FlattenedContext};
use crate::record::{Record, RecordForm};
use crate::render::{document_file_name, Document, DocumentRenderer};
use crate::store::RecordStore;

/// Front desk for repair records.
#[derive(Debug)]
pub struct RepairDesk<R> {
    store: RecordStore,
    renderer: R,
    export: ExportConfig,
}

impl<R: DocumentRenderer> RepairDesk<R> {
    /// Create a desk with an empty store.
    #[must_use]
    pub fn new(renderer: R, export: ExportConfig) -> Self {
        Self {
            store: RecordStore::new(),
            renderer,
            export,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The renderer used for exports.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Submit a new record on behalf of `session`.
    ///
    /// A blank date defaults to today and a blank operator defaults to the
    /// session's user name.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the serial number is blank; nothing is
    /// stored in that case.
    pub fn submit(&mut self, session: &Session, mut form: RecordForm) -> Result<&Record> {
        form.fill_defaults(session.username());
        let record = self.store.append(form)?;
        info!(id = record.id, sn = %record.sn(), user = session.username(), "Record saved");
        Ok(record)
    }

    /// Preload a batch of records, filling blank operators with `operator`.
    ///
    /// # Errors
    ///
    /// Stops at the first form without a serial number.
    pub fn load(&mut self, operator: &str, forms: Vec<RecordForm>) -> Result<usize> {
        let forms = forms.into_iter().map(|mut form| {
            form.fill_defaults(operator);
            form
        });
        self.store.extend(forms)
    }

    /// Records whose serial number contains `query`, most recent first.
    #[must_use]
    pub fn history(&self, query: &str) -> Vec<&Record> {
        self.store.recent(query)
    }

    /// Look up a record.
    #[must_use]
    pub fn show(&self, id: u64) -> Option<&Record> {
        self.store.get(id)
    }

    /// Flatten a record for inspection.
    #[must_use]
    pub fn flatten(&self, id: u64) -> Option<FlattenedContext> {
        self.store.get(id).map(flatten)
    }

    /// File name the export of `record` will use.
    #[must_use]
    pub fn file_name_for(&self, record: &Record) -> String {
        let date = self.export.include_date.then(|| record.date());
        document_file_name(&self.export.file_prefix, record.sn(), date)
    }

    /// Render a record to a document.
    ///
    /// Returns `Ok(None)` when the template artifact is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] for an unknown id, or a render error
    /// if the template does not match the record's keys.
    pub fn export(&self, id: u64) -> Result<Option<Document>> {
        let record = self.store.get(id).ok_or(Error::RecordNotFound { id })?;
        let context = flatten(record);
        let file_name = self.file_name_for(record);

        match self.renderer.render(&context, &file_name) {
            Ok(Some(document)) => {
                info!(id, file = %document.file_name, "Exported record");
                Ok(Some(document))
            }
            Ok(None) => {
                warn!(id, "Template missing, export skipped");
                Ok(None)
            }
            Err(err) => {
                warn!(id, error = %err, "Export failed");
                Err(err)
            }
        }
    }

    /// Delete a record. Only reachable with an [`AdminGuard`].
    ///
    /// Returns `true` if a record was removed.
    pub fn delete(&mut self, admin: &AdminGuard<'_>, id: u64) -> bool {
        let removed = self.store.delete(id);
        if removed {
            info!(id, user = admin.session().username(), "Record deleted");
        }
        removed
    }
}
