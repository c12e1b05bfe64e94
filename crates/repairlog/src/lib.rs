//! `repairlog` - Equipment repair records and report export
//!
//! This library keeps repair records in memory, flattens each record and its
//! measurement tables into a key/value context, and renders that context
//! through a tagged template into a downloadable document. Deleting records
//! is gated on an admin session.
//!
//! ```
//! use repairlog::{flatten, Record, RecordForm};
//!
//! let record = Record::new(1, RecordForm::new("WYP-001"));
//! let context = flatten(&record);
//! assert_eq!(context.text("sn").as_deref(), Some("WYP-001"));
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod desk;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod record;
pub mod render;
pub mod store;

pub use auth::{login, Role, Session};
pub use config::Config;
pub use desk::RepairDesk;
pub use error::{Error, Result};
pub use flatten::{flatten, FlattenedContext};
pub use logging::init_logging;
pub use record::{Record, RecordForm};
pub use render::{Document, DocumentRenderer, TagTemplateRenderer};
pub use store::RecordStore;
