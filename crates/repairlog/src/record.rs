//! Core record types for repairlog.
//!
//! A [`Record`] is one completed repair event: a set of named scalar fields
//! plus a handful of typed repeated-row tables. A [`RecordForm`] is the same
//! data before the store has assigned an id.

use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Date format used for the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the power measurement table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerMeasurementRow {
    /// Measured drive current.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    /// Measured power at that current.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
}

/// One row of the output power table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPowerRow {
    /// Wavelength the output was measured at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<String>,
    /// Output power at that wavelength.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
}

/// One row of the detailed repair steps table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairStepRow {
    /// Part or assembly that was worked on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// What was done to it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Outcome of the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// One row of the electronic parameters table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectronicsRow {
    /// Supply voltage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_voltage: Option<String>,
    /// Supply ripple.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ripple: Option<String>,
    /// Board temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
}

/// The repeated-row tables attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordTables {
    /// Current/power measurement series.
    pub power_measurements: Vec<PowerMeasurementRow>,
    /// Output power per wavelength.
    pub output_power: Vec<OutputPowerRow>,
    /// Detailed repair steps, in the order they were performed.
    pub repair_steps: Vec<RepairStepRow>,
    /// Electronic parameters; only the first row is reported.
    pub electronics: Vec<ElectronicsRow>,
}

/// A repair record as submitted, before it has an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordForm {
    /// Serial number of the repaired unit. Required.
    pub sn: String,
    /// Model of the repaired unit.
    pub model: String,
    /// Who performed the repair.
    pub operator: String,
    /// Repair date, `YYYY-MM-DD`.
    pub date: String,
    /// Rated or measured supply voltage.
    pub voltage: String,
    /// Visual condition on arrival.
    pub appearance: String,
    /// Cooling system observations.
    pub cooling: String,
    /// Indicator/LED observations.
    pub indicators: String,
    /// Operating current.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Operating power.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Fault description.
    pub problem: String,
    /// Summary of the repair action.
    pub action: String,
    /// Free-form notes.
    pub notes: String,
    /// Repeated-row tables.
    pub tables: RecordTables,
}

impl RecordForm {
    /// Create a form with only the serial number filled in.
    #[must_use]
    pub fn new(sn: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            ..Self::default()
        }
    }

    /// Whether the required serial number is present.
    #[must_use]
    pub fn has_serial_number(&self) -> bool {
        !self.sn.trim().is_empty()
    }

    /// Fill blank `date` and `operator` fields.
    ///
    /// The date defaults to today in local time; the operator defaults to
    /// the given user name.
    pub fn fill_defaults(&mut self, operator: &str) {
        if self.date.trim().is_empty() {
            self.date = today();
        }
        if self.operator.trim().is_empty() {
            self.operator = operator.to_string();
        }
    }
}

/// A stored repair record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier assigned by the store.
    pub id: u64,
    /// Everything else.
    #[serde(flatten)]
    pub form: RecordForm,
}

impl Record {
    /// Wrap a form with its assigned id.
    #[must_use]
    pub fn new(id: u64, form: RecordForm) -> Self {
        Self { id, form }
    }

    /// Serial number.
    #[must_use]
    pub fn sn(&self) -> &str {
        &self.form.sn
    }

    /// Repair date.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.form.date
    }

    /// Operator name.
    #[must_use]
    pub fn operator(&self) -> &str {
        &self.form.operator
    }

    /// Repeated-row tables.
    #[must_use]
    pub fn tables(&self) -> &RecordTables {
        &self.form.tables
    }

    /// One-line summary used in history listings.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "#{} {} - SN: {} (operator: {})",
            self.id, self.form.date, self.form.sn, self.form.operator
        )
    }
}

/// A record file holds either one form or a list of forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum FormFile {
    Many(Vec<RecordForm>),
    One(Box<RecordForm>),
}

/// Parse record forms from JSON text holding one form or an array of forms.
///
/// # Errors
///
/// Returns a JSON error if the text is neither.
pub fn parse_forms(json: &str) -> Result<Vec<RecordForm>> {
    Ok(match serde_json::from_str(json)? {
        FormFile::Many(forms) => forms,
        FormFile::One(form) => vec![*form],
    })
}

/// Read record forms from a JSON file. See [`parse_forms`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_forms(path: &Path) -> Result<Vec<RecordForm>> {
    let json = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_forms(&json)
}

/// Today's local date in [`DATE_FORMAT`].
#[must_use]
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}
