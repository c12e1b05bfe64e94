//! Record flattening for template substitution.
//!
//! Templates only support plain `{{key}}` tags, with no loops or sections,
//! so every row of every table has to be spelled out as its own key. Each
//! table declares, once, how its columns map to key prefixes and whether it
//! repeats (`current_1`, `current_2`, ...) or reports a single unsuffixed
//! row.
//!
//! # Example
//!
//! ```
//! use repairlog::flatten::flatten;
//! use repairlog::record::{PowerMeasurementRow, Record, RecordForm};
//!
//! let mut form = RecordForm::new("AB12");
//! form.action = "Replaced driver board".to_string();
//! form.tables.power_measurements.push(PowerMeasurementRow {
//!     current: Some("1.5".to_string()),
//!     power: None,
//! });
//!
//! let context = flatten(&Record::new(1, form));
//! assert_eq!(context.text("action").as_deref(), Some("Replaced driver board"));
//! assert_eq!(context.text("current_1").as_deref(), Some("1.5"));
//! assert_eq!(context.text("power_1").as_deref(), Some(""));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::record::{
    ElectronicsRow, OutputPowerRow, PowerMeasurementRow, Record, RepairStepRow,
};

/// A scalar value in a flattened context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Text value. Missing cells and missing numbers flatten to empty text.
    Text(String),
    /// Numeric value.
    Number(f64),
}

impl ContextValue {
    /// Empty text.
    #[must_use]
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    fn from_cell(cell: Option<&str>) -> Self {
        Self::Text(cell.unwrap_or_default().to_string())
    }

    fn from_number(number: Option<f64>) -> Self {
        number.map_or_else(Self::empty, Self::Number)
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Flat key/value mapping handed to the document renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlattenedContext {
    values: BTreeMap<String, ContextValue>,
}

impl FlattenedContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: ContextValue) {
        self.values.insert(key.into(), value);
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Look up a value rendered as text.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(ToString::to_string)
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How a table's rows are turned into keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    /// Every row is emitted, keys suffixed with the 1-based row number.
    Repeating,
    /// Only the first row is emitted, keys unsuffixed. An empty table still
    /// emits every key as empty text.
    SingleRow,
}

/// One column of a table and the key prefix it flattens to.
pub struct Column<R: 'static> {
    /// Column name in the record.
    pub name: &'static str,
    /// Key prefix in the flattened context.
    pub prefix: &'static str,
    get: fn(&R) -> Option<&str>,
}

impl<R: 'static> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Fixed flattening rules for one table.
#[derive(Debug)]
pub struct TableSpec<R: 'static> {
    /// Table name in the record.
    pub name: &'static str,
    /// Repeating or single-row.
    pub policy: RowPolicy,
    /// Declared columns, in template order.
    pub columns: &'static [Column<R>],
}

impl<R: 'static> TableSpec<R> {
    /// Keys this table produces for `row_count` rows.
    #[must_use]
    pub fn keys(&self, row_count: usize) -> Vec<String> {
        match self.policy {
            RowPolicy::Repeating => (1..=row_count)
                .flat_map(|n| self.columns.iter().map(move |c| format!("{}_{n}", c.prefix)))
                .collect(),
            RowPolicy::SingleRow => self.columns.iter().map(|c| c.prefix.to_string()).collect(),
        }
    }

    /// Write this table's keys for `rows` into `context`.
    pub fn flatten_into(&self, rows: &[R], context: &mut FlattenedContext) {
        match self.policy {
            RowPolicy::Repeating => {
                for (index, row) in rows.iter().enumerate() {
                    for column in self.columns {
                        context.insert(
                            format!("{}_{}", column.prefix, index + 1),
                            ContextValue::from_cell((column.get)(row)),
                        );
                    }
                }
            }
            RowPolicy::SingleRow => {
                let first = rows.first();
                for column in self.columns {
                    context.insert(
                        column.prefix,
                        ContextValue::from_cell(first.and_then(column.get)),
                    );
                }
            }
        }
        trace!(table = self.name, rows = rows.len(), "Flattened table");
    }
}

/// Power measurement series: `current_N`, `power_N`.
pub static POWER_MEASUREMENTS: TableSpec<PowerMeasurementRow> = TableSpec {
    name: "power_measurements",
    policy: RowPolicy::Repeating,
    columns: &[
        Column {
            name: "current",
            prefix: "current",
            get: |r| r.current.as_deref(),
        },
        Column {
            name: "power",
            prefix: "power",
            get: |r| r.power.as_deref(),
        },
    ],
};

/// Output power per wavelength: `nm_N`, `out_power_N`.
pub static OUTPUT_POWER: TableSpec<OutputPowerRow> = TableSpec {
    name: "output_power",
    policy: RowPolicy::Repeating,
    columns: &[
        Column {
            name: "wavelength",
            prefix: "nm",
            get: |r| r.wavelength.as_deref(),
        },
        Column {
            name: "power",
            prefix: "out_power",
            get: |r| r.power.as_deref(),
        },
    ],
};

/// Detailed repair steps: `part_N`, `action_N`, `result_N`.
pub static REPAIR_STEPS: TableSpec<RepairStepRow> = TableSpec {
    name: "repair_steps",
    policy: RowPolicy::Repeating,
    columns: &[
        Column {
            name: "part",
            prefix: "part",
            get: |r| r.part.as_deref(),
        },
        Column {
            name: "action",
            prefix: "action",
            get: |r| r.action.as_deref(),
        },
        Column {
            name: "result",
            prefix: "result",
            get: |r| r.result.as_deref(),
        },
    ],
};

/// Electronic parameters, first row only: `vcc`, `ripple`, `temp`.
pub static ELECTRONICS: TableSpec<ElectronicsRow> = TableSpec {
    name: "electronics",
    policy: RowPolicy::SingleRow,
    columns: &[
        Column {
            name: "supply_voltage",
            prefix: "vcc",
            get: |r| r.supply_voltage.as_deref(),
        },
        Column {
            name: "ripple",
            prefix: "ripple",
            get: |r| r.ripple.as_deref(),
        },
        Column {
            name: "temperature",
            prefix: "temp",
            get: |r| r.temperature.as_deref(),
        },
    ],
};

/// Scalar fields of a record, keyed by their own names.
fn scalar_entries(record: &Record) -> Vec<(&'static str, ContextValue)> {
    let form = &record.form;
    // Ids are small store-assigned counters.
    #[allow(clippy::cast_precision_loss)]
    let id = record.id as f64;
    vec![
        ("id", ContextValue::Number(id)),
        ("sn", form.sn.as_str().into()),
        ("model", form.model.as_str().into()),
        ("operator", form.operator.as_str().into()),
        ("date", form.date.as_str().into()),
        ("voltage", form.voltage.as_str().into()),
        ("appearance", form.appearance.as_str().into()),
        ("cooling", form.cooling.as_str().into()),
        ("indicators", form.indicators.as_str().into()),
        ("current", ContextValue::from_number(form.current)),
        ("power", ContextValue::from_number(form.power)),
        ("problem", form.problem.as_str().into()),
        ("action", form.action.as_str().into()),
        ("notes", form.notes.as_str().into()),
    ]
}

/// Flatten a record into a template context.
///
/// Scalars pass through under their own names. Table rows are written
/// according to each table's [`TableSpec`]. Never fails: missing cells and
/// missing numbers become empty text.
#[must_use]
pub fn flatten(record: &Record) -> FlattenedContext {
    let mut context = FlattenedContext::new();
    for (key, value) in scalar_entries(record) {
        context.insert(key, value);
    }

    let tables = record.tables();
    POWER_MEASUREMENTS.flatten_into(&tables.power_measurements, &mut context);
    OUTPUT_POWER.flatten_into(&tables.output_power, &mut context);
    REPAIR_STEPS.flatten_into(&tables.repair_steps, &mut context);
    ELECTRONICS.flatten_into(&tables.electronics, &mut context);

    trace!(id = record.id, keys = context.len(), "Flattened record");
    context
}

/// Every key [`flatten`] produces for this record, scalars first.
#[must_use]
pub fn declared_keys(record: &Record) -> Vec<String> {
    let tables = record.tables();
    let mut keys: Vec<String> = scalar_entries(record)
        .into_iter()
        .map(|(key, _)| key.to_string())
        .collect();
    keys.extend(POWER_MEASUREMENTS.keys(tables.power_measurements.len()));
    keys.extend(OUTPUT_POWER.keys(tables.output_power.len()));
    keys.extend(REPAIR_STEPS.keys(tables.repair_steps.len()));
    keys.extend(ELECTRONICS.keys(tables.electronics.len()));
    keys
}
