mod format;
pub mod geography;
pub mod topology;

pub use format::NumberFormat;
pub use geography::{Feature, Geography};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use tracing::info;

use crate::config::MetricConfig;
use crate::error::{MapError, Result};

/// One row of the tabular dataset, keyed by column name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataRow {
    fields: HashMap<String, String>,
}

impl DataRow {
    pub fn new<K: Into<String>, V: Into<String>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Numeric value of a column; missing or unparsable values read as 0
    pub fn number(&self, field: &str) -> f64 {
        self.get(field)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// Which columns hold a row's identifier and display name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accessor {
    pub id_field: String,
    pub name_field: String,
}

impl Accessor {
    pub fn new(id_field: impl Into<String>, name_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            name_field: name_field.into(),
        }
    }

    pub fn id<'a>(&self, row: &'a DataRow) -> &'a str {
        row.get(&self.id_field).unwrap_or("")
    }

    pub fn name<'a>(&self, row: &'a DataRow) -> &'a str {
        row.get(&self.name_field).unwrap_or("")
    }
}

impl Default for Accessor {
    fn default() -> Self {
        Self::new("id", "name")
    }
}

type ValueFn = dyn Fn(&DataRow) -> f64;

/// A named value accessor and its number format.
/// Metrics are shared by reference (`Rc`) between the map and its callers.
pub struct Metric {
    pub name: String,
    value: Box<ValueFn>,
    pub format: NumberFormat,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        value: impl Fn(&DataRow) -> f64 + 'static,
        format: NumberFormat,
    ) -> Self {
        Self {
            name: name.into(),
            value: Box::new(value),
            format,
        }
    }

    /// Metric reading a numeric column
    pub fn field(name: impl Into<String>, field: impl Into<String>, format: NumberFormat) -> Self {
        let field = field.into();
        Self::new(name, move |row| row.number(&field), format)
    }

    /// Value for a row; NaN and infinities coerce to 0
    pub fn value(&self, row: &DataRow) -> f64 {
        let v = (self.value)(row);
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }

    pub fn format(&self, value: f64) -> String {
        self.format.format(value)
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("format", &self.format)
            .finish()
    }
}

impl From<&MetricConfig> for Metric {
    fn from(config: &MetricConfig) -> Self {
        Metric::field(config.name.clone(), config.field.clone(), config.format)
    }
}

/// Build shared metrics from config entries
pub fn metrics_from_config(configs: &[MetricConfig]) -> Vec<Rc<Metric>> {
    configs.iter().map(|c| Rc::new(Metric::from(c))).collect()
}

/// Load a TSV (or CSV, by extension) table with a header row
pub fn load_table(path: &Path, accessor: &Accessor) -> Result<Vec<DataRow>> {
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => b',',
        _ => b'\t',
    };
    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let rows = read_table(reader, accessor)?;
    info!(path = %path.display(), rows = rows.len(), "loaded table");
    Ok(rows)
}

pub fn read_table<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    accessor: &Accessor,
) -> Result<Vec<DataRow>> {
    let headers = reader.headers()?.clone();
    for column in [&accessor.id_field, &accessor.name_field] {
        if !headers.iter().any(|h| h == column) {
            return Err(MapError::MissingColumn(column.clone()));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(DataRow::new(headers.iter().zip(record.iter())));
    }
    Ok(rows)
}
