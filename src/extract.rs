//! Record readers for delimited text and newline-delimited JSON.
//!
//! Both readers are lazy: [`Extractor::extract`] resolves the column layout up
//! front and then yields one `(features, label)` record per source row.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use crate::dataset::Value;
use crate::error::{Error, Result};

/// One parsed row: feature values in schema order plus the label.
pub type Record = (Vec<Value>, String);

/// Which columns are features and which one is the label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Feature columns in the order they should appear in the dataset.
    /// `None` selects every column except the label, in source order.
    pub features: Option<Vec<String>>,
    pub label: String,
}

impl Schema {
    pub fn new(features: Option<Vec<String>>, label: impl Into<String>) -> Self {
        Self {
            features,
            label: label.into(),
        }
    }

    /// All columns except `label` are features.
    pub fn label_only(label: impl Into<String>) -> Self {
        Self::new(None, label)
    }
}

/// The resolved feature names and a lazy stream of records.
/// The stream owns its reader, so it can outlive the extractor that made it.
pub struct Records {
    pub feature_names: Vec<String>,
    pub rows: Box<dyn Iterator<Item = Result<Record>>>,
}

pub trait Extractor {
    fn extract(&self, schema: &Schema) -> Result<Records>;
}

/// Delimited text with a header row.
#[derive(Debug, Clone)]
pub struct CsvExtractor {
    path: PathBuf,
    delimiter: u8,
    quote: u8,
}

impl CsvExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
            quote: b'"',
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }
}

impl Extractor for CsvExtractor {
    fn extract(&self, schema: &Schema) -> Result<Records> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(true)
            .flexible(false)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        let find = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                Error::Schema(format!(
                    "column '{}' not found in header of {}",
                    name,
                    self.path.display()
                ))
            })
        };

        let label_index = find(&schema.label)?;
        let (feature_names, feature_indices) = match &schema.features {
            Some(names) => {
                let indices = names.iter().map(|n| find(n)).collect::<Result<Vec<_>>>()?;
                (names.clone(), indices)
            }
            None => headers
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != label_index)
                .map(|(i, h)| (h.clone(), i))
                .unzip(),
        };
        if feature_indices.contains(&label_index) {
            return Err(Error::Schema(format!(
                "column '{}' cannot be both a feature and the label",
                schema.label
            )));
        }

        tracing::debug!(
            path = %self.path.display(),
            features = ?feature_names,
            label = %schema.label,
            "reading delimited text"
        );

        let names = feature_names.clone();
        let label_name = schema.label.clone();
        let rows = reader.into_records().map(move |record| {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let field = |index: usize, column: &str| -> Result<String> {
                match record.get(index).map(str::trim) {
                    Some(value) if !value.is_empty() => Ok(value.to_owned()),
                    _ => Err(Error::Format(format!(
                        "missing value for column '{}' on line {}",
                        column, line
                    ))),
                }
            };
            let features = feature_indices
                .iter()
                .zip(&names)
                .map(|(&i, name)| field(i, name).map(Value::Categorical))
                .collect::<Result<Vec<_>>>()?;
            let label = field(label_index, &label_name)?;
            Ok((features, label))
        });

        Ok(Records {
            feature_names,
            rows: Box::new(rows),
        })
    }
}

/// Newline-delimited JSON: one object (keyed by column name) or one array
/// (features in order, label last) per line. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct NdjsonExtractor {
    path: PathBuf,
}

impl NdjsonExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Extractor for NdjsonExtractor {
    fn extract(&self, schema: &Schema) -> Result<Records> {
        let file = File::open(&self.path)?;
        let mut lines = BufReader::new(file)
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|(i, line)| -> Result<(usize, Json)> {
                let line = line?;
                let value = serde_json::from_str(&line)
                    .map_err(|e| Error::Format(format!("line {}: {}", i + 1, e)))?;
                Ok((i + 1, value))
            });

        // The first record decides the column names when the schema leaves them open.
        let first = lines.next().transpose()?;
        let feature_names = match (&schema.features, &first) {
            (Some(names), _) => names.clone(),
            (None, Some((_, Json::Object(map)))) => map
                .keys()
                .filter(|k| **k != schema.label)
                .cloned()
                .collect(),
            (None, Some((_, Json::Array(items)))) => (0..items.len().saturating_sub(1))
                .map(|i| format!("column_{}", i))
                .collect(),
            (None, Some((line, _))) => {
                return Err(Error::Format(format!(
                    "line {}: expected a JSON object or array",
                    line
                )));
            }
            (None, None) => Vec::new(),
        };

        tracing::debug!(
            path = %self.path.display(),
            features = ?feature_names,
            label = %schema.label,
            "reading NDJSON"
        );

        // Open schemas take their columns from the first record, so every
        // later object must carry exactly those keys.
        let closed = schema.features.is_none();
        let names = feature_names.clone();
        let label = schema.label.clone();
        let rows = first
            .into_iter()
            .map(Ok)
            .chain(lines)
            .map(move |item| {
                let (line, value) = item?;
                json_record(line, value, &names, &label, closed)
            });

        Ok(Records {
            feature_names,
            rows: Box::new(rows),
        })
    }
}

fn json_record(
    line: usize,
    value: Json,
    names: &[String],
    label: &str,
    closed: bool,
) -> Result<Record> {
    match value {
        Json::Object(mut map) => {
            if closed && map.len() != names.len() + 1 {
                return Err(Error::Format(format!(
                    "line {}: record has {} fields, expected {}",
                    line,
                    map.len(),
                    names.len() + 1
                )));
            }
            let mut features = Vec::with_capacity(names.len());
            for name in names {
                let field = map.remove(name).ok_or_else(|| {
                    Error::Format(format!("line {}: missing field '{}'", line, name))
                })?;
                features.push(json_feature(line, name, field)?);
            }
            let target = map.remove(label).ok_or_else(|| {
                Error::Format(format!("line {}: missing label field '{}'", line, label))
            })?;
            Ok((features, json_label(line, target)?))
        }
        Json::Array(mut items) => {
            if items.len() != names.len() + 1 {
                return Err(Error::Format(format!(
                    "line {}: record has {} fields, expected {}",
                    line,
                    items.len(),
                    names.len() + 1
                )));
            }
            let target = items.pop().map_or(Ok(String::new()), |t| json_label(line, t))?;
            let features = items
                .into_iter()
                .zip(names)
                .map(|(field, name)| json_feature(line, name, field))
                .collect::<Result<Vec<_>>>()?;
            Ok((features, target))
        }
        _ => Err(Error::Format(format!(
            "line {}: expected a JSON object or array",
            line
        ))),
    }
}

fn json_feature(line: usize, name: &str, field: Json) -> Result<Value> {
    match field {
        Json::Number(n) => n.as_f64().map(Value::Continuous).ok_or_else(|| {
            Error::Format(format!("line {}: '{}' is not a finite number", line, name))
        }),
        Json::String(s) if !s.trim().is_empty() => Ok(Value::Categorical(s)),
        Json::Null | Json::String(_) => Err(Error::Format(format!(
            "line {}: missing value for '{}'",
            line, name
        ))),
        other => Err(Error::Format(format!(
            "line {}: unsupported value for '{}': {}",
            line, name, other
        ))),
    }
}

fn json_label(line: usize, field: Json) -> Result<String> {
    match field {
        Json::String(s) if !s.trim().is_empty() => Ok(s),
        Json::Number(n) => Ok(n.to_string()),
        other => Err(Error::Format(format!(
            "line {}: invalid label {}",
            line, other
        ))),
    }
}
