//! File sinks for reports and dataset exports.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::dataset::LabeledDataset;
use crate::error::{Error, Result};

/// Writes any serializable value as pretty-printed JSON, replacing the file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(path = %self.path.display(), "report saved");
        Ok(())
    }
}

/// Delimited-text export of a dataset with a header row.
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
    delimiter: u8,
}

impl CsvFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the features, followed by a `label` column when asked.
    pub fn export(&self, dataset: &LabeledDataset, include_labels: bool) -> Result<()> {
        self.write::<&str>(dataset, include_labels, None)
    }

    /// Like [`export`](Self::export) with labels, plus one extra column,
    /// typically the predicted labels.
    pub fn export_with_column<S: AsRef<str>>(
        &self,
        dataset: &LabeledDataset,
        name: &str,
        values: &[S],
    ) -> Result<()> {
        if values.len() != dataset.len() {
            return Err(Error::Value(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                dataset.len()
            )));
        }
        self.write(dataset, true, Some((name, values)))
    }

    fn write<S: AsRef<str>>(
        &self,
        dataset: &LabeledDataset,
        include_labels: bool,
        extra: Option<(&str, &[S])>,
    ) -> Result<()> {
        let mut header: Vec<&str> = dataset.feature_names().iter().map(String::as_str).collect();
        if include_labels {
            header.push("label");
        }
        if let Some((name, _)) = extra {
            header.push(name);
        }
        // A repeated header name would be read back as the wrong column.
        if let Some((i, name)) = header
            .iter()
            .enumerate()
            .find(|&(i, name)| header[..i].contains(name))
        {
            return Err(Error::Schema(format!(
                "column '{}' appears more than once in the export header (position {})",
                name, i
            )));
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)?;
        writer.write_record(&header)?;

        for (i, (row, label)) in dataset.rows().iter().zip(dataset.labels()).enumerate() {
            let mut record: Vec<String> = row.iter().map(ToString::to_string).collect();
            if include_labels {
                record.push(label.clone());
            }
            if let Some((_, values)) = extra {
                record.push(values[i].as_ref().to_owned());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!(
            path = %self.path.display(),
            rows = dataset.len(),
            "dataset exported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use std::fs;
    use tempfile::tempdir;

    fn small() -> LabeledDataset {
        LabeledDataset::new(
            vec!["pca_0".into(), "pca_1".into()],
            vec![
                vec![Value::Continuous(1.5), Value::Continuous(-2.0)],
                vec![Value::Continuous(0.25), Value::Continuous(3.0)],
            ],
            vec!["setosa".into(), "virginica".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_csv_export_with_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pca.csv");
        CsvFile::new(&path).export(&small(), true).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "pca_0,pca_1,label\n1.5,-2,setosa\n0.25,3,virginica\n");
    }

    #[test]
    fn test_csv_export_extra_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("predictions.tsv");
        CsvFile::new(&path)
            .delimiter(b'\t')
            .export_with_column(&small(), "prediction", &["setosa", "setosa"])
            .unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("pca_0\tpca_1\tlabel\tprediction"));
        assert_eq!(text.lines().nth(2), Some("0.25\t3\tvirginica\tsetosa"));

        let err = CsvFile::new(&path).export_with_column(&small(), "prediction", &["x"]);
        assert!(matches!(err, Err(Error::Value(_))));
    }

    #[test]
    fn test_csv_export_rejects_duplicate_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clash.csv");
        let dataset = LabeledDataset::new(
            vec!["x".into(), "label".into()],
            vec![vec![Value::Continuous(1.0), Value::Categorical("a".into())]],
            vec!["setosa".into()],
        )
        .unwrap();

        let err = CsvFile::new(&path).export(&dataset, true).unwrap_err();
        assert!(matches!(err, Error::Schema(_)), "{err}");
        assert!(!path.exists());

        CsvFile::new(&path).export(&dataset, false).unwrap();
        let err = CsvFile::new(&path)
            .export_with_column(&small(), "pca_1", &["a", "b"])
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)), "{err}");
    }

    #[test]
    fn test_json_overwrites() {
        let dir = tempdir().unwrap();
        let sink = JsonFile::new(dir.path().join("report.json"));
        sink.write(&serde_json::json!({"accuracy": 0.5})).unwrap();
        sink.write(&serde_json::json!({"accuracy": 0.9})).unwrap();
        let back: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(sink.path()).unwrap()).unwrap();
        assert_eq!(back["accuracy"], 0.9);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope").join("report.json");
        let err = JsonFile::new(missing).write(&1).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let err = CsvFile::new(dir.path().join("nope").join("out.csv"))
            .export(&small(), false)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
