use k_nn::KnnError;
use petal_helpers::TransformError;
use thiserror::Error;

/// Every way a pipeline run can fail.
///
/// The variants mirror where the fault lies: the input data (`Format`,
/// `Schema`), the caller's configuration (`Value`), the order of calls
/// (`State`) or the file system (`Io`).
#[derive(Debug, Error)]
pub enum Error {
    /// A record could not be parsed or is incomplete.
    #[error("format error: {0}")]
    Format(String),
    /// Declared columns are absent or the data does not fit the declared shape.
    #[error("schema error: {0}")]
    Schema(String),
    /// Invalid configuration or an operation that cannot be performed on this data.
    #[error("invalid value: {0}")]
    Value(String),
    /// An operation was invoked before its prerequisites.
    #[error("invalid state: {0}")]
    State(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Error::Io(io),
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => Error::Format(format!(
                "record on line {} has {} fields, expected {}",
                line.unwrap_or(0),
                len,
                expected_len
            )),
            kind => Error::Format(format!("{:?}", kind)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::Format(err.to_string())
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Value(format!("invalid configuration: {}", err))
    }
}

impl From<KnnError> for Error {
    fn from(err: KnnError) -> Self {
        match err {
            KnnError::NotTrained => Error::State(err.to_string()),
            other => Error::Value(other.to_string()),
        }
    }
}

impl From<TransformError> for Error {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::NotFitted => Error::State(err.to_string()),
            other => Error::Value(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knn_errors_map_to_taxonomy() {
        assert!(matches!(Error::from(KnnError::NotTrained), Error::State(_)));
        assert!(matches!(
            Error::from(KnnError::KTooLarge { k: 5, samples: 2 }),
            Error::Value(_)
        ));
    }

    #[test]
    fn test_json_syntax_error_is_format() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(Error::from(err), Error::Format(_)));
    }
}
