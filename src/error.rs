use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures the registry reports to its caller.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unable to read object definitions from {path}")]
    DefinitionsUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a single definition record was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 6 tab-separated fields, found {0}")]
    FieldCount(usize),

    #[error("field `{field}` is not an integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
