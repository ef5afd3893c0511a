use thiserror::Error;

use crate::{datetime::DateTimeError, path::Trail};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A malformed request body.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("required key {key:?} is undefined at {path}")]
    UndefinedKey { key: String, path: Trail },

    #[error("key {key:?} has incorrect type: expected {expected}, was {found} at {path}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
        path: Trail,
    },

    #[error("key {key:?} out of range: expected {expected}, was {found} at {path}")]
    OutOfRange {
        key: String,
        expected: String,
        found: String,
        path: Trail,
    },

    #[error("key {key:?} value must be an object at {path}")]
    NotAnObject { key: String, path: Trail },

    #[error("key {key:?} value must be an array at {path}")]
    NotAnArray { key: String, path: Trail },

    #[error("undefined request type {name:?} at {path}")]
    UndefinedRequestType { name: String, path: Trail },

    #[error("date/time: {source} at {path}")]
    InvalidDateTime {
        #[source]
        source: DateTimeError,
        path: Trail,
    },
}

/// A filter expression that cannot be turned into a [`crate::filter::Filter`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("undefined filter type {name:?} at {path}")]
    UndefinedFilterType { name: String, path: Trail },

    #[error("column {name:?} is not defined at {path}")]
    UnknownColumn { name: String, path: Trail },

    #[error("column {column:?} has type {kind}, which is not comparable, at {path}")]
    NotComparable {
        column: String,
        kind: &'static str,
        path: Trail,
    },

    #[error("{message} at {path}")]
    StructuralViolation { message: String, path: Trail },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("{0} was not set")]
    MissingClause(&'static str),

    #[error("{what}: expected {expected} values, was {found}")]
    ArityMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("identifier {0:?} contains forbidden characters (permitted: A-Z, a-z, 0-9, $, _)")]
    InvalidIdentifier(String),

    #[error("{0}")]
    StructuralViolation(&'static str),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("column {column:?} holds an unsupported {kind} value")]
    UnsupportedValue { column: String, kind: &'static str },

    #[error("column {column:?} holds an invalid date/time: {source}")]
    InvalidDateTime {
        column: String,
        #[source]
        source: DateTimeError,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FitError {
    #[error("linear regression requires at least two unique x values and is undefined for a vertical line")]
    DegenerateFit,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("request validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("filter compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("query construction failed: {0}")]
    QueryBuild(#[from] QueryBuildError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("trendline failed: {0}")]
    Fit(#[from] FitError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("authentication failed")]
    Authentication,
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.into())
    }
}
