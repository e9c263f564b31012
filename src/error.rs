//! Error types for the Firebird statement core.

use thiserror::Error;

/// Result type alias for Firebird operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Native status code the engine reports when a DDL statement references a
/// domain that does not exist yet.
pub const NON_EXISTENT_DOMAIN_ERROR: i64 = 335_544_569;

/// Error type for statement, result set and row operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Error reported by the native client.
    #[error("Firebird error {code}: {message}")]
    Database { code: i64, message: String },

    /// Statement could not be prepared (bad SQL or inactive transaction).
    #[error("Error preparing a SQL statement: {message}")]
    Prepare { code: Option<i64>, message: String },

    /// Bind value arity does not match the statement placeholders.
    #[error("Parameter set mismatch: statement expects {expected} parameters, {actual} supplied")]
    ParameterCount { expected: usize, actual: usize },

    /// Statement used after it was closed.
    #[error("Statement has been closed: {sql}")]
    StatementClosed { sql: String },

    /// Transaction used after commit or rollback.
    #[error("Transaction is no longer active")]
    TransactionInactive,

    /// Native cursor failed mid-iteration.
    #[error("Error fetching query row: {message}")]
    Fetch { code: Option<i64>, message: String },

    /// Row lookup miss with no default or fallback.
    #[error("Column identifier {key} not found in row")]
    ColumnNotFound { key: String },

    /// Stored procedure not found in the system catalog.
    #[error("Unknown stored procedure: {name}")]
    UnknownProcedure { name: String },

    /// Native type/subtype pair outside the type catalog.
    #[error("Unmapped native SQL type {code} (subtype {subtype})")]
    UnmappedType { code: i16, subtype: i16 },

    /// Native statement type code outside the known kinds.
    #[error("Unknown SQL statement type: {code}")]
    UnknownStatementType { code: i32 },

    /// Table name rejected before building catalog SQL.
    #[error("'{name}' is not a valid table name")]
    InvalidTableName { name: String },

    /// Native row width does not match the statement metadata.
    #[error("Row has {values} values but the statement describes {columns} columns")]
    RowShapeMismatch { values: usize, columns: usize },
}

impl Error {
    /// Create a native database error.
    pub fn database(code: i64, message: impl Into<String>) -> Self {
        Self::Database {
            code,
            message: message.into(),
        }
    }

    /// Create a prepare error without a native status code.
    pub fn prepare(message: impl Into<String>) -> Self {
        Self::Prepare {
            code: None,
            message: message.into(),
        }
    }

    /// Create a column lookup error.
    pub fn column_not_found(key: impl ToString) -> Self {
        Self::ColumnNotFound {
            key: key.to_string(),
        }
    }

    /// Native status code carried by this error, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Database { code, .. } => Some(*code),
            Error::Prepare { code, .. } | Error::Fetch { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this is the engine's "domain does not exist" failure.
    ///
    /// Schema tooling probes for this to create the missing domain and retry.
    pub fn is_missing_domain(&self) -> bool {
        self.code() == Some(NON_EXISTENT_DOMAIN_ERROR)
    }

    /// Re-tag a native failure raised while preparing.
    pub(crate) fn into_prepare(self) -> Self {
        match self {
            Error::Database { code, message } => Error::Prepare {
                code: Some(code),
                message,
            },
            other => other,
        }
    }

    /// Re-tag a native failure raised while fetching.
    pub(crate) fn into_fetch(self) -> Self {
        match self {
            Error::Database { code, message } => Error::Fetch {
                code: Some(code),
                message,
            },
            Error::Prepare { code, message } => Error::Fetch { code, message },
            other => other,
        }
    }
}
