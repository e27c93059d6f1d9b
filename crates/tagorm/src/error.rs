//! Error types for tagorm

use thiserror::Error;

/// Result type alias for tagorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement compilation and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A named expression whose placeholders and arguments disagree in count.
    #[error("fields and args do not match. exp: {express} ({fields} placeholders, {args} args)")]
    ArgsMismatch {
        express: String,
        fields: usize,
        args: usize,
    },

    /// A `:name` marker in the statement has no entry in the parameter bag.
    #[error("Missing named parameter ':{0}'")]
    MissingParam(String),

    /// A mutating statement affected zero rows.
    #[error("No rows affected")]
    NoRowsAffected,

    /// Pagination requested with a page size below one.
    #[error("Invalid page size {0}: page size must be greater than zero")]
    InvalidPageSize(u64),

    /// UPDATE/DELETE without any WHERE term.
    #[error("{0} without WHERE clause; call allow_unconditional() to permit it")]
    Unconditional(&'static str),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an argument-count mismatch from a named expression
    pub fn is_args_mismatch(&self) -> bool {
        matches!(self, Self::ArgsMismatch { .. })
    }

    /// Check if a mutation reported zero affected rows
    pub fn is_no_rows_affected(&self) -> bool {
        matches!(self, Self::NoRowsAffected)
    }

    /// A builder error is reported by every `build()` call, so it has to be reproducible.
    ///
    /// Driver errors cannot be cloned and are flattened into [`OrmError::Other`].
    pub(crate) fn replicate(&self) -> Self {
        match self {
            Self::Connection(m) => Self::Connection(m.clone()),
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::Decode { column, message } => Self::decode(column.clone(), message.clone()),
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::Serialization(m) => Self::Serialization(m.clone()),
            Self::ArgsMismatch {
                express,
                fields,
                args,
            } => Self::ArgsMismatch {
                express: express.clone(),
                fields: *fields,
                args: *args,
            },
            Self::MissingParam(m) => Self::MissingParam(m.clone()),
            Self::NoRowsAffected => Self::NoRowsAffected,
            Self::InvalidPageSize(n) => Self::InvalidPageSize(*n),
            Self::Unconditional(op) => Self::Unconditional(op),
            #[cfg(feature = "pool")]
            Self::Pool(m) => Self::Pool(m.clone()),
            Self::Query(e) => Self::Other(e.to_string()),
            Self::Other(m) => Self::Other(m.clone()),
        }
    }

    /// Parse a tokio_postgres error into an OrmError, keeping the server message
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            tracing::error!(
                target: "tagorm.sql",
                code = db_err.code().code(),
                message = db_err.message(),
                "statement failed"
            );
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
