//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`; the
/// derive reads the same `db` tags the statement builder uses.
///
/// # Example
///
/// ```ignore
/// use tagorm::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     #[tag(db = "uid,pk")]
///     uid: String,
///     #[tag(db = "user_name")]
///     name: String,
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }
}
