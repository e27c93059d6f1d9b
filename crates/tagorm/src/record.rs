//! Domain record contract.
//!
//! A record exposes its fields together with key/value annotations ("tags").
//! The resolver reads two of those tags: the external identifier (default
//! key `json`) used by conditions and the parameter bag, and the column
//! annotation (default key `db`) carrying the physical column name and an
//! optional `pk` marker.
//!
//! Implement [`Record`] by hand or with `#[derive(Record)]`:
//!
//! ```ignore
//! use tagorm::Record;
//!
//! #[derive(Record)]
//! #[orm(table = "users")]
//! struct User {
//!     #[tag(json = "uid", db = "uid,pk")]
//!     uid: String,
//!     #[tag(json = "username", db = "user_name")]
//!     username: String,
//!     #[tag(json = "encPhone")]
//!     enc_phone: String,
//! }
//! ```

use crate::value::Value;

/// Static tag list of a field: `(key, value)` pairs in declaration order.
pub type Tags = &'static [(&'static str, &'static str)];

/// The value held by a record field.
pub enum FieldValue<'a> {
    /// A plain value.
    Value(Value),
    /// A nested composite record.
    Record(&'a dyn Record),
}

/// One field of a record, as seen by the resolver.
pub struct Field<'a> {
    /// The Rust field name.
    pub name: &'static str,
    pub tags: Tags,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, tags: Tags, value: impl Into<Value>) -> Self {
        Self {
            name,
            tags,
            value: FieldValue::Value(value.into()),
        }
    }

    pub fn nested(name: &'static str, tags: Tags, record: &'a dyn Record) -> Self {
        Self {
            name,
            tags,
            value: FieldValue::Record(record),
        }
    }

    /// Look up a tag value; `""` and `"-"` count as absent.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty() && *v != "-")
    }
}

/// A value exposing field-level metadata.
pub trait Record {
    fn fields(&self) -> Vec<Field<'_>>;
}

/// A record bound to a physical table.
pub trait Table: Record {
    fn table_name(&self) -> &str;
}

/// The empty record: no fields, resolves to empty maps.
impl Record for () {
    fn fields(&self) -> Vec<Field<'_>> {
        Vec::new()
    }
}

impl<T: Record + ?Sized> Record for &T {
    fn fields(&self) -> Vec<Field<'_>> {
        (**self).fields()
    }
}

impl<T: Table + ?Sized> Table for &T {
    fn table_name(&self) -> &str {
        (**self).table_name()
    }
}
