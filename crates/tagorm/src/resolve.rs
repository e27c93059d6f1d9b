//! Column resolution: logical field identifiers to physical columns.

use crate::param::ParamBag;
use crate::record::{FieldValue, Record};
use crate::value::Value;
use indexmap::IndexMap;

/// Option in the column tag that marks the primary key (`db = "uid,pk"`).
const PK_MARKER: &str = "pk";

/// Mapping from logical field identifier to physical column, plus the
/// logical identifier of the primary key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: IndexMap<String, String>,
    primary_key: Option<String>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, logical: impl Into<String>, column: impl Into<String>) {
        self.columns.insert(logical.into(), column.into());
    }

    /// Physical column for a logical identifier; `None` is a resolution miss.
    pub fn column(&self, logical: &str) -> Option<&str> {
        self.columns
            .get(logical)
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }

    pub fn contains(&self, logical: &str) -> bool {
        self.columns.contains_key(logical)
    }

    /// Logical identifier of the primary key.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Physical column of the primary key.
    pub fn primary_key_column(&self) -> Option<&str> {
        self.primary_key().and_then(|pk| self.column(pk))
    }

    pub fn set_primary_key(&mut self, logical: impl Into<String>) {
        let logical = logical.into();
        if let Some(previous) = self.primary_key.as_deref()
            && previous != logical
        {
            tracing::warn!(
                target: "tagorm.sql",
                previous,
                current = %logical,
                "several primary key markers on one record; the last one wins"
            );
        }
        self.primary_key = Some(logical);
    }

    /// `(logical, column)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn merge(&mut self, other: ColumnMap) {
        self.columns.extend(other.columns);
        if let Some(pk) = other.primary_key {
            self.set_primary_key(pk);
        }
    }
}

/// Reads record tags and produces the field-value bag and the column map.
#[derive(Clone, Debug)]
pub struct Resolver {
    column_key: String,
    ident_key: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new("db", "json")
    }
}

impl Resolver {
    pub fn new(column_key: impl Into<String>, ident_key: impl Into<String>) -> Self {
        Self {
            column_key: column_key.into(),
            ident_key: ident_key.into(),
        }
    }

    /// Resolve a record into its field values and column map.
    ///
    /// Field values are keyed by logical identifier; when the physical column
    /// differs, the value is also stored under the column name. Nested records
    /// without an identifier are flattened into the parent; nested records with
    /// one are stored as a single JSON value.
    pub fn resolve(&self, record: &dyn Record) -> (ParamBag, ColumnMap) {
        let mut values = ParamBag::new();
        let mut columns = ColumnMap::new();

        for field in record.fields() {
            let ident = field.tag(&self.ident_key);
            let logical = ident.unwrap_or(field.name);
            let column_tag = field.tag(&self.column_key);

            let value = match field.value {
                FieldValue::Value(v) => v,
                FieldValue::Record(nested) => {
                    let (sub_values, sub_columns) = self.resolve(nested);
                    if ident.is_none() {
                        values.extend(&sub_values);
                        columns.merge(sub_columns);
                        continue;
                    }
                    Value::Json(sub_values.to_json())
                }
            };

            values.insert(logical, value.clone());

            let Some(tag) = column_tag else {
                continue;
            };
            let (column, options) = match tag.split_once(',') {
                Some((column, options)) => (column.trim(), Some(options)),
                None => (tag, None),
            };
            if options.is_some_and(|o| o.split(',').any(|o| o.trim() == PK_MARKER)) {
                columns.set_primary_key(logical);
            }
            if !column.is_empty() {
                columns.insert(logical, column);
                if column != logical {
                    values.insert(column, value);
                }
            }
        }

        (values, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    struct Account {
        uid: String,
        name: String,
        age: i32,
        note: String,
    }

    impl Record for Account {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::new("uid", &[("json", "uid"), ("db", "uid,pk")], &self.uid),
                Field::new("name", &[("json", "userName"), ("db", "user_name")], &self.name),
                Field::new("age", &[("json", "age"), ("db", "age")], self.age),
                Field::new("note", &[("json", "note")], &self.note),
            ]
        }
    }

    struct Audit {
        created: String,
    }

    impl Record for Audit {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![Field::new(
                "created",
                &[("json", "created"), ("db", "created_at")],
                &self.created,
            )]
        }
    }

    struct Wrapper {
        id: i64,
        audit: Audit,
        extra: Audit,
    }

    impl Record for Wrapper {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::new("id", &[("json", "id"), ("db", "id,pk")], self.id),
                Field::nested("audit", &[], &self.audit),
                Field::nested("extra", &[("json", "extra"), ("db", "extra")], &self.extra),
            ]
        }
    }

    fn account() -> Account {
        Account {
            uid: "u1".into(),
            name: "bob".into(),
            age: 30,
            note: "n".into(),
        }
    }

    #[test]
    fn resolves_columns_and_primary_key() {
        let (values, columns) = Resolver::default().resolve(&account());
        assert_eq!(columns.len(), 3);
        assert_eq!(columns.primary_key(), Some("uid"));
        assert_eq!(columns.primary_key_column(), Some("uid"));
        assert_eq!(columns.column("userName"), Some("user_name"));
        assert_eq!(columns.column("note"), None);

        assert_eq!(values.get("userName"), Some(&Value::from("bob")));
        assert_eq!(values.get("user_name"), Some(&Value::from("bob")));
        assert_eq!(values.get("note"), Some(&Value::from("n")));
        assert_eq!(values.get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn unit_resolves_to_empty_maps() {
        let (values, columns) = Resolver::default().resolve(&());
        assert!(values.is_empty());
        assert!(columns.is_empty());
        assert_eq!(columns.primary_key(), None);
    }

    #[test]
    fn flattens_unnamed_nested_records() {
        let w = Wrapper {
            id: 7,
            audit: Audit {
                created: "2024-01-01".into(),
            },
            extra: Audit {
                created: "x".into(),
            },
        };
        let (values, columns) = Resolver::default().resolve(&w);

        assert_eq!(columns.column("created"), Some("created_at"));
        assert_eq!(values.get("created"), Some(&Value::from("2024-01-01")));

        assert_eq!(columns.column("extra"), Some("extra"));
        assert_eq!(
            values.get("extra"),
            Some(&Value::Json(serde_json::json!({"created": "x", "created_at": "x"})))
        );
        assert_eq!(columns.primary_key(), Some("id"));
    }

    #[test]
    fn custom_tag_keys() {
        struct Custom;
        impl Record for Custom {
            fn fields(&self) -> Vec<Field<'_>> {
                vec![Field::new("a", &[("col", "col_a,pk"), ("id", "alpha")], 1)]
            }
        }

        let (values, columns) = Resolver::new("col", "id").resolve(&Custom);
        assert_eq!(columns.column("alpha"), Some("col_a"));
        assert_eq!(columns.primary_key(), Some("alpha"));
        assert!(values.contains("alpha"));
    }

    #[test]
    fn last_primary_key_wins() {
        struct TwoKeys;
        impl Record for TwoKeys {
            fn fields(&self) -> Vec<Field<'_>> {
                vec![
                    Field::new("a", &[("db", "a,pk")], 1),
                    Field::new("b", &[("db", "b,pk")], 2),
                ]
            }
        }

        let (_, columns) = Resolver::default().resolve(&TwoKeys);
        assert_eq!(columns.primary_key(), Some("b"));
    }
}
