//! Typed field values, literal rendering, and the `ToSql` bridge.
//!
//! Every value that flows from a record into a statement is a [`Value`]. The
//! same value can be rendered inline as a SQL literal (literal-substitution
//! mode) or bound as a parameter through `tokio-postgres` (named mode).
//!
//! Rendering rules:
//! - strings are single-quoted, embedded quotes doubled (`'O''Brien'`)
//! - `Null` renders as empty text, which makes callers drop the term
//! - numbers and booleans render in their natural text form
//! - JSON renders as a single-quoted JSON string

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::error::Error;
use std::net::IpAddr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, WrongType, to_sql_checked};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A dynamically typed field or argument value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Json(serde_json::Value::Null))
    }

    /// The string payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render as an inline SQL literal.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_text(s),
            Value::Bytes(b) => quote_text(&String::from_utf8_lossy(b)),
            Value::Json(serde_json::Value::Null) => String::new(),
            Value::Json(j) => quote_text(&j.to_string()),
        }
    }

    /// Convert into a `serde_json::Value`, used when a nested record is stored as one value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
            Value::Json(j) => j.clone(),
        }
    }
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Whether a rendered literal counts as "zero" for zero-filtering conditions.
pub fn is_zero_literal(rendered: &str) -> bool {
    rendered.is_empty() || rendered == "''" || rendered == "0"
}

// ==================== ToValue ====================

/// Conversion of a Rust field into a [`Value`].
///
/// `#[derive(Record)]` calls this for every non-nested field.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

macro_rules! impl_to_value {
    ($variant:ident as $cast:ty: $($t:ty),+) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::$variant(*self as $cast)
                }
            }
        )+
    };
}

impl_to_value!(Int as i64: i8, i16, i32, i64, isize);
impl_to_value!(UInt as u64: u8, u16, u32, u64, usize);
impl_to_value!(Float as f64: f32, f64);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Text(self.to_rfc3339())
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Text(self.format(NAIVE_DATETIME_FORMAT).to_string())
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Text(self.format(DATE_FORMAT).to_string())
    }
}

impl ToValue for NaiveTime {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }
}

macro_rules! impl_value_from {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.to_value()
                }
            }
        )+
    };
}

impl_value_from!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, &String, &str, Vec<u8>,
    serde_json::Value, DateTime<Utc>, NaiveDateTime, NaiveDate, NaiveTime, Uuid
);

impl<T: ToValue> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.to_value()
    }
}

/// Build a `Vec<Value>` from heterogeneous literals.
///
/// ```
/// use tagorm::{values, Value};
///
/// let args = values!["2024-01-01", 5];
/// assert_eq!(args, vec![Value::Text("2024-01-01".into()), Value::Int(5)]);
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($v:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($v)),+]
    };
}

// ==================== ToSql ====================

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => {
                if *ty == Type::BOOL {
                    b.to_sql(ty, out)
                } else if is_text_type(ty) {
                    b.to_string().to_sql(ty, out)
                } else {
                    Err(wrong_type(ty))
                }
            }
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::UInt(u) => int_to_sql(i64::try_from(*u)?, ty, out),
            Value::Float(f) => float_to_sql(*f, ty, out),
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Bytes(b) => {
                if *ty == Type::BYTEA {
                    b.to_sql(ty, out)
                } else {
                    let text = String::from_utf8_lossy(b);
                    text_to_sql(&text, ty, out)
                }
            }
            Value::Json(serde_json::Value::Null) => Ok(IsNull::Yes),
            Value::Json(j) => {
                if *ty == Type::JSON || *ty == Type::JSONB {
                    j.to_sql(ty, out)
                } else {
                    text_to_sql(&j.to_string(), ty, out)
                }
            }
        }
    }

    // Conversion is decided per value in `to_sql`; an impossible one fails there.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Types whose binary format is the UTF-8 text itself.
fn is_text_type(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_))
}

fn wrong_type(ty: &Type) -> BoxError {
    Box::new(WrongType::new::<Value>(ty.clone()))
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::INT8 {
        v.to_sql(ty, out)
    } else if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::OID {
        u32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT8 || *ty == Type::FLOAT4 {
        float_to_sql(v as f64, ty, out)
    } else if *ty == Type::NUMERIC {
        numeric_to_sql(&v.to_string(), ty, out)
    } else if is_text_type(ty) {
        v.to_string().to_sql(ty, out)
    } else {
        Err(wrong_type(ty))
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::FLOAT8 {
        v.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        numeric_to_sql(&v.to_string(), ty, out)
    } else if is_text_type(ty) {
        v.to_string().to_sql(ty, out)
    } else {
        Err(wrong_type(ty))
    }
}

#[cfg(feature = "rust_decimal")]
fn numeric_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let decimal = s
        .parse::<rust_decimal::Decimal>()
        .or_else(|_| rust_decimal::Decimal::from_scientific(s))?;
    decimal.to_sql(ty, out)
}

#[cfg(not(feature = "rust_decimal"))]
fn numeric_to_sql(_s: &str, ty: &Type, _out: &mut BytesMut) -> Result<IsNull, BoxError> {
    Err(wrong_type(ty))
}

/// Text is the lingua franca of tagged records; coerce it into the column type the server expects.
///
/// Types without a conversion fail with [`WrongType`] rather than receiving raw UTF-8.
fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if is_text_type(ty) {
        s.to_sql(ty, out)
    } else if *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 || *ty == Type::OID {
        int_to_sql(s.trim().parse::<i64>()?, ty, out)
    } else if *ty == Type::FLOAT4 || *ty == Type::FLOAT8 {
        float_to_sql(s.trim().parse::<f64>()?, ty, out)
    } else if *ty == Type::NUMERIC {
        numeric_to_sql(s.trim(), ty, out)
    } else if *ty == Type::BOOL {
        s.trim().parse::<bool>()?.to_sql(ty, out)
    } else if *ty == Type::UUID {
        Uuid::parse_str(s.trim())?.to_sql(ty, out)
    } else if *ty == Type::INET {
        s.trim().parse::<IpAddr>()?.to_sql(ty, out)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMPTZ {
        let ts = match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(_) => NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)?.and_utc(),
        };
        ts.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMP {
        NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)?.to_sql(ty, out)
    } else if *ty == Type::DATE {
        NaiveDate::parse_from_str(s, DATE_FORMAT)?.to_sql(ty, out)
    } else if *ty == Type::TIME {
        NaiveTime::parse_from_str(s, TIME_FORMAT)?.to_sql(ty, out)
    } else {
        Err(wrong_type(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_literals_by_type() {
        assert_eq!(Value::Null.to_literal(), "");
        assert_eq!(Value::from("").to_literal(), "''");
        assert_eq!(Value::from("abc").to_literal(), "'abc'");
        assert_eq!(Value::from(5).to_literal(), "5");
        assert_eq!(Value::from(1.5).to_literal(), "1.5");
        assert_eq!(Value::from(true).to_literal(), "true");
        assert_eq!(
            Value::from(serde_json::json!({"a": 1})).to_literal(),
            r#"'{"a":1}'"#
        );
        assert_eq!(Value::Json(serde_json::Value::Null).to_literal(), "");
    }

    #[test]
    fn doubles_embedded_quotes() {
        assert_eq!(Value::from("O'Brien").to_literal(), "'O''Brien'");
    }

    #[test]
    fn zero_literals() {
        assert!(is_zero_literal(""));
        assert!(is_zero_literal("''"));
        assert!(is_zero_literal("0"));
        assert!(!is_zero_literal("'0'"));
        assert!(!is_zero_literal("0.5"));
    }

    #[test]
    fn option_none_is_null() {
        let v: Option<i32> = None;
        assert!(Value::from(v).is_null());
        assert_eq!(Value::from(Some(3_i32)), Value::Int(3));
    }

    #[test]
    fn values_macro_mixes_types() {
        let args = values!["a", 1_u8, false];
        assert_eq!(
            args,
            vec![Value::Text("a".into()), Value::UInt(1), Value::Bool(false)]
        );
    }

    #[test]
    fn binds_text_into_integer_column() {
        let mut buf = BytesMut::new();
        let is_null = Value::from("42").to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&buf[..], &42_i32.to_be_bytes());
    }

    #[test]
    fn narrows_int_for_int2() {
        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT2, &mut buf).unwrap();
        assert_eq!(&buf[..], &7_i16.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::Int(70_000).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn binds_text_into_uuid_column() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let mut buf = BytesMut::new();
        Value::from(id.to_string())
            .to_sql_checked(&Type::UUID, &mut buf)
            .unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..], id.as_bytes());
        assert_eq!(Value::from(id), Value::from("550e8400-e29b-41d4-a716-446655440000"));

        let mut buf = BytesMut::new();
        assert!(Value::from("not-a-uuid").to_sql(&Type::UUID, &mut buf).is_err());
    }

    #[test]
    fn binds_text_into_inet_and_time_columns() {
        let mut buf = BytesMut::new();
        Value::from("10.0.0.1").to_sql(&Type::INET, &mut buf).unwrap();
        // family, bits, is_cidr, length, address
        assert_eq!(&buf[..], &[2, 32, 0, 4, 10, 0, 0, 1]);

        let mut buf = BytesMut::new();
        Value::from("10:30:00").to_sql(&Type::TIME, &mut buf).unwrap();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn unsupported_column_types_are_rejected() {
        let mut buf = BytesMut::new();
        let err = Value::from("1,2").to_sql(&Type::POINT, &mut buf).err().unwrap();
        assert!(err.is::<WrongType>());
        assert!(buf.is_empty());

        let mut buf = BytesMut::new();
        assert!(Value::Int(1).to_sql(&Type::UUID, &mut buf).is_err());
        assert!(Value::Bool(true).to_sql(&Type::INT4, &mut buf).is_err());
    }

    #[test]
    fn text_types_receive_plain_utf8() {
        let mut buf = BytesMut::new();
        Value::from("abc").to_sql(&Type::VARCHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"abc");

        let mut buf = BytesMut::new();
        Value::Int(42).to_sql(&Type::TEXT, &mut buf).unwrap();
        assert_eq!(&buf[..], b"42");

        let mut buf = BytesMut::new();
        Value::from(serde_json::json!({"a": 1}))
            .to_sql(&Type::TEXT, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], br#"{"a":1}"#);
    }

    #[cfg(feature = "rust_decimal")]
    #[test]
    fn binds_numbers_and_text_into_numeric_column() {
        let expected = |s: &str| {
            let mut buf = BytesMut::new();
            s.parse::<rust_decimal::Decimal>()
                .unwrap()
                .to_sql(&Type::NUMERIC, &mut buf)
                .unwrap();
            buf
        };

        let mut buf = BytesMut::new();
        Value::from("12.50").to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert_eq!(buf, expected("12.50"));

        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert_eq!(buf, expected("7"));

        let mut buf = BytesMut::new();
        assert!(Value::from("abc").to_sql(&Type::NUMERIC, &mut buf).is_err());
    }
}
