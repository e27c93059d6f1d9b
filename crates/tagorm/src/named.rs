//! `:name` placeholder scanning.
//!
//! Statements carry `:name` markers bound against a [`ParamBag`]. The driver
//! speaks `$1..$N`, so markers are rewritten right before execution. Text in
//! single or double quotes and `::type` casts are left alone.

use crate::error::{OrmError, OrmResult};
use crate::param::ParamBag;
use crate::value::Value;
use indexmap::IndexSet;

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether `name` can stand in a `:name` marker as is.
pub fn is_bind_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.first().copied().is_some_and(is_ident_start) && bytes.iter().copied().all(is_ident_char)
}

fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !out.as_bytes().first().copied().is_some_and(is_ident_start) {
        out.insert(0, '_');
    }
    out
}

/// A bindable name derived from `base` that is not yet a key of `params`.
///
/// Characters outside `[A-Za-z0-9_]` become `_`; a taken name gets a
/// `_2`, `_3`, ... suffix.
pub(crate) fn fresh_name(params: &ParamBag, base: &str) -> String {
    let base = if is_bind_name(base) {
        base.to_string()
    } else {
        sanitize(base)
    };
    if !params.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let key = format!("{base}_{n}");
        if !params.contains(&key) {
            return key;
        }
        n += 1;
    }
}

/// `:name` marker for the bag entry `logical`.
///
/// A logical name the scanner cannot read back (`user-name`, `1st`) is
/// copied under a fresh bindable name first.
pub(crate) fn bind_marker(params: &mut ParamBag, logical: &str) -> String {
    if is_bind_name(logical) {
        return format!(":{logical}");
    }
    let key = fresh_name(params, logical);
    if let Some(value) = params.get(logical).cloned() {
        params.insert(key.clone(), value);
    }
    format!(":{key}")
}

/// Rewrite every `:name` marker with the text returned by `replace`.
///
/// `replace` receives the zero-based occurrence index and the name.
pub(crate) fn replace_placeholders<F>(sql: &str, mut replace: F) -> OrmResult<String>
where
    F: FnMut(usize, &str) -> OrmResult<String>,
{
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<u8> = None;
    let mut last = 0;
    let mut occurrence = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                i += 1;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' if bytes.get(i + 1).copied().is_some_and(is_ident_start) => {
                let start = i + 1;
                let mut end = start + 1;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                out.push_str(&sql[last..i]);
                out.push_str(&replace(occurrence, &sql[start..end])?);
                occurrence += 1;
                last = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[last..]);
    Ok(out)
}

/// Names of all `:name` markers, in order of appearance (repeats included).
pub fn placeholders(sql: &str) -> Vec<String> {
    let mut names = Vec::new();
    // The closure never fails.
    let _ = replace_placeholders(sql, |_, name| {
        names.push(name.to_string());
        Ok(String::new())
    });
    names
}

/// Rewrite `:name` markers into `$1..$N` and collect the bound values.
///
/// Repeated names reuse their index. A name missing from `params` is an
/// [`OrmError::MissingParam`].
pub fn to_positional(sql: &str, params: &ParamBag) -> OrmResult<(String, Vec<Value>)> {
    let mut order: IndexSet<String> = IndexSet::new();
    let mut values = Vec::new();

    let rewritten = replace_placeholders(sql, |_, name| {
        let (index, inserted) = order.insert_full(name.to_string());
        if inserted {
            let value = params
                .get(name)
                .ok_or_else(|| OrmError::MissingParam(name.to_string()))?;
            values.push(value.clone());
        }
        Ok(format!("${}", index + 1))
    })?;

    Ok((rewritten, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag() -> ParamBag {
        [("a", Value::from("x")), ("b", Value::Int(5))]
            .into_iter()
            .collect()
    }

    #[test]
    fn finds_placeholders() {
        assert_eq!(
            placeholders("created>=:a AND id=:b OR id=:a"),
            vec!["a", "b", "a"]
        );
    }

    #[test]
    fn skips_casts_and_quoted_text() {
        assert_eq!(
            placeholders("x::text = ':no' AND \"c:d\" = :yes AND t='12:30'"),
            vec!["yes"]
        );
        assert!(placeholders("a = ':' OR b = 1:2").is_empty());
    }

    #[test]
    fn rewrites_to_positional_reusing_indexes() {
        let (sql, values) = to_positional("a=:a AND b=:b AND c=:a", &bag()).unwrap();
        assert_eq!(sql, "a=$1 AND b=$2 AND c=$1");
        assert_eq!(values, vec![Value::from("x"), Value::Int(5)]);
    }

    #[test]
    fn fresh_names_avoid_taken_keys() {
        let mut params = bag();
        params.insert("a_2", Value::Null);
        assert_eq!(fresh_name(&params, "c"), "c");
        assert_eq!(fresh_name(&params, "a"), "a_3");
        assert_eq!(fresh_name(&params, "user-name"), "user_name");
        assert_eq!(fresh_name(&params, "1st"), "_1st");
        assert_eq!(fresh_name(&params, "prénom"), "pr_nom");
    }

    #[test]
    fn markers_for_unreadable_names_bind_a_copy() {
        let mut params = bag();
        params.insert("user-name", Value::from("alice"));
        assert_eq!(bind_marker(&mut params, "a"), ":a");

        let marker = bind_marker(&mut params, "user-name");
        assert_eq!(marker, ":user_name");
        let (sql, values) = to_positional(&format!("x={marker}"), &params).unwrap();
        assert_eq!(sql, "x=$1");
        assert_eq!(values, vec![Value::from("alice")]);
    }

    #[test]
    fn missing_name_is_an_error() {
        let err = to_positional("a=:nope", &bag()).unwrap_err();
        assert!(matches!(err, OrmError::MissingParam(ref n) if n == "nope"));
    }
}
