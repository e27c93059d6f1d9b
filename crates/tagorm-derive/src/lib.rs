//! Derive macros for tagorm
//!
//! Provides `#[derive(Record)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_row;
mod record;

/// Derive `Record` and `Table` for a struct.
///
/// # Example
///
/// ```ignore
/// use tagorm::Record;
///
/// #[derive(Record)]
/// #[orm(table = "users")]
/// struct User {
///     #[tag(json = "uid", db = "uid,pk")]
///     uid: String,
///     #[tag(json = "userName", db = "user_name")]
///     name: String,
///     #[orm(nested)]
///     audit: Audit,
///     #[orm(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (default: snake_case struct name)
/// - `#[tag(key = "value", ...)]` - Field tags read by the resolver
/// - `#[orm(nested)]` - The field is itself a `Record`
/// - `#[orm(skip)]` - Leave the field out
#[proc_macro_derive(Record, attributes(orm, tag))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` trait for a struct.
///
/// Columns come from the first segment of the `db` tag, so one struct can be
/// both written and read back. A builder configured with another column key
/// (`OrmConfig::column_key("col")`) needs the same key here.
///
/// # Attributes
///
/// - `#[orm(column_key = "col")]` - Struct level: read columns from the `col` tag
/// - `#[tag(db = "column,pk")]` - Read from `column`
/// - `#[orm(column = "name")]` - Read from `name`, overriding the tag
/// - `#[orm(nested)]` / `#[orm(skip)]` - Filled with `Default::default()`
#[proc_macro_derive(FromRow, attributes(orm, tag))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
