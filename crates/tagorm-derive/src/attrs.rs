//! Attribute parsing shared by the derives.
//!
//! `#[orm(...)]` carries macro options, `#[tag(...)]` carries the field tags
//! handed to the runtime resolver verbatim.

use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, Result, Token};

/// Parsed `#[orm(...)]` options.
#[derive(Default)]
pub(crate) struct OrmAttr {
    pub table: Option<String>,
    pub column: Option<String>,
    /// Tag key `FromRow` reads columns from (struct level).
    pub column_key: Option<String>,
    pub nested: bool,
    pub skip: bool,
}

impl syn::parse::Parse for OrmAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = OrmAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "nested" {
                attr.nested = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else {
                let _: Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if ident == "table" {
                    attr.table = Some(value.value());
                } else if ident == "column" {
                    attr.column = Some(value.value());
                } else if ident == "column_key" {
                    attr.column_key = Some(value.value());
                } else {
                    return Err(syn::Error::new_spanned(
                        &ident,
                        format!("unknown orm option `{ident}`"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                let _: Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

/// One `key = "value"` pair of `#[tag(...)]`. Keys may be keywords (`type`).
pub(crate) struct TagPair {
    pub key: String,
    pub value: String,
}

impl syn::parse::Parse for TagPair {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let key = syn::Ident::parse_any(input)?;
        let _: Token![=] = input.parse()?;
        let value: syn::LitStr = input.parse()?;
        Ok(TagPair {
            key: key.unraw().to_string(),
            value: value.value(),
        })
    }
}

/// Merge every `#[orm(...)]` attribute in `attrs`.
pub(crate) fn orm_attr(attrs: &[syn::Attribute]) -> Result<OrmAttr> {
    let mut merged = OrmAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: OrmAttr = attr.parse_args()?;
        merged.table = parsed.table.or(merged.table);
        merged.column = parsed.column.or(merged.column);
        merged.column_key = parsed.column_key.or(merged.column_key);
        merged.nested |= parsed.nested;
        merged.skip |= parsed.skip;
    }
    Ok(merged)
}

/// All `#[tag(...)]` pairs of a field, in declaration order.
pub(crate) fn tags(field: &syn::Field) -> Result<Vec<TagPair>> {
    let mut pairs = Vec::new();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("tag")) {
        let parsed = attr.parse_args_with(Punctuated::<TagPair, Token![,]>::parse_terminated)?;
        pairs.extend(parsed);
    }
    Ok(pairs)
}

/// Named fields of a struct, or an error naming the derive.
pub(crate) fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a Punctuated<syn::Field, Token![,]>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}
