//! FromRow derive macro implementation

use crate::attrs;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let column_key = attrs::orm_attr(&input.attrs)?
        .column_key
        .unwrap_or_else(|| DEFAULT_COLUMN_KEY.to_string());

    let mut field_extracts = Vec::new();
    for field in attrs::named_fields(&input, "FromRow")? {
        let Some(ident) = &field.ident else {
            continue;
        };
        let orm = attrs::orm_attr(&field.attrs)?;
        if orm.skip || orm.nested {
            field_extracts.push(quote! {
                #ident: ::std::default::Default::default()
            });
            continue;
        }
        let column = column_name(ident, orm.column, &attrs::tags(field)?, &column_key);
        field_extracts.push(quote! {
            #ident: row.try_get_column(#column)?
        });
    }

    Ok(quote! {
        impl #impl_generics ::tagorm::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::tagorm::tokio_postgres::Row) -> ::tagorm::OrmResult<Self> {
                use ::tagorm::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

/// Tag key the runtime resolver reads columns from by default.
const DEFAULT_COLUMN_KEY: &str = "db";

/// `#[orm(column)]`, else the first segment of the `key` tag, else the field name.
fn column_name(
    ident: &syn::Ident,
    column: Option<String>,
    tags: &[attrs::TagPair],
    key: &str,
) -> String {
    if let Some(column) = column {
        return column;
    }
    tags.iter()
        .find(|pair| pair.key == key)
        .and_then(|pair| pair.value.split(',').next())
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "-")
        .map(str::to_string)
        .unwrap_or_else(|| ident.unraw().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrs::TagPair;
    use proc_macro2::Span;

    fn tag(key: &str, value: &str) -> TagPair {
        TagPair {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn column_comes_from_the_configured_tag_key() {
        let ident = syn::Ident::new("name", Span::call_site());
        let tags = [tag("db", "user_name"), tag("col", "uname,pk")];
        assert_eq!(column_name(&ident, None, &tags, "db"), "user_name");
        assert_eq!(column_name(&ident, None, &tags, "col"), "uname");
        assert_eq!(column_name(&ident, None, &tags, "sql"), "name");
        assert_eq!(
            column_name(&ident, Some("override".into()), &tags, "col"),
            "override"
        );
    }

    #[test]
    fn struct_level_column_key_is_parsed() {
        let input: DeriveInput = syn::parse_quote! {
            #[orm(table = "users", column_key = "col")]
            struct User {
                #[tag(col = "uname")]
                name: String,
            }
        };
        let attr = attrs::orm_attr(&input.attrs).unwrap();
        assert_eq!(attr.column_key.as_deref(), Some("col"));
        assert!(expand(input).unwrap().to_string().contains("\"uname\""));
    }
}
