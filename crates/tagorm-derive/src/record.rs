//! Record derive macro implementation

use crate::attrs;
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let table = attrs::orm_attr(&input.attrs)?
        .table
        .unwrap_or_else(|| name.unraw().to_string().to_snake_case());

    let mut entries = Vec::new();
    for field in attrs::named_fields(&input, "Record")? {
        let orm = attrs::orm_attr(&field.attrs)?;
        if orm.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let field_name = ident.unraw().to_string();
        let tags: Vec<_> = attrs::tags(field)?
            .into_iter()
            .map(|pair| {
                let (key, value) = (pair.key, pair.value);
                quote!((#key, #value))
            })
            .collect();

        entries.push(if orm.nested {
            quote! {
                ::tagorm::Field::nested(#field_name, &[#(#tags),*], &self.#ident)
            }
        } else {
            quote! {
                ::tagorm::Field::new(
                    #field_name,
                    &[#(#tags),*],
                    ::tagorm::ToValue::to_value(&self.#ident),
                )
            }
        });
    }

    Ok(quote! {
        impl #impl_generics ::tagorm::Record for #name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<::tagorm::Field<'_>> {
                ::std::vec![#(#entries),*]
            }
        }

        impl #impl_generics ::tagorm::Table for #name #ty_generics #where_clause {
            fn table_name(&self) -> &str {
                #table
            }
        }
    })
}
