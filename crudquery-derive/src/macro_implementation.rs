use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attribute_parser::{
    FieldFlags, column_name, extract_table_name, parse_field_flags, parse_model_attributes,
};
use crate::type_utils::is_date_type;

/// Column lists collected from the fields of one model.
#[derive(Debug, Default)]
pub(crate) struct ModelColumns {
    pub primary_key: Option<String>,
    pub soft_delete: Option<String>,
    pub filterable: Vec<String>,
    pub sortable: Vec<String>,
    pub searchable: Vec<String>,
    pub date: Vec<String>,
}

pub(crate) fn analyze_fields(
    fields: &syn::punctuated::Punctuated<syn::Field, syn::token::Comma>,
) -> Result<ModelColumns, syn::Error> {
    let mut columns = ModelColumns::default();

    for field in fields {
        let FieldFlags {
            filterable,
            sortable,
            searchable,
            date,
            soft_delete,
            primary_key,
        } = parse_field_flags(field)?;
        let Some(column) = column_name(field) else {
            continue;
        };

        if primary_key && columns.primary_key.is_none() {
            columns.primary_key = Some(column.clone());
        }
        if soft_delete {
            if columns.soft_delete.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field can be marked `#[query(soft_delete)]`",
                ));
            }
            columns.soft_delete = Some(column.clone());
        }
        if filterable {
            columns.filterable.push(column.clone());
        }
        if sortable {
            columns.sortable.push(column.clone());
        }
        if searchable {
            columns.searchable.push(column.clone());
        }
        if date || is_date_type(&field.ty) {
            columns.date.push(column);
        }
    }

    Ok(columns)
}

pub(crate) fn derive_query_model(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "QueryModel can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "QueryModel only supports structs with named fields",
        ));
    };

    let model = parse_model_attributes(&input.attrs)?;
    let Some(table) = model.table.or_else(|| extract_table_name(&input.attrs)) else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "missing table name, add `#[sea_orm(table_name = \"...\")]` or `#[query(table = \"...\")]`",
        ));
    };
    let columns = analyze_fields(&named.named)?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let primary_key = columns.primary_key.map(|pk| {
        quote! { const PRIMARY_KEY: &'static str = #pk; }
    });
    let soft_delete = columns.soft_delete.map(|column| {
        quote! { const SOFT_DELETE_COLUMN: Option<&'static str> = Some(#column); }
    });
    let limit = model.limit.map(|limit| {
        quote! { const PAGINATION_LIMIT: u64 = #limit; }
    });
    let ModelColumns {
        filterable,
        sortable,
        searchable,
        date,
        ..
    } = columns;

    Ok(quote! {
        impl #impl_generics ::crudquery::QueryModel for #name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table;
            #primary_key
            #soft_delete
            #limit

            fn filterable_fields() -> Vec<&'static str> {
                vec![#(#filterable),*]
            }

            fn sortable_fields() -> Vec<&'static str> {
                vec![#(#sortable),*]
            }

            fn searchable_fields() -> Vec<&'static str> {
                vec![#(#searchable),*]
            }

            fn date_fields() -> Vec<&'static str> {
                vec![#(#date),*]
            }
        }
    })
}
