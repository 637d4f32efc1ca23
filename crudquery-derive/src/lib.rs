mod attribute_parser;
mod macro_implementation;
mod type_utils;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `crudquery::QueryModel` for a Sea-ORM entity model.
///
/// The table name comes from `#[sea_orm(table_name = "...")]` and the primary
/// key from `#[sea_orm(primary_key)]`. Field flags:
///
/// - `filterable`, `sortable`, `searchable`: add the column to the whitelist
/// - `date`: compare the column by its date part (date and date-time types are
///   detected without it)
/// - `soft_delete`: the deletion timestamp column
/// - `primary_key`: when the Sea-ORM attribute is not used
///
/// ```rust,ignore
/// #[derive(Clone, Debug, PartialEq, DeriveEntityModel, QueryModel)]
/// #[sea_orm(table_name = "posts")]
/// #[query(limit = 25)]
/// pub struct Model {
///     #[sea_orm(primary_key)]
///     pub id: i32,
///     #[query(filterable, sortable, searchable)]
///     pub title: String,
///     #[query(filterable, sortable)]
///     pub published_at: Option<DateTimeUtc>,
///     #[query(soft_delete)]
///     pub deleted_at: Option<DateTimeUtc>,
/// }
/// ```
#[proc_macro_derive(QueryModel, attributes(query))]
pub fn query_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    macro_implementation::derive_query_model(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
