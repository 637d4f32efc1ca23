use syn::parse::Parser;
use syn::{Lit, Meta, punctuated::Punctuated, token::Comma};

/// Struct-level `#[query(...)]` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAttributes {
    pub table: Option<String>,
    pub limit: Option<u64>,
}

/// Field-level `#[query(...)]` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub filterable: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub date: bool,
    pub soft_delete: bool,
    pub primary_key: bool,
}

fn query_metas(attrs: &[syn::Attribute]) -> Result<Vec<Meta>, syn::Error> {
    let mut metas = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("query") {
            continue;
        }
        let Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                attr,
                "expected `#[query(...)]`",
            ));
        };
        metas.extend(Punctuated::<Meta, Comma>::parse_terminated.parse2(meta_list.tokens.clone())?);
    }
    Ok(metas)
}

/// Parses `#[query(table = "...", limit = N)]` on the model struct.
pub(crate) fn parse_model_attributes(
    attrs: &[syn::Attribute],
) -> Result<ModelAttributes, syn::Error> {
    let mut model = ModelAttributes::default();

    for meta in query_metas(attrs)? {
        let Meta::NameValue(nv) = &meta else {
            return Err(syn::Error::new_spanned(
                &meta,
                "expected `table = \"...\"` or `limit = N`",
            ));
        };
        let syn::Expr::Lit(expr_lit) = &nv.value else {
            return Err(syn::Error::new_spanned(&nv.value, "expected a literal"));
        };

        match &expr_lit.lit {
            Lit::Str(s) if nv.path.is_ident("table") => model.table = Some(s.value()),
            Lit::Int(i) if nv.path.is_ident("limit") => {
                let limit = i.base10_parse::<u64>()?;
                if limit == 0 {
                    return Err(syn::Error::new_spanned(i, "`limit` must be positive"));
                }
                model.limit = Some(limit);
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &nv.path,
                    "unknown `query` attribute, expected `table = \"...\"` or `limit = N`",
                ));
            }
        }
    }

    Ok(model)
}

/// Parses the `#[query(...)]` flags of one field. `primary_key` also comes
/// from `#[sea_orm(primary_key)]`.
pub(crate) fn parse_field_flags(field: &syn::Field) -> Result<FieldFlags, syn::Error> {
    let mut flags = FieldFlags {
        primary_key: has_sea_orm_flag(&field.attrs, "primary_key"),
        ..FieldFlags::default()
    };

    for meta in query_metas(&field.attrs)? {
        let Meta::Path(path) = &meta else {
            return Err(syn::Error::new_spanned(
                &meta,
                "expected a flag such as `filterable`",
            ));
        };
        let flag = if path.is_ident("filterable") {
            &mut flags.filterable
        } else if path.is_ident("sortable") {
            &mut flags.sortable
        } else if path.is_ident("searchable") {
            &mut flags.searchable
        } else if path.is_ident("date") {
            &mut flags.date
        } else if path.is_ident("soft_delete") {
            &mut flags.soft_delete
        } else if path.is_ident("primary_key") {
            &mut flags.primary_key
        } else {
            return Err(syn::Error::new_spanned(
                path,
                "unknown `query` flag, expected one of: filterable, sortable, searchable, date, soft_delete, primary_key",
            ));
        };
        *flag = true;
    }

    Ok(flags)
}

fn sea_orm_metas(attrs: &[syn::Attribute]) -> impl Iterator<Item = Meta> + '_ {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("sea_orm"))
        .filter_map(|attr| match &attr.meta {
            Meta::List(meta_list) => {
                Punctuated::<Meta, Comma>::parse_terminated.parse2(meta_list.tokens.clone()).ok()
            }
            _ => None,
        })
        .flatten()
}

fn sea_orm_string(attrs: &[syn::Attribute], key: &str) -> Option<String> {
    sea_orm_metas(attrs).find_map(|meta| {
        if let Meta::NameValue(nv) = meta
            && nv.path.is_ident(key)
            && let syn::Expr::Lit(expr_lit) = &nv.value
            && let Lit::Str(s) = &expr_lit.lit
        {
            Some(s.value())
        } else {
            None
        }
    })
}

fn has_sea_orm_flag(attrs: &[syn::Attribute], key: &str) -> bool {
    sea_orm_metas(attrs).any(|meta| matches!(meta, Meta::Path(path) if path.is_ident(key)))
}

/// Extracts the table name from Sea-ORM attributes.
/// Looks for `#[sea_orm(table_name = "...")]` attribute.
pub(crate) fn extract_table_name(attrs: &[syn::Attribute]) -> Option<String> {
    sea_orm_string(attrs, "table_name")
}

/// The database column of a field: `#[sea_orm(column_name = "...")]` or the
/// field name.
pub(crate) fn column_name(field: &syn::Field) -> Option<String> {
    sea_orm_string(&field.attrs, "column_name")
        .or_else(|| field.ident.as_ref().map(ToString::to_string))
}
