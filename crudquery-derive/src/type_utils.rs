//! Type introspection utilities for field analysis

/// Date and date-time types that are compared by their date part.
const DATE_TYPES: &[&str] = &[
    "Date",
    "DateTime",
    "DateTimeUtc",
    "DateTimeLocal",
    "DateTimeWithTimeZone",
    "NaiveDate",
    "NaiveDateTime",
    "OffsetDateTime",
    "PrimitiveDateTime",
    "TimeDate",
    "TimeDateTime",
    "TimeDateTimeWithTimeZone",
];

/// Returns true if the field's type is `Option<…>` (including `std::option::Option<…>`).
pub fn field_is_optional(ty: &syn::Type) -> bool {
    if let syn::Type::Path(type_path) = ty
        && let Some(last_seg) = type_path.path.segments.last()
    {
        last_seg.ident == "Option"
    } else {
        false
    }
}

/// `T` for `Option<T>`, the type itself otherwise.
pub fn strip_option(ty: &syn::Type) -> &syn::Type {
    if field_is_optional(ty)
        && let syn::Type::Path(type_path) = ty
        && let Some(last_seg) = type_path.path.segments.last()
        && let syn::PathArguments::AngleBracketed(args) = &last_seg.arguments
        && let Some(syn::GenericArgument::Type(inner)) = args.args.first()
    {
        inner
    } else {
        ty
    }
}

/// Whether the field holds a date or date-time, optional or not.
pub fn is_date_type(ty: &syn::Type) -> bool {
    if let syn::Type::Path(type_path) = strip_option(ty)
        && let Some(last_seg) = type_path.path.segments.last()
    {
        DATE_TYPES.iter().any(|name| last_seg.ident == name)
    } else {
        false
    }
}
