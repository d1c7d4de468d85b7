use syn::{Attribute, LitStr};

/// Parsed `#[musli_json(...)]` attributes on a struct field.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub(crate) rename: Option<String>,
    pub(crate) flatten: bool,
    pub(crate) skip: bool,
    pub(crate) omit_empty: bool,
    /// `,string`: wrap the field's rendered scalar in JSON quotes (spec
    /// §4.3). Has no effect the macro can usefully apply to composite
    /// fields, matching the reference encoder's own no-op there.
    pub(crate) quoted: bool,
    /// Force base64/number-array byte-sequence rendering for this field via
    /// [`musli_json_core::Bytes`]/[`musli_json_core::ByteBuf`] regardless of
    /// the field's own `Encode` impl (spec §4.3's `[]byte` special case,
    /// which Rust's lack of specialization can't apply automatically; see
    /// the comment above `impl Encode for Vec<T>` in `musli-json-core`).
    pub(crate) bytes: bool,
}

impl FieldAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = FieldAttrs::default();

        for attr in attrs {
            if !attr.path().is_ident("musli_json") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let lit: LitStr = value.parse()?;
                    out.rename = Some(lit.value());
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.path.is_ident("omit_empty") {
                    out.omit_empty = true;
                } else if meta.path.is_ident("quoted") {
                    out.quoted = true;
                } else if meta.path.is_ident("bytes") {
                    out.bytes = true;
                } else {
                    return Err(meta.error("unsupported musli_json field attribute"));
                }
                Ok(())
            })?;
        }

        if out.flatten && (out.rename.is_some() || out.omit_empty || out.quoted || out.bytes) {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "musli_json(flatten) cannot be combined with rename, omit_empty, quoted or bytes",
            ));
        }

        Ok(out)
    }
}

/// Parsed `#[musli_json(...)]` attributes on an enum variant.
#[derive(Default)]
pub(crate) struct VariantAttrs {
    pub(crate) rename: Option<String>,
}

impl VariantAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = VariantAttrs::default();

        for attr in attrs {
            if !attr.path().is_ident("musli_json") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let lit: LitStr = value.parse()?;
                    out.rename = Some(lit.value());
                } else {
                    return Err(meta.error("unsupported musli_json variant attribute"));
                }
                Ok(())
            })?;
        }

        Ok(out)
    }
}
