//! `#[derive(Encode)]`: generates the `musli_json_core::Encode`/`Describe`/
//! `EncodeFlatten` impls a hand-written container would otherwise need,
//! honoring `#[musli_json(...)]` field/variant attributes (C3, spec §4.3).

mod attr;
mod expand;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive `Encode` (plus the supporting `Describe`/`EncodeFlatten` impls)
/// for a struct or enum.
///
/// Recognized field attributes under `#[musli_json(...)]`: `rename = "..."`,
/// `flatten`, `skip`, `omit_empty`, `quoted`, `bytes`. Recognized variant
/// attributes: `rename = "..."`.
#[proc_macro_derive(Encode, attributes(musli_json))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand::derive_encode(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
