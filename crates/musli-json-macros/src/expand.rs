use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Field, Fields, Generics, Index};

use crate::attr::{FieldAttrs, VariantAttrs};

pub(crate) fn derive_encode(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;

    match &input.data {
        Data::Struct(data) => expand_struct(name, &input.generics, data),
        Data::Enum(data) => expand_enum(name, &input.generics, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input,
            "musli_json::Encode cannot be derived for unions",
        )),
    }
}

/// Clone `generics`, adding `bound` to every type parameter. Mirrors the
/// same trick serde_derive uses so a derived impl doesn't require the
/// container's generic parameters to satisfy bounds the container itself
/// never asked for.
fn add_bound(generics: &Generics, bound: TokenStream) -> Generics {
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(#bound));
    }
    generics
}

struct NamedField<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    name: String,
    explicit: bool,
    flatten: bool,
    omit_empty: bool,
    quoted: bool,
    bytes: bool,
}

fn collect_named_fields<'a>(
    fields: &'a syn::FieldsNamed,
) -> syn::Result<Vec<NamedField<'a>>> {
    let mut out = Vec::new();
    for field in &fields.named {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let ident = field.ident.as_ref().expect("named field has an ident");
        let name = attrs.rename.clone().unwrap_or_else(|| ident.to_string());

        // Spec §3: a field name containing a backslash, quote, or comma is
        // invalid and the field is dropped from the compiled program
        // entirely (as opposed to a validation error — the reference
        // encoder reaches this case via a malformed struct tag string, which
        // it resolves the same way, silently).
        if name.contains(['\\', '"', ',']) {
            continue;
        }

        out.push(NamedField {
            ident,
            ty: &field.ty,
            name,
            explicit: attrs.rename.is_some(),
            flatten: attrs.flatten,
            omit_empty: attrs.omit_empty,
            quoted: attrs.quoted,
            bytes: attrs.bytes,
        });
    }
    Ok(out)
}

fn expand_struct(name: &syn::Ident, generics: &Generics, data: &DataStruct) -> syn::Result<TokenStream> {
    match &data.fields {
        Fields::Named(named) => expand_named_struct(name, generics, named),
        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
            expand_newtype_struct(name, generics, unnamed.unnamed.first().unwrap())
        }
        Fields::Unnamed(unnamed) => expand_tuple_struct(name, generics, unnamed),
        Fields::Unit => expand_unit_struct(name, generics),
    }
}

fn expand_named_struct(
    name: &syn::Ident,
    generics: &Generics,
    fields: &syn::FieldsNamed,
) -> syn::Result<TokenStream> {
    let named = collect_named_fields(fields)?;
    let field_count = named.len();

    // Own (depth-0) fields are encoded before any `flatten` splice below,
    // regardless of declaration order in the source struct: dominance (spec
    // §4.3) says a shallower field always wins over a deeper duplicate, and
    // the only way the shared `__seen` set enforces that is if the shallow
    // write claims the name first.
    let mut own_encode_stmts = Vec::new();
    let mut own_flatten_stmts = Vec::new();
    let mut flatten_encode_stmts = Vec::new();
    let mut flatten_flatten_stmts = Vec::new();
    let mut describe_pushes = Vec::new();

    for (index, field) in named.iter().enumerate() {
        let ident = field.ident;
        let field_name = &field.name;
        let explicit = field.explicit;
        let ty = field.ty;

        if field.flatten {
            flatten_encode_stmts.push(quote! {
                ::musli_json_core::EncodeFlatten::encode_flatten(&self.#ident, &mut __st, &mut __seen, __visible)?;
            });
            flatten_flatten_stmts.push(quote! {
                ::musli_json_core::EncodeFlatten::encode_flatten(&self.#ident, __into, __seen, __visible)?;
            });
            describe_pushes.push(quote! {
                {
                    let __child = ::musli_json_core::describe_child::<#ty>(__ancestors);
                    if let ::musli_json_core::Kind::Struct { fields: __child_fields } = __child.kind {
                        for __f in __child_fields {
                            let __depth = if __f.flatten { 2 } else { 1 };
                            __raw.push((
                                ::musli_json_core::Candidate {
                                    name: __f.name.to_string(),
                                    depth: __depth,
                                    explicit: __f.explicit_name,
                                    index: __raw.len(),
                                },
                                __f.node,
                                __f.omit_empty,
                            ));
                        }
                    }
                }
            });
        } else {
            let omit_empty = field.omit_empty;
            let omit_check = if omit_empty {
                quote! { && !::musli_json_core::IsEmpty::is_empty_value(&self.#ident) }
            } else {
                quote! {}
            };

            // `bytes` forces base64/number-array rendering via the `Bytes`
            // wrapper (spec §4.3's `[]byte` special case); `quoted` (the
            // `,string` tag) wraps an otherwise-bare scalar in JSON quotes.
            // The two are mutually exclusive in practice (a byte sequence is
            // already string-shaped), so `bytes` takes precedence.
            let (encode_field_call, flatten_field_call) = if field.bytes {
                (
                    quote! {
                        ::musli_json_core::StructEncoder::encode_field(
                            &mut __st, #field_name,
                            &::musli_json_core::Bytes::new(::std::convert::AsRef::<[u8]>::as_ref(&self.#ident)),
                        )?;
                    },
                    quote! {
                        ::musli_json_core::StructEncoder::encode_field(
                            __into, #field_name,
                            &::musli_json_core::Bytes::new(::std::convert::AsRef::<[u8]>::as_ref(&self.#ident)),
                        )?;
                    },
                )
            } else if field.quoted {
                (
                    quote! {
                        ::musli_json_core::StructEncoder::encode_field_quoted(&mut __st, #field_name, &self.#ident)?;
                    },
                    quote! {
                        ::musli_json_core::StructEncoder::encode_field_quoted(__into, #field_name, &self.#ident)?;
                    },
                )
            } else {
                (
                    quote! {
                        ::musli_json_core::StructEncoder::encode_field(&mut __st, #field_name, &self.#ident)?;
                    },
                    quote! {
                        ::musli_json_core::StructEncoder::encode_field(__into, #field_name, &self.#ident)?;
                    },
                )
            };

            own_encode_stmts.push(quote! {
                if __visible.contains(#field_name)
                    && __seen.insert(#field_name)
                    && ::musli_json_core::StructEncoder::options(&__st).allows_field(#field_name)
                    #omit_check
                {
                    #encode_field_call
                }
            });
            own_flatten_stmts.push(quote! {
                if __visible.contains(#field_name)
                    && __seen.insert(#field_name)
                    && ::musli_json_core::StructEncoder::options(__into).allows_field(#field_name)
                    #omit_check
                {
                    #flatten_field_call
                }
            });

            let describe_node = if field.bytes {
                quote! {
                    ::std::boxed::Box::new(::musli_json_core::ProgramNode::new(
                        ::std::any::type_name::<#ty>(),
                        ::musli_json_core::Kind::Bytes,
                    ))
                }
            } else {
                quote! { ::std::boxed::Box::new(::musli_json_core::describe_child::<#ty>(__ancestors)) }
            };

            describe_pushes.push(quote! {
                __raw.push((
                    ::musli_json_core::Candidate {
                        name: #field_name.to_string(),
                        depth: 0,
                        explicit: #explicit,
                        index: __raw.len(),
                    },
                    #describe_node,
                    #omit_empty,
                ));
            });
        }
        let _ = index;
    }

    let encode_generics = add_bound(generics, quote!(::musli_json_core::Encode));
    let (encode_impl_generics, ty_generics, encode_where) = encode_generics.split_for_impl();

    let describe_generics = add_bound(generics, quote!(::musli_json_core::Describe + 'static));
    let (describe_impl_generics, _, describe_where) = describe_generics.split_for_impl();

    let flatten_generics = add_bound(generics, quote!(::musli_json_core::Encode));
    let (flatten_impl_generics, _, flatten_where) = flatten_generics.split_for_impl();

    Ok(quote! {
        impl #encode_impl_generics ::musli_json_core::Encode for #name #ty_generics #encode_where {
            fn encode<__E: ::musli_json_core::Encoder>(
                &self,
                __encoder: __E,
            ) -> ::std::result::Result<__E::Ok, ::musli_json_core::Error> {
                let mut __seen: ::std::collections::HashSet<&'static str> =
                    ::std::collections::HashSet::new();
                let __visible = ::musli_json_core::visible_field_names::<#name #ty_generics>();
                let mut __st = ::musli_json_core::Encoder::encode_struct(__encoder, #field_count)?;
                #(#own_encode_stmts)*
                #(#flatten_encode_stmts)*
                ::musli_json_core::StructEncoder::end(__st)
            }
        }

        impl #describe_impl_generics ::musli_json_core::Describe for #name #ty_generics #describe_where {
            fn describe(
                __ancestors: &mut ::std::vec::Vec<::std::any::TypeId>,
            ) -> ::musli_json_core::ProgramNode {
                let mut __raw: ::std::vec::Vec<(
                    ::musli_json_core::Candidate,
                    ::std::boxed::Box<::musli_json_core::ProgramNode>,
                    bool,
                )> = ::std::vec::Vec::new();
                #(#describe_pushes)*
                let __fields = ::musli_json_core::resolve_struct_fields(__raw);
                ::musli_json_core::ProgramNode::new(
                    ::std::any::type_name::<#name #ty_generics>(),
                    ::musli_json_core::Kind::Struct { fields: __fields },
                )
            }
        }

        impl #flatten_impl_generics ::musli_json_core::EncodeFlatten for #name #ty_generics #flatten_where {
            fn encode_flatten<__S: ::musli_json_core::StructEncoder>(
                &self,
                __into: &mut __S,
                __seen: &mut ::std::collections::HashSet<&'static str>,
                __visible: &::std::collections::HashSet<&'static str>,
            ) -> ::std::result::Result<(), ::musli_json_core::Error> {
                #(#own_flatten_stmts)*
                #(#flatten_flatten_stmts)*
                ::std::result::Result::Ok(())
            }
        }
    })
}

fn expand_unit_struct(name: &syn::Ident, generics: &Generics) -> syn::Result<TokenStream> {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::musli_json_core::Encode for #name #ty_generics #where_clause {
            fn encode<__E: ::musli_json_core::Encoder>(
                &self,
                __encoder: __E,
            ) -> ::std::result::Result<__E::Ok, ::musli_json_core::Error> {
                let __st = ::musli_json_core::Encoder::encode_struct(__encoder, 0)?;
                ::musli_json_core::StructEncoder::end(__st)
            }
        }

        impl #impl_generics ::musli_json_core::Describe for #name #ty_generics #where_clause {
            fn describe(
                _ancestors: &mut ::std::vec::Vec<::std::any::TypeId>,
            ) -> ::musli_json_core::ProgramNode {
                ::musli_json_core::ProgramNode::new(
                    ::std::any::type_name::<#name #ty_generics>(),
                    ::musli_json_core::Kind::Struct { fields: ::std::vec::Vec::new() },
                )
            }
        }
    })
}

/// A single-field tuple struct (`struct Meters(f64);`) encodes transparently
/// as its inner value, matching how such "newtype" wrappers are used in
/// practice (a typed alias, not a one-element container).
fn expand_newtype_struct(
    name: &syn::Ident,
    generics: &Generics,
    field: &Field,
) -> syn::Result<TokenStream> {
    let ty = &field.ty;

    let encode_generics = add_bound(generics, quote!(::musli_json_core::Encode));
    let (encode_impl_generics, ty_generics, encode_where) = encode_generics.split_for_impl();

    let describe_generics = add_bound(generics, quote!(::musli_json_core::Describe + 'static));
    let (describe_impl_generics, _, describe_where) = describe_generics.split_for_impl();

    Ok(quote! {
        impl #encode_impl_generics ::musli_json_core::Encode for #name #ty_generics #encode_where {
            fn encode<__E: ::musli_json_core::Encoder>(
                &self,
                __encoder: __E,
            ) -> ::std::result::Result<__E::Ok, ::musli_json_core::Error> {
                ::musli_json_core::encode_value(&self.0, __encoder)
            }
        }

        impl #describe_impl_generics ::musli_json_core::Describe for #name #ty_generics #describe_where {
            fn describe(
                __ancestors: &mut ::std::vec::Vec<::std::any::TypeId>,
            ) -> ::musli_json_core::ProgramNode {
                ::musli_json_core::describe_child::<#ty>(__ancestors)
            }
        }
    })
}

fn expand_tuple_struct(
    name: &syn::Ident,
    generics: &Generics,
    fields: &syn::FieldsUnnamed,
) -> syn::Result<TokenStream> {
    let len = fields.unnamed.len();
    let indices: Vec<Index> = (0..len).map(Index::from).collect();
    let types: Vec<&syn::Type> = fields.unnamed.iter().map(|f| &f.ty).collect();

    let encode_generics = add_bound(generics, quote!(::musli_json_core::Encode));
    let (encode_impl_generics, ty_generics, encode_where) = encode_generics.split_for_impl();

    let describe_generics = add_bound(generics, quote!(::musli_json_core::Describe + 'static));
    let (describe_impl_generics, _, describe_where) = describe_generics.split_for_impl();

    Ok(quote! {
        impl #encode_impl_generics ::musli_json_core::Encode for #name #ty_generics #encode_where {
            fn encode<__E: ::musli_json_core::Encoder>(
                &self,
                __encoder: __E,
            ) -> ::std::result::Result<__E::Ok, ::musli_json_core::Error> {
                let mut __seq = ::musli_json_core::Encoder::encode_sequence(__encoder, ::std::option::Option::Some(#len))?;
                #(
                    ::musli_json_core::SequenceEncoder::encode_element(&mut __seq, &self.#indices)?;
                )*
                ::musli_json_core::SequenceEncoder::end(__seq)
            }
        }

        impl #describe_impl_generics ::musli_json_core::Describe for #name #ty_generics #describe_where {
            fn describe(
                __ancestors: &mut ::std::vec::Vec<::std::any::TypeId>,
            ) -> ::musli_json_core::ProgramNode {
                let __elements = ::std::vec![
                    #(::musli_json_core::describe_child::<#types>(__ancestors)),*
                ];
                ::musli_json_core::ProgramNode::new(
                    ::std::any::type_name::<#name #ty_generics>(),
                    ::musli_json_core::Kind::Tuple(__elements),
                )
            }
        }
    })
}

fn expand_enum(name: &syn::Ident, generics: &Generics, data: &DataEnum) -> syn::Result<TokenStream> {
    let mut encode_arms = Vec::new();

    for variant in &data.variants {
        let attrs = VariantAttrs::parse(&variant.attrs)?;
        let variant_ident = &variant.ident;
        let tag = attrs
            .rename
            .clone()
            .unwrap_or_else(|| variant_ident.to_string());

        let arm = match &variant.fields {
            Fields::Unit => quote! {
                #name::#variant_ident => ::musli_json_core::Encoder::encode_str(__encoder, #tag),
            },
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => quote! {
                #name::#variant_ident(__value) => {
                    let mut __st = ::musli_json_core::Encoder::encode_struct(__encoder, 1)?;
                    ::musli_json_core::StructEncoder::encode_field(&mut __st, #tag, __value)?;
                    ::musli_json_core::StructEncoder::end(__st)
                }
            },
            Fields::Unnamed(unnamed) => {
                let bindings: Vec<syn::Ident> = (0..unnamed.unnamed.len())
                    .map(|i| quote::format_ident!("__f{i}"))
                    .collect();
                quote! {
                    #name::#variant_ident(#(#bindings),*) => {
                        let mut __inner = ::musli_json_core::Encoder::encode_sequence(__encoder, ::std::option::Option::None)?;
                        #(::musli_json_core::SequenceEncoder::encode_element(&mut __inner, #bindings)?;)*
                        ::musli_json_core::SequenceEncoder::end(__inner)
                    }
                }
            }
            Fields::Named(named) => {
                let bindings: Vec<&syn::Ident> =
                    named.named.iter().map(|f| f.ident.as_ref().unwrap()).collect();
                let names: Vec<String> = bindings.iter().map(|b| b.to_string()).collect();
                let types: Vec<&syn::Type> = named.named.iter().map(|f| &f.ty).collect();
                let count = bindings.len();
                quote! {
                    #name::#variant_ident { #(#bindings),* } => {
                        struct __Payload<'__a> {
                            #(#bindings: &'__a #types),*
                        }

                        impl<'__a> ::musli_json_core::Encode for __Payload<'__a> {
                            fn encode<__E2: ::musli_json_core::Encoder>(
                                &self,
                                __encoder2: __E2,
                            ) -> ::std::result::Result<__E2::Ok, ::musli_json_core::Error> {
                                let mut __inner = ::musli_json_core::Encoder::encode_struct(__encoder2, #count)?;
                                #(
                                    ::musli_json_core::StructEncoder::encode_field(&mut __inner, #names, self.#bindings)?;
                                )*
                                ::musli_json_core::StructEncoder::end(__inner)
                            }
                        }

                        let __payload = __Payload { #(#bindings),* };
                        let mut __outer = ::musli_json_core::Encoder::encode_struct(__encoder, 1)?;
                        ::musli_json_core::StructEncoder::encode_field(&mut __outer, #tag, &__payload)?;
                        ::musli_json_core::StructEncoder::end(__outer)
                    }
                }
            }
        };

        encode_arms.push(arm);
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::musli_json_core::Encode for #name #ty_generics #where_clause {
            fn encode<__E: ::musli_json_core::Encoder>(
                &self,
                __encoder: __E,
            ) -> ::std::result::Result<__E::Ok, ::musli_json_core::Error> {
                match self {
                    #(#encode_arms)*
                }
            }
        }

        impl #impl_generics ::musli_json_core::Describe for #name #ty_generics #where_clause {
            fn describe(
                _ancestors: &mut ::std::vec::Vec<::std::any::TypeId>,
            ) -> ::musli_json_core::ProgramNode {
                ::musli_json_core::ProgramNode::new(
                    ::std::any::type_name::<#name #ty_generics>(),
                    ::musli_json_core::Kind::Custom,
                )
            }
        }
    })
}
