//! Implementation of #[derive(Component)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, LitStr, Member, Meta};

const BY_TYPE: &str = ",type";

pub fn derive_component_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs",
            ))
        }
    };

    let injections = field_injections(fields)?;
    let mutable = is_mutable(input)?;
    let as_mutable = if mutable {
        quote! {
            fn as_mutable(&self) -> ::core::option::Option<&dyn ::tether_di::MutableValue> {
                ::core::option::Option::Some(self)
            }
        }
    } else {
        TokenStream2::new()
    };
    // Fields of a mutable type are instantiated and absorb the resolved value
    let resolver = if mutable {
        quote! {
            impl #impl_generics ::tether_di::Resolver for #name #ty_generics #where_clause {
                fn type_key() -> ::tether_di::Key {
                    ::tether_di::Key::of::<Self>()
                }

                fn resolve(
                    key: &::tether_di::Key,
                    instance: &::tether_di::Instance,
                ) -> ::core::result::Result<Self, ::tether_di::InjectError> {
                    ::tether_di::absorb_into_new(key, instance)
                }
            }
        }
    } else {
        TokenStream2::new()
    };

    Ok(quote! {
        impl #impl_generics ::tether_di::Component for #name #ty_generics #where_clause {
            const RECORD: bool = true;

            #[allow(unused_variables)]
            fn inject_fields(
                &mut self,
                fields: &mut ::tether_di::FieldInjector<'_>,
            ) -> ::core::result::Result<(), ::tether_di::InjectError> {
                #(#injections)*
                ::core::result::Result::Ok(())
            }

            #as_mutable
        }

        #resolver
    })
}

/// One `fields.field(..)` call per field carrying `#[inject]`
fn field_injections(fields: &Fields) -> syn::Result<Vec<TokenStream2>> {
    let mut injections = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
            continue;
        };

        let tag = match &attr.meta {
            Meta::Path(_) => LitStr::new(BY_TYPE, attr.span()),
            Meta::List(_) => attr.parse_args::<LitStr>()?,
            Meta::NameValue(_) => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "expected #[inject] or #[inject(\"key\")]",
                ))
            }
        };

        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        let field_name = match &member {
            Member::Named(ident) => ident.to_string(),
            Member::Unnamed(index) => index.index.to_string(),
        };

        injections.push(quote! {
            fields.field(#field_name, #tag, &mut self.#member)?;
        });
    }

    Ok(injections)
}

/// Parses #[component(mutable)]
fn is_mutable(input: &DeriveInput) -> syn::Result<bool> {
    let mut mutable = false;

    for attr in &input.attrs {
        if !attr.path().is_ident("component") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("mutable") {
                mutable = true;
                Ok(())
            } else {
                Err(meta.error("unsupported component attribute, expected `mutable`"))
            }
        })?;
    }

    Ok(mutable)
}
