use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[action] 宏实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as ActionAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let mut required: Vec<syn::Path> = Vec::new();
    if cfg.derive_debug.unwrap_or(true) {
        required.push(syn::parse_quote!(Debug));
    }

    let (ident, generics) = match &mut input {
        Item::Struct(st) => {
            apply_derives(&mut st.attrs, required);
            (st.ident.clone(), st.generics.clone())
        }
        Item::Enum(en) => {
            apply_derives(&mut en.attrs, required);
            (en.ident.clone(), en.generics.clone())
        }
        other => {
            return syn::Error::new(other.span(), "#[action] only supports struct or enum")
                .to_compile_error()
                .into();
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // 未声明父级 kind 时沿用 trait 默认实现
    let is_a = if cfg.parents.is_empty() {
        quote! {}
    } else {
        let parents = &cfg.parents;
        quote! {
            fn is_a(&self, kind: &::action_bus::kind::ActionKind) -> bool {
                false #(|| kind.is::<#parents>())*
            }
        }
    };

    TokenStream::from(quote! {
        #input

        impl #impl_generics ::action_bus::action::Action for #ident #ty_generics #where_clause {
            #is_a
        }
    })
}

// -------- parsing --------

struct ActionAttrConfig {
    parents: Vec<Type>,
    derive_debug: Option<bool>,
}

impl Parse for ActionAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut parents: Option<Vec<Type>> = None;
        let mut derive_debug: Option<bool> = None;

        let elems: Punctuated<ActionAttrElem, Token![,]> = Punctuated::parse_terminated(input)?;
        for elem in elems {
            match elem {
                ActionAttrElem::Extends(span, types) => {
                    if parents.is_some() {
                        return Err(syn::Error::new(span, "duplicate key 'extends' in attribute"));
                    }
                    parents = Some(types);
                }
                ActionAttrElem::Debug(span, b) => {
                    if derive_debug.is_some() {
                        return Err(syn::Error::new(span, "duplicate key 'debug' in attribute"));
                    }
                    derive_debug = Some(b);
                }
            }
        }

        Ok(Self {
            parents: parents.unwrap_or_default(),
            derive_debug,
        })
    }
}

enum ActionAttrElem {
    Extends(proc_macro2::Span, Vec<Type>),
    Debug(proc_macro2::Span, bool),
}

impl Parse for ActionAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        if key == "extends" {
            let content;
            syn::parenthesized!(content in input);
            let types: Punctuated<Type, Token![,]> = Punctuated::parse_terminated(&content)?;
            if types.is_empty() {
                return Err(syn::Error::new(
                    key.span(),
                    "'extends' requires at least one parent kind",
                ));
            }
            Ok(Self::Extends(key.span(), types.into_iter().collect()))
        } else if key == "debug" {
            let _eq: Token![=] = input.parse()?;
            let expr: syn::Expr = input.parse()?;
            match expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Bool(b),
                    ..
                }) => Ok(Self::Debug(key.span(), b.value())),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected boolean literal for 'debug'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'extends' or 'debug'",
            ))
        }
    }
}
