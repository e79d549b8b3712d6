use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Attribute, Token};

// 拆出已有 derive 列表，其余属性原样保留
fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("derive") {
            retained.push(attr.clone());
            continue;
        }
        match attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated) {
            Ok(list) => existing.extend(list),
            Err(_) => retained.push(attr.clone()),
        }
    }
    (retained, existing)
}

// 按末段标识去重，required 在前
fn merge_derives(existing: Vec<syn::Path>, required: Vec<syn::Path>) -> Vec<syn::Path> {
    let mut seen = std::collections::HashSet::<String>::new();
    required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect()
}

fn derive_key(p: &syn::Path) -> String {
    match p.segments.last() {
        Some(last) => last.ident.to_string(),
        None => p.to_token_stream().to_string(),
    }
}

/// 把 required 合并进 attrs 上的 derive 列表（合并后的 derive 放在最前）
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);
    let merged = merge_derives(existing, required);
    if merged.is_empty() {
        *attrs = retained;
        return;
    }
    let derive: Attribute = syn::parse_quote!(#[derive(#(#merged),*)]);
    *attrs = std::iter::once(derive).chain(retained).collect();
}
