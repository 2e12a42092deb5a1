use quote::ToTokens;
use std::collections::HashSet;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

// derive 去重用的 key：`Serialize` 与 `serde::Serialize` 视为同一项
fn derive_key(path: &Path) -> String {
    match path.segments.last() {
        Some(last) if last.ident == "Serialize" || last.ident == "Deserialize" => {
            format!("serde::{}", last.ident)
        }
        Some(last) => last.ident.to_string(),
        None => path.to_token_stream().to_string(),
    }
}

/// 将宏要求的 derive 与用户已写的 derive 合并为单个 `#[derive(...)]`，置于属性最前
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) {
    let mut user_derives: Vec<Path> = Vec::new();
    let mut others: Vec<Attribute> = Vec::new();

    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            others.push(attr);
            continue;
        }
        match attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) {
            Ok(list) => user_derives.extend(list),
            Err(_) => others.push(attr),
        }
    }

    let mut seen = HashSet::new();
    let merged: Vec<Path> = required
        .into_iter()
        .chain(user_derives)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(others);
}
