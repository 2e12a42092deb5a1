use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Ident, Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[domain_event] 宏实现
/// - 仅支持枚举，每个变体对应一种事件（具名/元组/单元变体均可）
/// - 生成 `::es_domain::domain_event::DomainEvent` 实现：
///   `EVENT_TYPES`、`event_type`、`event_version`
/// - 枚举级参数：`#[domain_event(version = N)]`，默认 1
/// - 变体可覆写：`#[event(event_type = "...", event_version = N)]`
///   未覆写时事件类型为 `枚举名.变体名`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(
                other.span(),
                "#[domain_event] can only be used on enum types",
            )
            .to_compile_error()
            .into();
        }
    };

    let version_lit = cfg.version.unwrap_or_else(|| syn::parse_quote! { 1 });

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut enum_item.attrs, required);

    let enum_name = enum_item.ident.to_string();
    let mut variant_types: HashMap<String, syn::LitStr> = HashMap::new();
    let mut variant_versions: HashMap<String, syn::LitInt> = HashMap::new();

    for v in &mut enum_item.variants {
        let mut retained_attrs = Vec::new();

        for attr in v.attrs.drain(..) {
            if !attr.path().is_ident("event") {
                retained_attrs.push(attr);
                continue;
            }
            let vc = match parse_variant_event_attr(&attr) {
                Ok(vc) => vc,
                Err(err) => return err.to_compile_error().into(),
            };
            let key = v.ident.to_string();
            if let Some(lit) = vc.ty {
                if variant_types.insert(key.clone(), lit).is_some() {
                    return syn::Error::new(
                        attr.span(),
                        "duplicate 'event_type' specified for this variant",
                    )
                    .to_compile_error()
                    .into();
                }
            }
            if let Some(lit) = vc.version {
                if variant_versions.insert(key, lit).is_some() {
                    return syn::Error::new(
                        attr.span(),
                        "duplicate 'event_version' specified for this variant",
                    )
                    .to_compile_error()
                    .into();
                }
            }
        }

        v.attrs = retained_attrs;
    }

    // 每个变体的事件类型名（覆写优先，否则 `Enum.Variant`）
    let type_lits: Vec<syn::LitStr> = enum_item
        .variants
        .iter()
        .map(|v| {
            variant_types.get(&v.ident.to_string()).cloned().unwrap_or_else(|| {
                syn::LitStr::new(&format!("{}.{}", enum_name, v.ident), v.ident.span())
            })
        })
        .collect();

    // 事件类型名在同一枚举内必须唯一，否则回放时无法区分
    for (i, lit) in type_lits.iter().enumerate() {
        if type_lits[..i].iter().any(|prev| prev.value() == lit.value()) {
            return syn::Error::new(lit.span(), "duplicate event_type within enum")
                .to_compile_error()
                .into();
        }
    }

    let type_match_arms = enum_item.variants.iter().zip(type_lits.iter()).map(|(v, lit)| {
        let v_ident = &v.ident;
        quote! { Self::#v_ident { .. } => #lit }
    });

    let ver_match_arms = enum_item.variants.iter().map(|v| {
        let v_ident = &v.ident;
        match variant_versions.get(&v.ident.to_string()) {
            Some(lit) => quote! { Self::#v_ident { .. } => #lit },
            None => quote! { Self::#v_ident { .. } => #version_lit },
        }
    });

    let enum_ident = &enum_item.ident;
    let (impl_generics, ty_generics, where_clause) = enum_item.generics.split_for_impl();

    let out = quote! {
        #enum_item

        impl #impl_generics ::es_domain::domain_event::DomainEvent for #enum_ident #ty_generics #where_clause {
            const EVENT_TYPES: &'static [&'static str] = &[ #( #type_lits, )* ];

            fn event_type(&self) -> &'static str { match self { #( #type_match_arms, )* } }

            fn event_version(&self) -> usize { match self { #( #ver_match_arms, )* } }
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

struct VariantEventAttrConfig {
    ty: Option<syn::LitStr>,
    version: Option<syn::LitInt>,
}

fn parse_variant_event_attr(attr: &syn::Attribute) -> Result<VariantEventAttrConfig> {
    let syn::Meta::List(_) = &attr.meta else {
        return Err(syn::Error::new(attr.span(), "expected #[event(...)]"));
    };

    let mut ty: Option<syn::LitStr> = None;
    let mut version: Option<syn::LitInt> = None;
    let pairs: Punctuated<VariantEventAttrKv, Token![,]> =
        attr.parse_args_with(Punctuated::<VariantEventAttrKv, Token![,]>::parse_terminated)?;

    for kv in pairs {
        match kv.key.to_string().as_str() {
            "event_type" => {
                if ty.is_some() {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "duplicate key 'event_type' in attribute",
                    ));
                }
                match kv.value {
                    Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(lit),
                        ..
                    }) => ty = Some(lit),
                    other => {
                        return Err(syn::Error::new(
                            other.span(),
                            "expected string literal for 'event_type'",
                        ));
                    }
                }
            }
            "event_version" => {
                if version.is_some() {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "duplicate key 'event_version' in attribute",
                    ));
                }
                match kv.value {
                    Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Int(lit),
                        ..
                    }) => version = Some(lit),
                    other => {
                        return Err(syn::Error::new(
                            other.span(),
                            "expected integer literal for 'event_version'",
                        ));
                    }
                }
            }
            _ => {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key; expected 'event_type' | 'event_version'",
                ));
            }
        }
    }

    Ok(VariantEventAttrConfig { ty, version })
}

struct VariantEventAttrKv {
    key: Ident,
    value: Expr,
}

impl Parse for VariantEventAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}

// 枚举级配置：默认事件载荷版本号
struct EventAttrConfig {
    version: Option<syn::LitInt>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut version: Option<syn::LitInt> = None;

        let pairs: Punctuated<syn::ExprAssign, Token![,]> =
            Punctuated::<syn::ExprAssign, Token![,]>::parse_terminated(input)?;

        for assign in pairs.into_iter() {
            let key_ident = match *assign.left {
                syn::Expr::Path(p) if p.path.segments.len() == 1 => {
                    p.path.segments[0].ident.clone()
                }
                other => return Err(syn::Error::new(other.span(), "invalid attribute key")),
            };
            match key_ident.to_string().as_str() {
                "version" => {
                    if version.is_some() {
                        return Err(syn::Error::new(
                            key_ident.span(),
                            "duplicate key 'version' in attribute",
                        ));
                    }
                    match *assign.right {
                        Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Int(lit),
                            ..
                        }) => version = Some(lit),
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "expected integer literal for 'version'",
                            ));
                        }
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        key_ident.span(),
                        "unknown key; expected 'version'",
                    ));
                }
            }
        }

        Ok(Self { version })
    }
}
