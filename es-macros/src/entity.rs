use crate::derive_utils::apply_derives;
use crate::field_utils::ensure_required_fields;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Field, Item, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input,
};

/// #[entity] 宏实现
/// - 注入字段（若缺失）：`id: AggregateId`, `version: Version`,
///   `#[serde(skip)] uncommitted: Vec<Event>`，并置于字段最前
/// - 自动实现 `::es_domain::entity::Entity`（rehydrate/id/version/未提交事件缓冲）
/// - 参数：`#[entity(event = EventType, debug = true|false)]`；
///   - `event` 必填，聚合产生的领域事件类型
///   - `debug` 默认 `true`（派生 Debug）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let Some(event_ty) = cfg.event_ty else {
        return syn::Error::new(
            st.ident.span(),
            "#[entity] requires the event type, e.g. #[entity(event = OrderEvent)]",
        )
        .to_compile_error()
        .into();
    };

    // 仅支持具名字段结构体
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let required: Vec<Field> = vec![
        syn::parse_quote! { id: ::es_domain::value_object::AggregateId },
        syn::parse_quote! { version: ::es_domain::value_object::Version },
        syn::parse_quote! {
            #[serde(skip)]
            uncommitted: ::std::vec::Vec<#event_ty>
        },
    ];
    ensure_required_fields(fields_named, required);

    let mut derives: Vec<syn::Path> = vec![
        syn::parse_quote!(Default),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    if cfg.derive_debug.unwrap_or(true) {
        derives.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, derives);

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let expanded = quote! {
        #st

        impl #impl_generics ::es_domain::entity::Entity for #ident #ty_generics #where_clause {
            type Event = #event_ty;

            fn rehydrate(
                id: ::es_domain::value_object::AggregateId,
                version: ::es_domain::value_object::Version,
            ) -> Self {
                Self { id, version, ..::std::default::Default::default() }
            }

            fn id(&self) -> &::es_domain::value_object::AggregateId { &self.id }

            fn version(&self) -> ::es_domain::value_object::Version { self.version }

            fn set_version(&mut self, version: ::es_domain::value_object::Version) {
                self.version = version;
            }

            fn uncommitted(&self) -> &[Self::Event] { &self.uncommitted }

            fn uncommitted_mut(&mut self) -> &mut ::std::vec::Vec<Self::Event> {
                &mut self.uncommitted
            }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct EntityAttrConfig {
    event_ty: Option<Type>,
    derive_debug: Option<bool>,
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut event_ty: Option<Type> = None;
        let mut derive_debug: Option<bool> = None;

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Event(ty) => {
                    if event_ty.is_some() {
                        return Err(syn::Error::new(
                            ty.span(),
                            "duplicate key 'event' in attribute",
                        ));
                    }
                    event_ty = Some(*ty);
                }
                EntityAttrElem::Debug(b) => {
                    if derive_debug.is_some() {
                        return Err(syn::Error::new(
                            proc_macro2::Span::call_site(),
                            "duplicate key 'debug' in attribute",
                        ));
                    }
                    derive_debug = Some(b);
                }
            }
        }

        Ok(Self {
            event_ty,
            derive_debug,
        })
    }
}

enum EntityAttrElem {
    Event(Box<Type>),
    Debug(bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "event" {
            let ty: Type = input.parse()?;
            Ok(EntityAttrElem::Event(Box::new(ty)))
        } else if key == "debug" {
            match input.parse::<syn::Expr>()? {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Bool(b),
                    ..
                }) => Ok(EntityAttrElem::Debug(b.value())),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected boolean literal for 'debug'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'event' or 'debug'",
            ))
        }
    }
}
