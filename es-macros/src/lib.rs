//! es-domain 配套过程宏
//!
//! - `#[entity(event = EventType)]`：为聚合结构体注入 `id`/`version`/未提交事件缓冲，
//!   并实现 `::es_domain::entity::Entity`；
//! - `#[domain_event(version = N)]`：为事件枚举实现 `::es_domain::domain_event::DomainEvent`，
//!   生成按变体分派的 `event_type`/`event_version` 与完整的 `EVENT_TYPES` 列表。
//!
use proc_macro::TokenStream;

mod derive_utils;
mod domain_event;
mod entity;
mod field_utils;

/// 聚合实体宏
///
/// ```ignore
/// #[entity(event = SomeAggregateEvent)]
/// struct SomeAggregate {
///     value: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 领域事件宏
///
/// ```ignore
/// #[domain_event(version = 1)]
/// enum SomeAggregateEvent {
///     #[event(event_type = "some.created")]
///     Created { value: String },
///     ValueChanged { new_value: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}
