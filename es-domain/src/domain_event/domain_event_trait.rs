use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// 一个聚合的全部事件建模为一个枚举，`apply` 中对其显式 `match` 分派；
/// 通常由 `#[domain_event]` 宏生成本 trait 的实现。
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// 该事件枚举能够处理的全部事件类型名
    const EVENT_TYPES: &'static [&'static str];

    /// 事件类型（形如 `OrderEvent.Created` 或自定义类型名）
    fn event_type(&self) -> &'static str;

    /// 事件载荷版本（用于版本兼容与上抬）
    fn event_version(&self) -> usize;

    /// 当前代码是否认识该事件类型
    fn handles(event_type: &str) -> bool {
        Self::EVENT_TYPES.contains(&event_type)
    }
}
