//! 事件持久化模型（SerializedEvent）
//!
//! 定义事件在持久化层的标准形态与领域事件之间的转换，
//! 并提供批量序列化/反序列化与上抬组合的工具函数。
//!
use crate::{
    aggregate::Aggregate,
    domain_event::DomainEvent,
    error::{DomainError, DomainResult},
    event_upcaster::EventUpcasterChain,
};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 事件唯一标识符
    #[builder(default = Uuid::new_v4())]
    event_id: Uuid,
    /// 事件类型，回放时据此匹配聚合的 apply 分支
    #[builder(into)]
    event_type: String,
    /// 事件载荷版本，用于事件版本控制和升级
    #[builder(default = 1)]
    event_version: usize,
    /// 事件负载，存储事件的具体数据
    payload: Value,
}

impl SerializedEvent {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> usize {
        self.event_version
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 以新的类型/版本/载荷派生事件，保留事件标识（供上抬器使用）
    pub fn upcasted(&self, event_type: impl Into<String>, event_version: usize, payload: Value) -> Self {
        Self {
            event_id: self.event_id,
            event_type: event_type.into(),
            event_version,
            payload,
        }
    }

    /// 从领域事件序列化
    pub fn from_event<E>(event: &E) -> DomainResult<Self>
    where
        E: DomainEvent,
    {
        Ok(Self {
            event_id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            event_version: event.event_version(),
            payload: serde_json::to_value(event)?,
        })
    }

    /// 反序列化为聚合 `A` 的领域事件
    ///
    /// 事件类型不在 `A::Event::EVENT_TYPES` 中时返回 `UnhandledEventType`，
    /// 在触碰任何聚合状态之前失败；载荷解码出的变体与 `event_type` 不一致时返回 `TypeMismatch`。
    pub fn to_event<A>(&self) -> DomainResult<A::Event>
    where
        A: Aggregate,
    {
        if !<A::Event as DomainEvent>::handles(&self.event_type) {
            return Err(DomainError::UnhandledEventType {
                aggregate_type: A::TYPE.to_string(),
                event_type: self.event_type.clone(),
            });
        }

        let event: A::Event = serde_json::from_value(self.payload.clone())?;
        if event.event_type() != self.event_type {
            return Err(DomainError::TypeMismatch {
                expected: self.event_type.clone(),
                found: event.event_type().to_string(),
            });
        }

        Ok(event)
    }
}

pub fn serialize_events<E>(events: &[E]) -> DomainResult<Vec<SerializedEvent>>
where
    E: DomainEvent,
{
    events.iter().map(SerializedEvent::from_event).collect()
}

pub fn deserialize_events<A>(
    upcaster_chain: &EventUpcasterChain,
    events: Vec<SerializedEvent>,
) -> DomainResult<Vec<A::Event>>
where
    A: Aggregate,
{
    let events = upcaster_chain.upcast_all(events)?;

    events.iter().map(SerializedEvent::to_event::<A>).collect()
}
