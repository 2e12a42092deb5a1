//! 事件上抬（Event Upcasting）
//!
//! 当事件载荷结构演进时，通过上抬器（`EventUpcaster`）在读取路径对旧事件进行
//! 逐步转换（拆分/重命名/丢弃等），`EventUpcasterChain` 负责串联多步转换
//! 并在稳定后返回。存储中的事件从不被改写。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    persist::SerializedEvent,
};
use std::sync::Arc;

/// 链式上抬的最大轮数，超过即视为上抬器之间存在循环
const MAX_UPCAST_ROUNDS: usize = 32;

/// 事件版本升级器（Upcaster）
pub trait EventUpcaster: Send + Sync {
    fn applies(&self, event_type: &str, event_version: usize) -> bool;

    fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult>;
}

impl<T> EventUpcaster for Arc<T>
where
    T: EventUpcaster + ?Sized,
{
    fn applies(&self, event_type: &str, event_version: usize) -> bool {
        (**self).applies(event_type, event_version)
    }

    fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult> {
        (**self).upcast(event)
    }
}

/// 升级结果：单个、新的多个、或丢弃
pub enum EventUpcasterResult {
    One(SerializedEvent),
    Many(Vec<SerializedEvent>),
    Drop,
}

impl EventUpcasterResult {
    fn into_events(self) -> Vec<SerializedEvent> {
        match self {
            EventUpcasterResult::One(e) => vec![e],
            EventUpcasterResult::Many(v) => v,
            EventUpcasterResult::Drop => vec![],
        }
    }
}

/// 事件升级链：按顺序应用多个 Upcaster
#[derive(Clone, Default)]
pub struct EventUpcasterChain {
    stages: Vec<Arc<dyn EventUpcaster>>,
}

impl EventUpcasterChain {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 对一批事件反复执行完整的一轮升级，直到不再有升级发生
    pub fn upcast_all(&self, mut events: Vec<SerializedEvent>) -> Result<Vec<SerializedEvent>> {
        if self.stages.is_empty() {
            return Ok(events);
        }

        for _ in 0..MAX_UPCAST_ROUNDS {
            let (upcasted, changed) = self.upcast_once(events)?;
            if !changed {
                return Ok(upcasted);
            }
            events = upcasted;
        }

        let first = events.first();
        Err(DomainError::UpcastFailed {
            event_type: first.map(|e| e.event_type().to_string()).unwrap_or_default(),
            from_version: first.map(SerializedEvent::event_version).unwrap_or_default(),
            stage: None,
            reason: format!("upcasting did not settle after {MAX_UPCAST_ROUNDS} rounds"),
        })
    }

    /// 每个事件依次穿过所有阶段，返回结果与本轮是否发生变化
    fn upcast_once(&self, events: Vec<SerializedEvent>) -> Result<(Vec<SerializedEvent>, bool)> {
        let mut changed = false;
        let mut current = events;

        for stage in &self.stages {
            let mut next = Vec::with_capacity(current.len());
            for event in current {
                if stage.applies(event.event_type(), event.event_version()) {
                    changed = true;
                    next.extend(stage.upcast(event)?.into_events());
                } else {
                    next.push(event);
                }
            }
            current = next;
        }

        Ok((current, changed))
    }
}

impl FromIterator<Arc<dyn EventUpcaster>> for EventUpcasterChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn EventUpcaster>>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mk_event(ty: &str, ver: usize, payload: serde_json::Value) -> SerializedEvent {
        SerializedEvent::builder()
            .event_type(ty)
            .event_version(ver)
            .payload(payload)
            .build()
    }

    struct SplitV1; // v1 -> init(v2) + meta(v1)
    impl EventUpcaster for SplitV1 {
        fn applies(&self, event_type: &str, event_version: usize) -> bool {
            event_type == "legacy.order.created" && event_version == 1
        }

        fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult> {
            let id = event.payload()["id"].clone();
            Ok(EventUpcasterResult::Many(vec![
                event.upcasted("order.init", 2, json!({ "id": id, "stage": "init" })),
                event.upcasted("order.meta", 1, json!({ "id": id, "source": "legacy" })),
            ]))
        }
    }

    struct DropMeta;
    impl EventUpcaster for DropMeta {
        fn applies(&self, event_type: &str, _event_version: usize) -> bool {
            event_type == "order.meta"
        }
        fn upcast(&self, _event: SerializedEvent) -> Result<EventUpcasterResult> {
            Ok(EventUpcasterResult::Drop)
        }
    }

    struct RenameInitToCreated; // init(v2) -> created(v3)
    impl EventUpcaster for RenameInitToCreated {
        fn applies(&self, event_type: &str, event_version: usize) -> bool {
            event_type == "order.init" && event_version == 2
        }
        fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult> {
            let payload = event.payload().clone();
            Ok(EventUpcasterResult::One(event.upcasted(
                "order.created",
                3,
                payload,
            )))
        }
    }

    #[test]
    fn chain_split_drop_rename_until_stable() {
        let chain: EventUpcasterChain = vec![
            Arc::new(SplitV1) as Arc<dyn EventUpcaster>,
            Arc::new(DropMeta) as Arc<dyn EventUpcaster>,
            Arc::new(RenameInitToCreated) as Arc<dyn EventUpcaster>,
        ]
        .into_iter()
        .collect();

        let legacy = mk_event("legacy.order.created", 1, json!({"id": "o-1"}));
        let other = mk_event("noop", 1, json!({"x": 1}));
        let legacy_id = legacy.event_id();

        let out = chain.upcast_all(vec![legacy, other.clone()]).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].event_type(), "order.created");
        assert_eq!(out[0].event_version(), 3);
        assert_eq!(out[0].event_id(), legacy_id);
        assert_eq!(out[0].payload()["id"], "o-1");
        assert_eq!(out[1], other);
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = EventUpcasterChain::default();
        assert!(chain.is_empty());
        let input = vec![mk_event("a", 1, json!({}))];
        assert_eq!(chain.upcast_all(input.clone()).unwrap(), input);
    }

    struct AlwaysFail;
    impl EventUpcaster for AlwaysFail {
        fn applies(&self, _event_type: &str, _event_version: usize) -> bool {
            true
        }
        fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult> {
            Err(DomainError::UpcastFailed {
                event_type: event.event_type().to_string(),
                from_version: event.event_version(),
                stage: Some("AlwaysFail"),
                reason: "boom".into(),
            })
        }
    }

    #[test]
    fn upcast_failure_returns_error() {
        let chain: EventUpcasterChain = vec![Arc::new(AlwaysFail) as Arc<dyn EventUpcaster>]
            .into_iter()
            .collect();
        let err = chain
            .upcast_all(vec![mk_event("noop", 1, json!({}))])
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::UpcastFailed {
                stage: Some("AlwaysFail"),
                ..
            }
        ));
    }

    struct PingPong; // a <-> b，永不稳定
    impl EventUpcaster for PingPong {
        fn applies(&self, _event_type: &str, _event_version: usize) -> bool {
            true
        }
        fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult> {
            let next = if event.event_type() == "a" { "b" } else { "a" };
            let payload = event.payload().clone();
            Ok(EventUpcasterResult::One(event.upcasted(next, 1, payload)))
        }
    }

    #[test]
    fn cyclic_upcasters_are_reported() {
        let chain: EventUpcasterChain = vec![Arc::new(PingPong) as Arc<dyn EventUpcaster>]
            .into_iter()
            .collect();
        let err = chain
            .upcast_all(vec![mk_event("a", 1, json!({}))])
            .unwrap_err();
        assert!(matches!(err, DomainError::UpcastFailed { stage: None, .. }));
    }
}
