//! 聚合工厂（AggregateFactory）
//!
//! 通过重建路径（`Entity::rehydrate`）构造零状态聚合，或从快照恢复；
//! 不执行业务校验、不产生事件。
//!
use crate::{
    aggregate::Aggregate,
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    persist::SerializedSnapshot,
    value_object::{AggregateId, Version},
};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct AggregateFactory {
    /// `None` 表示可构造任意聚合类型
    registered: Option<HashSet<&'static str>>,
}

impl AggregateFactory {
    /// 可构造任意实现了 `Aggregate` 的类型
    pub fn permissive() -> Self {
        Self { registered: None }
    }

    /// 仅构造显式注册的聚合类型
    pub fn builder() -> AggregateFactoryBuilder {
        AggregateFactoryBuilder::default()
    }

    pub fn is_registered(&self, aggregate_type: &str) -> bool {
        self.registered
            .as_ref()
            .is_none_or(|types| types.contains(aggregate_type))
    }

    /// 构造标识为 `aggregate_id` 的零状态实例（版本 0），或从快照恢复（快照版本）
    pub fn build<A>(
        &self,
        aggregate_id: &AggregateId,
        snapshot: Option<&SerializedSnapshot>,
    ) -> Result<A>
    where
        A: Aggregate,
    {
        if !self.is_registered(A::TYPE) {
            return Err(DomainError::UnknownAggregateType {
                aggregate_type: A::TYPE.to_string(),
            });
        }

        match snapshot {
            Some(snapshot) => {
                if snapshot.aggregate_id() != aggregate_id {
                    return Err(DomainError::TypeMismatch {
                        expected: aggregate_id.to_string(),
                        found: snapshot.aggregate_id().to_string(),
                    });
                }
                snapshot.to_aggregate::<A>()
            }
            None => Ok(A::rehydrate(*aggregate_id, Version::new())),
        }
    }
}

#[derive(Debug, Default)]
pub struct AggregateFactoryBuilder {
    types: HashSet<&'static str>,
}

impl AggregateFactoryBuilder {
    pub fn register<A>(mut self) -> Self
    where
        A: Aggregate,
    {
        self.types.insert(A::TYPE);
        self
    }

    pub fn build(self) -> AggregateFactory {
        AggregateFactory {
            registered: Some(self.types),
        }
    }
}
