use crate::{
    aggregate::Aggregate,
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    value_object::{AggregateId, Version},
};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 聚合在某一版本上的物化状态；仅用于加速回放，从不作为权威数据
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    aggregate_id: AggregateId,
    #[builder(into)]
    aggregate_type: String,
    aggregate_version: Version,
    payload: Value,
}

impl SerializedSnapshot {
    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_version(&self) -> Version {
        self.aggregate_version
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 将快照反序列化为聚合实例，版本以快照记录为准
    pub fn to_aggregate<A>(&self) -> Result<A>
    where
        A: Aggregate,
    {
        if A::TYPE != self.aggregate_type {
            return Err(DomainError::TypeMismatch {
                expected: A::TYPE.to_string(),
                found: self.aggregate_type.clone(),
            });
        }

        let mut aggregate: A = serde_json::from_value(self.payload.clone())?;

        if aggregate.id() != &self.aggregate_id {
            return Err(DomainError::TypeMismatch {
                expected: self.aggregate_id.to_string(),
                found: aggregate.id().to_string(),
            });
        }

        aggregate.set_version(self.aggregate_version);
        Ok(aggregate)
    }

    /// 从聚合实例创建快照（未提交事件不进入快照）
    pub fn from_aggregate<A>(aggregate: &A) -> Result<Self>
    where
        A: Aggregate,
    {
        Ok(Self {
            aggregate_id: *aggregate.id(),
            aggregate_type: A::TYPE.to_string(),
            aggregate_version: aggregate.version(),
            payload: serde_json::to_value(aggregate)?,
        })
    }
}
