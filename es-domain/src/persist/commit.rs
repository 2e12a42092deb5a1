//! 提交（Commit）
//!
//! 一次 `save` 产生的原子持久化单元：同一聚合的一组有序事件，
//! 携带提交前的流版本（expected_version）与提交头。
//!
use crate::{
    domain_event::CommitHeaders,
    error::{DomainError, DomainResult},
    persist::SerializedEvent,
    value_object::{AggregateId, Version},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    commit_id: Uuid,
    aggregate_id: AggregateId,
    aggregate_type: String,
    /// 提交前的流版本
    expected_version: Version,
    events: Vec<SerializedEvent>,
    headers: CommitHeaders,
    committed_at: DateTime<Utc>,
}

impl Commit {
    /// 创建提交；事件列表不能为空
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        expected_version: Version,
        events: Vec<SerializedEvent>,
        headers: CommitHeaders,
    ) -> DomainResult<Self> {
        if events.is_empty() {
            return Err(DomainError::InvalidCommit {
                reason: format!("commit for {aggregate_id} has no events"),
            });
        }

        Ok(Self {
            commit_id: Uuid::new_v4(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            expected_version,
            events,
            headers,
            committed_at: Utc::now(),
        })
    }

    /// 以新的基准版本重建提交（冲突后追赶重试时使用），生成新的提交标识
    pub fn rebased(&self, expected_version: Version) -> Self {
        Self {
            commit_id: Uuid::new_v4(),
            expected_version,
            committed_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn commit_id(&self) -> Uuid {
        self.commit_id
    }

    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn expected_version(&self) -> Version {
        self.expected_version
    }

    /// 提交后的流版本：`expected_version + events.len()`
    pub fn version(&self) -> Version {
        self.expected_version.advance(self.events.len())
    }

    pub fn events(&self) -> &[SerializedEvent] {
        &self.events
    }

    pub fn headers(&self) -> &CommitHeaders {
        &self.headers
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    /// 带版本号的事件迭代：`(该事件提交后的流版本, 事件)`
    pub fn versioned_events(&self) -> impl Iterator<Item = (Version, &SerializedEvent)> {
        let base = self.expected_version;
        self.events
            .iter()
            .enumerate()
            .map(move |(i, e)| (base.advance(i + 1), e))
    }
}
