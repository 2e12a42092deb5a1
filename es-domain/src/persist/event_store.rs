//! 事件流存储协议（EventStore）
//!
//! 按聚合标识组织的只追加提交日志：
//! - `read_from`：读取覆盖 `min_version` 之后版本的全部提交，按版本有序；
//! - `append`：仅当流当前版本恰为 `commit.expected_version` 时追加成功，
//!   否则返回自该版本以来的提交，由调用方判断冲突。
//!
use crate::{
    error::DomainResult as Result,
    persist::Commit,
    value_object::{AggregateId, Version},
};
use async_trait::async_trait;
use std::sync::Arc;

/// 追加结果
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// 追加成功，携带提交后的流版本
    Committed(Version),
    /// 有并发写入者先行推进了流，携带 expected_version 之后的全部提交
    Conflict(Vec<Commit>),
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// 读取 `version() > min_version` 的提交；未知标识返回空列表
    async fn read_from(&self, aggregate_id: &AggregateId, min_version: Version)
    -> Result<Vec<Commit>>;

    /// 原子追加；不得出现部分可见的提交
    ///
    /// - 空提交返回 `InvalidCommit`；
    /// - `expected_version` 超出当前流版本返回 `StreamGap`（保持版本连续）。
    async fn append(&self, commit: Commit) -> Result<AppendOutcome>;
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn read_from(
        &self,
        aggregate_id: &AggregateId,
        min_version: Version,
    ) -> Result<Vec<Commit>> {
        (**self).read_from(aggregate_id, min_version).await
    }

    async fn append(&self, commit: Commit) -> Result<AppendOutcome> {
        (**self).append(commit).await
    }
}
