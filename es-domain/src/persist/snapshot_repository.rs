//! 快照仓储协议与策略
//!
//! 定义聚合快照读写接口与简单的落盘策略（按版本间隔）。快照只是回放加速器：
//! 读取失败或缺失时总可以退回到完整回放。
//!
use crate::{
    error::DomainResult as Result,
    persist::SerializedSnapshot,
    value_object::{AggregateId, Version},
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// 读取某聚合的最新快照
    async fn get_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<SerializedSnapshot>>;

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()>;
}

#[async_trait]
impl<T> SnapshotRepository for Arc<T>
where
    T: SnapshotRepository + ?Sized,
{
    async fn get_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<SerializedSnapshot>> {
        (**self).get_snapshot(aggregate_type, aggregate_id).await
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        (**self).save(snapshot).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    #[default]
    Never,
    Every(usize),
}

impl SnapshotPolicy {
    pub fn should_snapshot(&self, version: Version) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let interval = (*interval).max(1);
                !version.is_new() && version.value().is_multiple_of(interval)
            }
        }
    }

    /// 一次提交把版本从 `from` 推进到 `to` 时，是否越过了落盘点
    ///
    /// 多事件提交可能跨过间隔的整数倍而不恰好停在其上。
    pub fn crossed(&self, from: Version, to: Version) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let interval = (*interval).max(1);
                to > from && to.value() / interval > from.value() / interval
            }
        }
    }
}

/// SnapshotRepository 的装饰器，根据策略决定是否落盘快照
pub struct SnapshotRepositoryWithPolicy<R> {
    inner: R,
    policy: SnapshotPolicy,
}

impl<R> SnapshotRepositoryWithPolicy<R> {
    pub fn new(inner: R, policy: SnapshotPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }
}

impl<R> SnapshotRepositoryWithPolicy<R>
where
    R: SnapshotRepository,
{
    /// 仅当本次提交（`from` → 快照版本）越过策略落盘点时保存，返回是否保存
    pub async fn save_if_due(&self, from: Version, snapshot: SerializedSnapshot) -> Result<bool> {
        if !self.policy.crossed(from, snapshot.aggregate_version()) {
            return Ok(false);
        }

        self.inner.save(snapshot).await?;
        Ok(true)
    }
}

#[async_trait]
impl<R> SnapshotRepository for SnapshotRepositoryWithPolicy<R>
where
    R: SnapshotRepository,
{
    async fn get_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<SerializedSnapshot>> {
        self.inner.get_snapshot(aggregate_type, aggregate_id).await
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        if !self.policy.should_snapshot(snapshot.aggregate_version()) {
            return Ok(());
        }

        self.inner.save(snapshot).await
    }
}
