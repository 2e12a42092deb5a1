//! 聚合仓储（AggregateRepository）
//!
//! 基于事件流存储的通用聚合仓储：
//! - `get_by_id`：可选快照 → 工厂构造 → 读取尾部提交 → 上抬/解码 → 回放；
//! - `save`：把未提交事件作为一个提交追加；发生并发写入时交由冲突检测器判定，
//!   无冲突则在最新状态上重放待提交事件并重试一次，否则返回 `ConcurrencyConflict`。
//!
//! 仓储本身无状态，可被多个调用方并发共享；提交分发与快照属于旁路，
//! 失败只记录日志，不影响保存结果。
//!
use crate::{
    aggregate::Aggregate,
    domain_event::CommitHeaders,
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    event_upcaster::EventUpcasterChain,
    persist::{
        AggregateFactory, AppendOutcome, Commit, CommitDispatcher, ConflictDetector, EventStore,
        PessimisticConflictDetector, SerializedSnapshot, SnapshotRepository,
        SnapshotRepositoryWithPolicy, deserialize_events, serialize_events,
    },
    value_object::{AggregateId, Version},
};
use async_trait::async_trait;
use bon::Builder;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: Aggregate,
{
    /// 重建聚合；从未保存过的标识返回 `NotFound`
    async fn get_by_id(&self, aggregate_id: &AggregateId) -> Result<A>;

    /// 以一个原子提交持久化聚合的未提交事件
    ///
    /// 无未提交事件时返回 `Ok(None)` 且不访问存储。
    async fn save(&self, aggregate: &mut A, headers: CommitHeaders) -> Result<Option<Commit>>;
}

#[async_trait]
impl<A, T> AggregateRepository<A> for Arc<T>
where
    A: Aggregate,
    T: AggregateRepository<A> + ?Sized,
{
    async fn get_by_id(&self, aggregate_id: &AggregateId) -> Result<A> {
        (**self).get_by_id(aggregate_id).await
    }

    async fn save(&self, aggregate: &mut A, headers: CommitHeaders) -> Result<Option<Commit>> {
        (**self).save(aggregate, headers).await
    }
}

/// 仓储运行参数
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct RepositoryOptions {
    /// 单次 `read_from` / `append` 的最长等待时间；`None` 表示不限
    store_timeout: Option<Duration>,
}

impl RepositoryOptions {
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout
    }
}

/// 快照仓储（带落盘策略）的类型擦除形态
pub type PolicySnapshotRepository = SnapshotRepositoryWithPolicy<Arc<dyn SnapshotRepository>>;

/// 基于事件流存储（可选快照）的通用聚合仓储实现
///
/// ```ignore
/// let repo = EventSourcedRepository::builder()
///     .store(Arc::new(InMemoryEventStore::new()))
///     .build();
/// ```
#[derive(Builder)]
pub struct EventSourcedRepository {
    store: Arc<dyn EventStore>,
    #[builder(default)]
    factory: AggregateFactory,
    #[builder(default = Arc::new(PessimisticConflictDetector) as Arc<dyn ConflictDetector>)]
    detector: Arc<dyn ConflictDetector>,
    dispatcher: Option<Arc<dyn CommitDispatcher>>,
    snapshots: Option<PolicySnapshotRepository>,
    #[builder(default)]
    upcaster_chain: Arc<EventUpcasterChain>,
    #[builder(default)]
    options: RepositoryOptions,
}

impl EventSourcedRepository {
    pub fn options(&self) -> RepositoryOptions {
        self.options
    }

    /// 从快照（若有）与其后的提交重建聚合
    async fn rebuild<A>(&self, aggregate_id: &AggregateId) -> Result<A>
    where
        A: Aggregate,
    {
        let snapshot = self.load_snapshot::<A>(aggregate_id).await;
        let mut aggregate: A = match self.factory.build::<A>(aggregate_id, snapshot.as_ref()) {
            Ok(aggregate) => aggregate,
            Err(err @ DomainError::UnknownAggregateType { .. }) => return Err(err),
            Err(err) => {
                warn!(
                    aggregate_type = A::TYPE,
                    aggregate_id = %aggregate_id,
                    error = %err,
                    "unusable snapshot, falling back to full replay"
                );
                self.factory.build::<A>(aggregate_id, None)?
            }
        };

        let base = aggregate.version();
        let commits = self.read_from(aggregate_id, base).await?;

        if commits.is_empty() {
            if base.is_new() {
                return Err(DomainError::NotFound {
                    aggregate_type: A::TYPE.to_string(),
                    aggregate_id: *aggregate_id,
                });
            }
            debug!(aggregate_type = A::TYPE, aggregate_id = %aggregate_id, version = %base, "loaded from snapshot");
            return Ok(aggregate);
        }

        if let Some(foreign) = commits.iter().find(|c| c.aggregate_type() != A::TYPE) {
            return Err(DomainError::TypeMismatch {
                expected: A::TYPE.to_string(),
                found: foreign.aggregate_type().to_string(),
            });
        }

        // 快照可能落在某个多事件提交的中间，只回放快照之后的事件
        let tail = commits
            .iter()
            .flat_map(Commit::versioned_events)
            .filter(|(version, _)| *version > base)
            .map(|(_, event)| event.clone())
            .collect();
        let events = deserialize_events::<A>(&self.upcaster_chain, tail)?;

        aggregate.apply_history(&events);

        // 上抬可能拆分或丢弃事件，版本以流为准
        let head = commits.last().map(Commit::version).unwrap_or(base);
        aggregate.set_version(head);

        debug!(
            aggregate_type = A::TYPE,
            aggregate_id = %aggregate_id,
            from = %base,
            version = %head,
            commits = commits.len(),
            "aggregate rebuilt"
        );

        Ok(aggregate)
    }

    async fn load_snapshot<A>(&self, aggregate_id: &AggregateId) -> Option<SerializedSnapshot>
    where
        A: Aggregate,
    {
        let snapshots = self.snapshots.as_ref()?;
        match snapshots.get_snapshot(A::TYPE, aggregate_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(aggregate_type = A::TYPE, aggregate_id = %aggregate_id, error = %err, "snapshot read failed");
                None
            }
        }
    }

    async fn read_from(&self, aggregate_id: &AggregateId, min_version: Version) -> Result<Vec<Commit>> {
        self.with_timeout(
            "read_from",
            aggregate_id,
            self.store.read_from(aggregate_id, min_version),
        )
        .await
    }

    async fn append(&self, commit: Commit) -> Result<AppendOutcome> {
        let aggregate_id = *commit.aggregate_id();
        self.with_timeout("append", &aggregate_id, self.store.append(commit))
            .await
    }

    async fn with_timeout<T, F>(
        &self,
        operation: &'static str,
        aggregate_id: &AggregateId,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let Some(limit) = self.options.store_timeout else {
            return fut.await;
        };

        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, aggregate_id = %aggregate_id, ?limit, "event store call timed out");
                Err(DomainError::Timeout {
                    operation,
                    aggregate_id: *aggregate_id,
                })
            }
        }
    }

    /// 提交成功后的收尾：清空缓冲、推进版本、分发与快照
    async fn committed<A>(&self, aggregate: &mut A, commit: &Commit, version: Version)
    where
        A: Aggregate,
    {
        aggregate.clear_pending();
        aggregate.set_version(version);

        info!(
            aggregate_type = A::TYPE,
            aggregate_id = %commit.aggregate_id(),
            commit_id = %commit.commit_id(),
            version = %version,
            events = commit.events().len(),
            "commit appended"
        );

        if let Some(dispatcher) = &self.dispatcher
            && let Err(err) = dispatcher.dispatch(commit).await
        {
            warn!(commit_id = %commit.commit_id(), error = %err, "commit dispatch failed");
        }

        self.snapshot_if_due(aggregate, commit.expected_version())
            .await;
    }

    async fn snapshot_if_due<A>(&self, aggregate: &A, from: Version)
    where
        A: Aggregate,
    {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        if !snapshots.policy().crossed(from, aggregate.version()) {
            return;
        }

        let saved = match SerializedSnapshot::from_aggregate(aggregate) {
            Ok(snapshot) => snapshots.save_if_due(from, snapshot).await,
            Err(err) => Err(err),
        };
        match saved {
            Ok(_) => debug!(aggregate_type = A::TYPE, aggregate_id = %aggregate.id(), version = %aggregate.version(), "snapshot saved"),
            Err(err) => warn!(aggregate_type = A::TYPE, aggregate_id = %aggregate.id(), error = %err, "snapshot save failed"),
        }
    }
}

fn conflict(aggregate_id: AggregateId, expected: Version, since: &[Commit]) -> DomainError {
    DomainError::ConcurrencyConflict {
        aggregate_id,
        expected,
        actual: since.last().map(Commit::version).unwrap_or(expected),
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for EventSourcedRepository
where
    A: Aggregate,
{
    async fn get_by_id(&self, aggregate_id: &AggregateId) -> Result<A> {
        self.rebuild::<A>(aggregate_id).await
    }

    async fn save(&self, aggregate: &mut A, headers: CommitHeaders) -> Result<Option<Commit>> {
        if !aggregate.has_pending_events() {
            debug!(aggregate_type = A::TYPE, aggregate_id = %aggregate.id(), "nothing to save");
            return Ok(None);
        }

        let aggregate_id = *aggregate.id();
        let expected = aggregate.version();
        let events = serialize_events(aggregate.pending_events())?;
        let commit = Commit::new(aggregate_id, A::TYPE, expected, events, headers)?;

        let since = match self.append(commit.clone()).await? {
            AppendOutcome::Committed(version) => {
                self.committed(aggregate, &commit, version).await;
                return Ok(Some(commit));
            }
            AppendOutcome::Conflict(since) => since,
        };

        if self.detector.has_conflict(&since, commit.events()) {
            warn!(
                aggregate_type = A::TYPE,
                aggregate_id = %aggregate_id,
                expected = %expected,
                intervening = since.len(),
                "concurrency conflict"
            );
            return Err(conflict(aggregate_id, expected, &since));
        }

        // 无冲突：在最新状态上重放待提交事件，并以推进后的版本重试一次。
        // 重试只能越过检测器已判定的提交，重建时若流已继续前进则视为冲突
        let cleared = since.last().map(Commit::version).unwrap_or(expected);
        let mut rebased = self.rebuild::<A>(&aggregate_id).await?;
        if rebased.version() != cleared {
            warn!(
                aggregate_type = A::TYPE,
                aggregate_id = %aggregate_id,
                cleared = %cleared,
                actual = %rebased.version(),
                "stream advanced past the checked commits"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: cleared,
                actual: rebased.version(),
            });
        }
        for event in aggregate.pending_events() {
            rebased.raise(event.clone());
        }
        let retry = commit.rebased(cleared);

        debug!(
            aggregate_type = A::TYPE,
            aggregate_id = %aggregate_id,
            from = %expected,
            to = %retry.expected_version(),
            "no conflict with intervening commits, retrying append"
        );

        match self.append(retry.clone()).await? {
            AppendOutcome::Committed(version) => {
                self.committed(&mut rebased, &retry, version).await;
                *aggregate = rebased;
                Ok(Some(retry))
            }
            AppendOutcome::Conflict(since) => {
                warn!(
                    aggregate_type = A::TYPE,
                    aggregate_id = %aggregate_id,
                    expected = %retry.expected_version(),
                    "concurrency conflict on retry"
                );
                Err(conflict(aggregate_id, retry.expected_version(), &since))
            }
        }
    }
}
