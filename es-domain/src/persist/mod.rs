//! 持久化与事件溯源（persist）
//!
//! 定义事件流存储、快照仓储、提交分发及其通用组合实现，支持：
//! - 以提交（`Commit`）为单位的只追加事件流与乐观并发（`EventStore`/`AppendOutcome`）；
//! - 事件序列化、上抬（Upcast）与反序列化（`serialize_events`/`deserialize_events`）；
//! - 冲突判定（`ConflictDetector`）与聚合构造（`AggregateFactory`）；
//! - 快照读写与策略（`SnapshotRepository`/`SnapshotPolicy`）；
//! - 通用聚合仓储实现（`EventSourcedRepository`）。
//!
//! 该模块聚焦协议与装配逻辑；`in-memory` 特性提供内存后端，
//! 其他存储后端由上层实现 `EventStore` 并注入。
//!
mod aggregate_factory;
mod aggregate_repository;
mod commit;
mod commit_dispatcher;
mod conflict_detector;
mod event_store;
mod serialized_event;
mod serialized_snapshot;
mod snapshot_repository;

#[cfg(feature = "in-memory")]
mod in_memory_commit_dispatcher;
#[cfg(feature = "in-memory")]
mod in_memory_event_store;
#[cfg(feature = "in-memory")]
mod in_memory_snapshot_repository;

pub use aggregate_factory::{AggregateFactory, AggregateFactoryBuilder};
pub use aggregate_repository::{
    AggregateRepository, EventSourcedRepository, PolicySnapshotRepository, RepositoryOptions,
};
pub use commit::Commit;
pub use commit_dispatcher::CommitDispatcher;
pub use conflict_detector::{
    ConflictDetector, EventTypeConflictDetector, PessimisticConflictDetector,
};
pub use event_store::{AppendOutcome, EventStore};
pub use serialized_event::{SerializedEvent, deserialize_events, serialize_events};
pub use serialized_snapshot::SerializedSnapshot;
pub use snapshot_repository::{SnapshotPolicy, SnapshotRepository, SnapshotRepositoryWithPolicy};

#[cfg(feature = "in-memory")]
pub use in_memory_commit_dispatcher::InMemoryCommitDispatcher;
#[cfg(feature = "in-memory")]
pub use in_memory_event_store::InMemoryEventStore;
#[cfg(feature = "in-memory")]
pub use in_memory_snapshot_repository::InMemorySnapshotRepository;
