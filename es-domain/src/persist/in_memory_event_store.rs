//! 内存版事件流存储（InMemoryEventStore）
//!
//! 基于 `DashMap` 的分片锁：同一聚合标识的 检查版本 → 追加 在条目锁内完成，
//! 保证每个版本只有一个追加能成功；不同标识之间互不阻塞。典型用途：测试、示例与本地开发。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    persist::{AppendOutcome, Commit, EventStore},
    value_object::{AggregateId, Version},
};
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: DashMap<AggregateId, Vec<Commit>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 流当前版本；未知标识为 0
    pub fn stream_version(&self, aggregate_id: &AggregateId) -> Version {
        self.streams
            .get(aggregate_id)
            .and_then(|commits| commits.last().map(Commit::version))
            .unwrap_or_default()
    }

    pub fn commit_count(&self, aggregate_id: &AggregateId) -> usize {
        self.streams
            .get(aggregate_id)
            .map(|commits| commits.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn read_from(
        &self,
        aggregate_id: &AggregateId,
        min_version: Version,
    ) -> Result<Vec<Commit>> {
        Ok(self
            .streams
            .get(aggregate_id)
            .map(|commits| {
                commits
                    .iter()
                    .filter(|c| c.version() > min_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append(&self, commit: Commit) -> Result<AppendOutcome> {
        if commit.events().is_empty() {
            return Err(DomainError::InvalidCommit {
                reason: format!("commit {} has no events", commit.commit_id()),
            });
        }

        let expected = commit.expected_version();
        let version = commit.version();

        // 被拒绝的追加不为未知标识创建空流
        let mut stream = match self.streams.entry(*commit.aggregate_id()) {
            Entry::Occupied(stream) => stream,
            Entry::Vacant(_) if !expected.is_new() => {
                return Err(DomainError::StreamGap {
                    aggregate_id: *commit.aggregate_id(),
                    expected,
                    actual: Version::new(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(vec![commit]);
                return Ok(AppendOutcome::Committed(version));
            }
        };

        let current = stream.get().last().map(Commit::version).unwrap_or_default();

        if expected < current {
            let since = stream
                .get()
                .iter()
                .filter(|c| c.version() > expected)
                .cloned()
                .collect();
            return Ok(AppendOutcome::Conflict(since));
        }

        if expected > current {
            return Err(DomainError::StreamGap {
                aggregate_id: *commit.aggregate_id(),
                expected,
                actual: current,
            });
        }

        stream.get_mut().push(commit);
        Ok(AppendOutcome::Committed(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::CommitHeaders;
    use crate::persist::SerializedEvent;
    use serde_json::json;
    use std::sync::Arc;

    fn commit(id: AggregateId, expected: usize, n: usize) -> Commit {
        let events = (0..n)
            .map(|i| {
                SerializedEvent::builder()
                    .event_type("Test.Happened")
                    .payload(json!({ "n": i }))
                    .build()
            })
            .collect();
        Commit::new(
            id,
            "test",
            Version::from_value(expected),
            events,
            CommitHeaders::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_stream_reads_empty() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        assert!(store.read_from(&id, Version::new()).await.unwrap().is_empty());
        assert_eq!(store.stream_version(&id), Version::new());
    }

    #[tokio::test]
    async fn append_advances_version_contiguously() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let out = store.append(commit(id, 0, 2)).await.unwrap();
        assert_eq!(out, AppendOutcome::Committed(Version::from_value(2)));
        let out = store.append(commit(id, 2, 1)).await.unwrap();
        assert_eq!(out, AppendOutcome::Committed(Version::from_value(3)));

        let commits = store.read_from(&id, Version::new()).await.unwrap();
        let ranges: Vec<(usize, usize)> = commits
            .iter()
            .map(|c| (c.expected_version().value(), c.version().value()))
            .collect();
        assert_eq!(ranges, vec![(0, 2), (2, 3)]);
        assert_eq!(store.commit_count(&id), 2);
    }

    #[tokio::test]
    async fn read_from_skips_commits_at_or_below_min_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(commit(id, 0, 2)).await.unwrap();
        store.append(commit(id, 2, 2)).await.unwrap();
        store.append(commit(id, 4, 1)).await.unwrap();

        let tail = store.read_from(&id, Version::from_value(2)).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].expected_version(), Version::from_value(2));

        // 跨越 min_version 的提交整体返回，由调用方跳过已覆盖的事件
        let straddling = store.read_from(&id, Version::from_value(3)).await.unwrap();
        assert_eq!(straddling.len(), 2);
        assert_eq!(straddling[0].expected_version(), Version::from_value(2));

        assert!(store.read_from(&id, Version::from_value(5)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_expected_version_returns_commits_since() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(commit(id, 0, 1)).await.unwrap();
        store.append(commit(id, 1, 1)).await.unwrap();
        store.append(commit(id, 2, 2)).await.unwrap();

        match store.append(commit(id, 1, 1)).await.unwrap() {
            AppendOutcome::Conflict(since) => {
                let starts: Vec<usize> =
                    since.iter().map(|c| c.expected_version().value()).collect();
                assert_eq!(starts, vec![1, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.stream_version(&id), Version::from_value(4));
    }

    #[tokio::test]
    async fn gap_is_rejected() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let err = store.append(commit(id, 3, 1)).await.unwrap_err();
        assert!(matches!(err, DomainError::StreamGap { .. }));
        assert_eq!(store.commit_count(&id), 0);
        assert!(!store.streams.contains_key(&id));

        // 已有流上的缺口同样被拒绝，流保持不变
        store.append(commit(id, 0, 1)).await.unwrap();
        let err = store.append(commit(id, 3, 1)).await.unwrap_err();
        assert!(matches!(err, DomainError::StreamGap { .. }));
        assert_eq!(store.stream_version(&id), Version::from_value(1));
    }

    #[tokio::test]
    async fn only_one_concurrent_append_per_version_wins() {
        let store = Arc::new(InMemoryEventStore::new());
        let id = AggregateId::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.append(commit(id, 0, 1)).await }));
        }

        let mut committed = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap().unwrap() {
                AppendOutcome::Committed(v) => {
                    assert_eq!(v, Version::from_value(1));
                    committed += 1;
                }
                AppendOutcome::Conflict(since) => {
                    assert_eq!(since.len(), 1);
                    conflicts += 1;
                }
            }
        }
        assert_eq!(committed, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.stream_version(&id), Version::from_value(1));
    }

    #[tokio::test]
    async fn streams_are_independent() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        store.append(commit(a, 0, 3)).await.unwrap();
        store.append(commit(b, 0, 1)).await.unwrap();
        assert_eq!(store.stream_version(&a), Version::from_value(3));
        assert_eq!(store.stream_version(&b), Version::from_value(1));
    }
}
