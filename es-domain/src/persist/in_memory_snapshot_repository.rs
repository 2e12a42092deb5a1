use crate::{
    error::DomainResult as Result,
    persist::{SerializedSnapshot, SnapshotRepository},
    value_object::AggregateId,
};
use async_trait::async_trait;
use dashmap::DashMap;

/// 内存版快照仓储：每个 (聚合类型, 标识) 仅保留版本最高的一份快照
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    snapshots: DashMap<(String, AggregateId), SerializedSnapshot>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn get_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<SerializedSnapshot>> {
        Ok(self
            .snapshots
            .get(&(aggregate_type.to_string(), *aggregate_id))
            .map(|s| s.clone()))
    }

    async fn save(&self, snapshot: SerializedSnapshot) -> Result<()> {
        let key = (snapshot.aggregate_type().to_string(), *snapshot.aggregate_id());
        let mut slot = self.snapshots.entry(key).or_insert_with(|| snapshot.clone());
        if snapshot.aggregate_version() >= slot.aggregate_version() {
            *slot = snapshot;
        }
        Ok(())
    }
}
