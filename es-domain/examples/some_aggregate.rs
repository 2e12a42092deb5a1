/// SomeAggregate 示例
/// 演示事件溯源聚合的完整生命周期：创建、修改、并发冲突与未找到
use es_domain::aggregate::Aggregate;
use es_domain::aggregate_root::AggregateRoot;
use es_domain::domain_event::CommitHeaders;
use es_domain::entity::Entity;
use es_domain::error::{DomainError, DomainResult};
use es_domain::persist::{
    AggregateRepository, EventSourcedRepository, InMemoryCommitDispatcher, InMemoryEventStore,
};
use es_domain::value_object::{AggregateId, Version};
use es_macros::{domain_event, entity};
use futures_util::StreamExt;
use std::sync::Arc;

// ============================================================================
// 领域模型定义
// ============================================================================

#[entity(event = SomeEvent)]
#[derive(Clone)]
struct SomeAggregate {
    value: String,
}

#[domain_event(version = 1)]
enum SomeEvent {
    #[event(event_type = "some.created")]
    Created { value: String },
    #[event(event_type = "some.value_changed")]
    ValueChanged { new_value: String },
}

impl SomeAggregate {
    /// 领域构造：产生 Created 事件（与重建路径 `rehydrate` 区分）
    fn create(id: AggregateId, value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidCommand {
                reason: "value must not be empty".into(),
            });
        }
        let mut aggregate = Self::rehydrate(id, Version::new());
        aggregate.raise(SomeEvent::Created { value });
        Ok(aggregate)
    }

    fn change_value(&mut self, new_value: impl Into<String>) -> DomainResult<()> {
        if self.version().is_new() && !self.has_pending_events() {
            return Err(DomainError::InvalidState {
                reason: "aggregate has not been created".into(),
            });
        }
        self.raise(SomeEvent::ValueChanged {
            new_value: new_value.into(),
        });
        Ok(())
    }
}

impl Aggregate for SomeAggregate {
    const TYPE: &'static str = "some_aggregate";

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SomeEvent::Created { value } => self.value = value.clone(),
            SomeEvent::ValueChanged { new_value } => self.value = new_value.clone(),
        }
    }
}

// ============================================================================
// 演示
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dispatcher = Arc::new(InMemoryCommitDispatcher::new(16));
    let mut commits = dispatcher.subscribe();

    let repo = Arc::new(
        EventSourcedRepository::builder()
            .store(Arc::new(InMemoryEventStore::new()))
            .dispatcher(dispatcher.clone())
            .build(),
    );

    // 创建并保存
    let id = AggregateId::new();
    let mut created = SomeAggregate::create(id, "InitialValue")?;
    repo.save(&mut created, CommitHeaders::default()).await?;
    println!("created {id} at {}", created.version());

    // 加载、修改、保存
    let mut loaded: SomeAggregate = repo.get_by_id(&id).await?;
    loaded.change_value("SomeValue")?;
    repo.save(&mut loaded, CommitHeaders::default()).await?;
    let current: SomeAggregate = repo.get_by_id(&id).await?;
    println!("value={} version={}", current.value, current.version());

    // 两个会话并发修改：后保存者收到并发冲突
    let mut first: SomeAggregate = repo.get_by_id(&id).await?;
    let mut second: SomeAggregate = repo.get_by_id(&id).await?;
    first.change_value("first")?;
    second.change_value("second")?;
    repo.save(&mut first, CommitHeaders::default()).await?;
    match repo.save(&mut second, CommitHeaders::default()).await {
        Err(err @ DomainError::ConcurrencyConflict { .. }) => println!("second writer: {err}"),
        other => println!("unexpected: {other:?}"),
    }

    // 编排器：冲突时重新加载并重放业务逻辑
    let root = AggregateRoot::<SomeAggregate, _>::new(repo.clone());
    root.execute(
        &id,
        CommitHeaders::builder().actor_id("demo".to_string()).build(),
        |agg| agg.change_value("via root"),
    )
    .await?;

    // 未保存过的标识
    let missing = AggregateRepository::<SomeAggregate>::get_by_id(&repo, &AggregateId::new()).await;
    println!("missing: {:?}", missing.map(|a| a.value));

    for _ in 0..4 {
        if let Some(Ok(commit)) = commits.next().await {
            println!(
                "dispatched commit {} -> {}",
                commit.commit_id(),
                commit.version()
            );
        }
    }

    Ok(())
}
