use anyhow::Result as AnyResult;
use es_domain::aggregate::Aggregate;
use es_domain::domain_event::CommitHeaders;
use es_domain::entity::Entity;
use es_domain::error::{DomainError, DomainResult};
use es_domain::persist::{AggregateRepository, EventSourcedRepository, InMemoryEventStore};
use es_domain::value_object::{AggregateId, Version};
use es_macros::{domain_event, entity};
use std::sync::Arc;

#[entity(event = SomeEvent)]
#[derive(Clone)]
struct SomeAggregate {
    value: String,
}

#[domain_event(version = 1)]
enum SomeEvent {
    Created { value: String },
    ValueChanged { new_value: String },
}

impl SomeAggregate {
    fn create(id: AggregateId, value: &str) -> Self {
        let mut agg = Self::rehydrate(id, Version::new());
        agg.raise(SomeEvent::Created {
            value: value.to_string(),
        });
        agg
    }

    fn change_value(&mut self, new_value: &str) -> DomainResult<()> {
        if new_value.is_empty() {
            return Err(DomainError::InvalidCommand {
                reason: "empty value".into(),
            });
        }
        self.raise(SomeEvent::ValueChanged {
            new_value: new_value.to_string(),
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

fn repository() -> (Arc<InMemoryEventStore>, EventSourcedRepository) {
    let store = Arc::new(InMemoryEventStore::new());
    let repo = EventSourcedRepository::builder()
        .store(store.clone())
        .build();
    (store, repo)
}

#[tokio::test]
async fn create_save_and_load() -> AnyResult<()> {
    let (store, repo) = repository();
    let id = AggregateId::new();

    let mut agg = SomeAggregate::create(id, "InitialValue");
    let commit = repo
        .save(&mut agg, CommitHeaders::default())
        .await?
        .expect("commit");

    assert_eq!(agg.version(), Version::from_value(1));
    assert!(agg.pending_events().is_empty());
    assert_eq!(commit.expected_version(), Version::new());
    assert_eq!(commit.version(), Version::from_value(1));
    assert_eq!(commit.events().len(), 1);
    assert_eq!(store.stream_version(&id), Version::from_value(1));

    let loaded: SomeAggregate = repo.get_by_id(&id).await?;
    assert_eq!(loaded.value, "InitialValue");
    assert_eq!(loaded.version(), Version::from_value(1));
    assert!(loaded.pending_events().is_empty());
    Ok(())
}

#[tokio::test]
async fn load_change_and_save() -> AnyResult<()> {
    let (_store, repo) = repository();
    let id = AggregateId::new();
    repo.save(&mut SomeAggregate::create(id, "InitialValue"), CommitHeaders::default())
        .await?;

    let mut agg: SomeAggregate = repo.get_by_id(&id).await?;
    agg.change_value("SomeValue")?;
    assert_eq!(agg.value, "SomeValue");
    assert_eq!(agg.version(), Version::from_value(1));

    repo.save(&mut agg, CommitHeaders::default()).await?;
    assert_eq!(agg.version(), Version::from_value(2));

    let loaded: SomeAggregate = repo.get_by_id(&id).await?;
    assert_eq!(loaded.value, "SomeValue");
    assert_eq!(loaded.version(), Version::from_value(2));
    Ok(())
}

#[tokio::test]
async fn concurrent_sessions_second_writer_conflicts() -> AnyResult<()> {
    let (store, repo) = repository();
    let id = AggregateId::new();
    repo.save(&mut SomeAggregate::create(id, "InitialValue"), CommitHeaders::default())
        .await?;

    let mut a1: SomeAggregate = repo.get_by_id(&id).await?;
    let mut a2: SomeAggregate = repo.get_by_id(&id).await?;

    a1.change_value("from a1")?;
    repo.save(&mut a1, CommitHeaders::default()).await?;
    assert_eq!(a1.version(), Version::from_value(2));

    a2.change_value("from a2")?;
    let err = repo
        .save(&mut a2, CommitHeaders::default())
        .await
        .unwrap_err();
    match err {
        DomainError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        } => {
            assert_eq!(aggregate_id, id);
            assert_eq!(expected, Version::from_value(1));
            assert_eq!(actual, Version::from_value(2));
        }
        other => panic!("unexpected {other:?}"),
    }

    // 冲突后未提交事件保持原样，存储未被改动
    assert_eq!(a2.pending_events().len(), 1);
    assert_eq!(a2.version(), Version::from_value(1));
    assert_eq!(store.stream_version(&id), Version::from_value(2));

    let loaded: SomeAggregate = repo.get_by_id(&id).await?;
    assert_eq!(loaded.value, "from a1");
    Ok(())
}

#[tokio::test]
async fn unknown_identity_is_not_found() {
    let (_store, repo) = repository();
    let id = AggregateId::new();

    let err = AggregateRepository::<SomeAggregate>::get_by_id(&repo, &id)
        .await
        .unwrap_err();
    match err {
        DomainError::NotFound {
            aggregate_type,
            aggregate_id,
        } => {
            assert_eq!(aggregate_type, "some_aggregate");
            assert_eq!(aggregate_id, id);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn save_without_pending_events_is_noop() -> AnyResult<()> {
    let (store, repo) = repository();
    let id = AggregateId::new();
    repo.save(&mut SomeAggregate::create(id, "v"), CommitHeaders::default())
        .await?;

    let mut agg: SomeAggregate = repo.get_by_id(&id).await?;
    let outcome = repo.save(&mut agg, CommitHeaders::default()).await?;

    assert!(outcome.is_none());
    assert_eq!(agg.version(), Version::from_value(1));
    assert_eq!(store.commit_count(&id), 1);

    // 从未保存过的空聚合同样不会写入
    let mut fresh = SomeAggregate::rehydrate(AggregateId::new(), Version::new());
    assert!(repo.save(&mut fresh, CommitHeaders::default()).await?.is_none());
    assert_eq!(store.commit_count(fresh.id()), 0);
    Ok(())
}

#[tokio::test]
async fn multi_event_commit_round_trips() -> AnyResult<()> {
    let (store, repo) = repository();
    let id = AggregateId::new();

    let mut agg = SomeAggregate::create(id, "a");
    agg.change_value("b")?;
    agg.change_value("c")?;
    let headers = CommitHeaders::builder()
        .correlation_id("cor-1".to_string())
        .actor_type("user".to_string())
        .actor_id("u-1".to_string())
        .build();

    let commit = repo.save(&mut agg, headers.clone()).await?.expect("commit");
    assert_eq!(commit.events().len(), 3);
    assert_eq!(commit.headers(), &headers);
    assert_eq!(commit.aggregate_type(), "some_aggregate");
    assert_eq!(agg.version(), Version::from_value(3));
    assert_eq!(store.commit_count(&id), 1);

    let loaded: SomeAggregate = repo.get_by_id(&id).await?;
    assert_eq!(loaded.value, agg.value);
    assert_eq!(loaded.version(), agg.version());
    assert_eq!(
        serde_json::to_value(&loaded)?,
        serde_json::to_value(&agg)?
    );
    Ok(())
}

#[tokio::test]
async fn versions_increase_by_event_count() -> AnyResult<()> {
    let (store, repo) = repository();
    let id = AggregateId::new();
    repo.save(&mut SomeAggregate::create(id, "0"), CommitHeaders::default())
        .await?;

    let mut expected = 1;
    for batch in 1..=4 {
        let mut agg: SomeAggregate = repo.get_by_id(&id).await?;
        let before = agg.version();
        for i in 0..batch {
            agg.change_value(&format!("{batch}-{i}"))?;
        }
        let commit = repo
            .save(&mut agg, CommitHeaders::default())
            .await?
            .expect("commit");

        expected += batch;
        assert_eq!(commit.expected_version(), before);
        assert_eq!(agg.version(), Version::from_value(expected));
        assert!(agg.version() > before);
    }

    assert_eq!(store.stream_version(&id), Version::from_value(expected));
    assert_eq!(store.commit_count(&id), 5);
    Ok(())
}

#[tokio::test]
async fn business_rule_failure_leaves_store_untouched() -> AnyResult<()> {
    let (store, repo) = repository();
    let id = AggregateId::new();
    repo.save(&mut SomeAggregate::create(id, "v"), CommitHeaders::default())
        .await?;

    let mut agg: SomeAggregate = repo.get_by_id(&id).await?;
    let err = agg.change_value("").unwrap_err();
    assert!(matches!(err, DomainError::InvalidCommand { .. }));
    assert!(repo.save(&mut agg, CommitHeaders::default()).await?.is_none());
    assert_eq!(store.stream_version(&id), Version::from_value(1));
    Ok(())
}

#[tokio::test]
async fn racing_writers_exactly_one_wins_per_version() -> AnyResult<()> {
    let (store, repo) = repository();
    let repo = Arc::new(repo);
    let id = AggregateId::new();
    repo.save(&mut SomeAggregate::create(id, "start"), CommitHeaders::default())
        .await?;

    let mut handles = Vec::new();
    for n in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let mut agg: SomeAggregate = repo.get_by_id(&id).await?;
            agg.change_value(&format!("writer-{n}"))?;
            repo.save(&mut agg, CommitHeaders::default()).await
        }));
    }

    let mut committed = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(Some(_)) => committed += 1,
            Err(DomainError::ConcurrencyConflict { .. }) => conflicts += 1,
            other => panic!("unexpected {other:?}"),
        }
    }

    assert!(committed >= 1);
    assert_eq!(committed + conflicts, 8);
    assert_eq!(
        store.stream_version(&id),
        Version::from_value(1 + committed)
    );
    Ok(())
}
