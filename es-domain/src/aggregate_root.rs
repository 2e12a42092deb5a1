//! 聚合根编排器（AggregateRoot）
//!
//! 封装从“加载聚合 → 执行业务方法 → 持久化事件”的标准流程，
//! 以仓储实现（`AggregateRepository`）为依赖，便于在应用层直接调用。
//! 遇到并发冲突时重新加载并重放业务逻辑，直至成功或用尽尝试次数。
//!
use crate::{
    aggregate::Aggregate,
    domain_event::CommitHeaders,
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    persist::{AggregateRepository, Commit},
    value_object::{AggregateId, Version},
};
use std::marker::PhantomData;
use tracing::warn;

const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// 面向应用层的聚合根编排器。
///
/// - `A`：聚合类型（实现 `Aggregate`）
/// - `R`：聚合仓储（实现 `AggregateRepository<A>`）
pub struct AggregateRoot<A, R>
where
    A: Aggregate,
    R: AggregateRepository<A>,
{
    repo: R,
    max_attempts: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<A, R> AggregateRoot<A, R>
where
    A: Aggregate,
    R: AggregateRepository<A>,
{
    /// 创建编排器实例（默认最多尝试 3 次）
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            _marker: PhantomData,
        }
    }

    /// 设置遇到并发冲突时的最大尝试次数（至少 1 次）
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 执行业务操作：
    /// 1. 加载聚合；从未保存过的标识通过重建路径得到零状态实例；
    /// 2. 调用 `f` 执行业务方法（校验并 raise 事件）；
    /// 3. 保存，返回产生的提交（无事件时为 `None`）。
    ///
    /// `f` 可能因冲突重试而被多次调用，每次都作用于重新加载的聚合。
    pub async fn execute<F>(
        &self,
        aggregate_id: &AggregateId,
        headers: CommitHeaders,
        mut f: F,
    ) -> Result<Option<Commit>>
    where
        F: FnMut(&mut A) -> Result<()>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut aggregate = match self.repo.get_by_id(aggregate_id).await {
                Ok(aggregate) => aggregate,
                Err(DomainError::NotFound { .. }) => A::rehydrate(*aggregate_id, Version::new()),
                Err(err) => return Err(err),
            };

            f(&mut aggregate)?;

            match self.repo.save(&mut aggregate, headers.clone()).await {
                Err(err @ DomainError::ConcurrencyConflict { .. })
                    if attempt < self.max_attempts =>
                {
                    warn!(
                        aggregate_type = A::TYPE,
                        aggregate_id = %aggregate_id,
                        attempt,
                        error = %err,
                        "retrying after concurrency conflict"
                    );
                }
                other => return other,
            }
        }
    }
}
