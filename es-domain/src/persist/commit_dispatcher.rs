//! 提交分发（CommitDispatcher）协议
//!
//! 保存成功后将新提交通知下游订阅者。分发发生在提交已持久化之后，
//! 失败不会回滚提交：仓储只记录告警，由分发实现自行保证至少一次投递。
//!
use crate::{error::DomainResult as Result, persist::Commit};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CommitDispatcher: Send + Sync {
    async fn dispatch(&self, commit: &Commit) -> Result<()>;
}

#[async_trait]
impl<T> CommitDispatcher for Arc<T>
where
    T: CommitDispatcher + ?Sized,
{
    async fn dispatch(&self, commit: &Commit) -> Result<()> {
        (**self).dispatch(commit).await
    }
}
