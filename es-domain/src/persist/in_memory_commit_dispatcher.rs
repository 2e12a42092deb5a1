//! 内存版提交分发器（InMemoryCommitDispatcher）
//!
//! 基于 `tokio::sync::broadcast` 实现：
//! - `dispatch`：克隆并广播提交；
//! - `subscribe`：返回 `'static` 生命周期的提交流，便于在 `tokio::spawn` 中使用。
//!
//! 注意：无订阅者时广播被忽略；订阅者落后超过缓冲容量时收到 `Dispatch` 错误。

use crate::error::{DomainError, DomainResult as Result};
use crate::persist::{Commit, CommitDispatcher};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone)]
pub struct InMemoryCommitDispatcher {
    tx: broadcast::Sender<Commit>,
}

impl InMemoryCommitDispatcher {
    /// `capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> BoxStream<'static, Result<Commit>> {
        let rx = self.tx.subscribe();
        let stream =
            BroadcastStream::new(rx).map(|r| r.map_err(|e| DomainError::dispatch(e.to_string())));
        Box::pin(stream)
    }
}

#[async_trait]
impl CommitDispatcher for InMemoryCommitDispatcher {
    async fn dispatch(&self, commit: &Commit) -> Result<()> {
        // 无订阅者时 send 返回错误，视为非致命
        let _ = self.tx.send(commit.clone());
        Ok(())
    }
}
