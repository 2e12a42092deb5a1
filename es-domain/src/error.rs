//! 领域层统一错误定义
//!
//! 覆盖聚合仓储的完整错误分类：未找到、并发冲突、未处理事件类型、未知聚合类型、
//! 超时与存储后端故障，以及序列化/上抬与领域规则校验，便于各实现层统一转换为 `DomainError`。
//!
use crate::value_object::{AggregateId, Version};
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 仓储/聚合重建 ---
    #[error("aggregate not found: type={aggregate_type}, id={aggregate_id}")]
    NotFound {
        aggregate_type: String,
        aggregate_id: AggregateId,
    },
    #[error("concurrency conflict: id={aggregate_id}, expected={expected}, actual={actual}")]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },
    #[error("unhandled event type: aggregate={aggregate_type}, event_type={event_type}")]
    UnhandledEventType {
        aggregate_type: String,
        event_type: String,
    },
    #[error("unknown aggregate type: {aggregate_type}")]
    UnknownAggregateType { aggregate_type: String },

    // --- 事件存储 ---
    #[error("invalid commit: {reason}")]
    InvalidCommit { reason: String },
    #[error("stream gap: id={aggregate_id}, expected={expected}, actual={actual}")]
    StreamGap {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },
    #[error("{operation} timed out: id={aggregate_id}")]
    Timeout {
        operation: &'static str,
        aggregate_id: AggregateId,
    },
    #[error("event store error: {reason}")]
    EventStore { reason: String },
    #[error("snapshot repository error: {reason}")]
    SnapshotRepository { reason: String },
    #[error("commit dispatch error: {reason}")]
    Dispatch { reason: String },

    // --- 序列化/事件上抬 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error(
        "upcast failed: type={event_type}, from_version={from_version}, stage={stage:?}, reason={reason}"
    )]
    UpcastFailed {
        event_type: String,
        from_version: usize,
        stage: Option<&'static str>,
        reason: String,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 领域规则/命令与状态 ---
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
}

impl DomainError {
    /// 是否可以从头重试整个 加载 → 业务逻辑 → 保存 流程
    ///
    /// 并发冲突需要调用方重新加载后重放业务逻辑；超时与存储故障因提交是全有或全无，
    /// 同样可以安全地重试。其余错误属于数据/代码不匹配或调用方错误，不应重试。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::ConcurrencyConflict { .. }
                | DomainError::Timeout { .. }
                | DomainError::EventStore { .. }
        )
    }

    pub fn event_store(reason: impl Into<String>) -> Self {
        DomainError::EventStore {
            reason: reason.into(),
        }
    }

    pub fn snapshot_repository(reason: impl Into<String>) -> Self {
        DomainError::SnapshotRepository {
            reason: reason.into(),
        }
    }

    pub fn dispatch(reason: impl Into<String>) -> Self {
        DomainError::Dispatch {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

impl From<uuid::Error> for DomainError {
    fn from(err: uuid::Error) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}
