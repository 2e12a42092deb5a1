//! 领域事件（Domain Event）与提交头
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`），以及随提交一同持久化的
//! 业务上下文 `CommitHeaders`。

mod commit_headers;
mod domain_event_trait;

pub use commit_headers::CommitHeaders;
pub use domain_event_trait::DomainEvent;
