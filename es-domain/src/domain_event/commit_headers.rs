use bon::Builder;
use serde::{Deserialize, Serialize};

/// 提交头：随一次保存（一个 Commit）原样持久化的业务上下文
#[derive(Builder, Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitHeaders {
    /// 关联ID
    correlation_id: Option<String>,
    /// 因果ID
    causation_id: Option<String>,
    /// 触发提交的主体类型（如用户、系统等）
    actor_type: Option<String>,
    /// 触发提交的主体ID
    actor_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    extensions: Option<serde_json::Value>,
}

impl CommitHeaders {
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_type(&self) -> Option<&str> {
        self.actor_type.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn extensions(&self) -> Option<&serde_json::Value> {
        self.extensions.as_ref()
    }
}
