//! 冲突检测（ConflictDetector）
//!
//! 追加因版本不匹配失败后，根据“调用方观察到的版本之后已提交的事件”与
//! “本次尝试提交的事件”判断二者能否安全共存。纯函数，无副作用。
//!
use crate::persist::{Commit, SerializedEvent};
use std::collections::HashMap;
use std::sync::Arc;

pub trait ConflictDetector: Send + Sync {
    fn has_conflict(&self, committed_since: &[Commit], attempted: &[SerializedEvent]) -> bool;
}

/// 任意闭包都可作为冲突检测器
impl<F> ConflictDetector for F
where
    F: Fn(&[Commit], &[SerializedEvent]) -> bool + Send + Sync,
{
    fn has_conflict(&self, committed_since: &[Commit], attempted: &[SerializedEvent]) -> bool {
        self(committed_since, attempted)
    }
}

/// 默认策略：观察版本之后只要存在任何提交即视为冲突（与事件类型无关）
#[derive(Debug, Clone, Copy, Default)]
pub struct PessimisticConflictDetector;

impl ConflictDetector for PessimisticConflictDetector {
    fn has_conflict(&self, committed_since: &[Commit], _attempted: &[SerializedEvent]) -> bool {
        committed_since.iter().any(|c| !c.events().is_empty())
    }
}

type ConflictPredicate = Arc<dyn Fn(&SerializedEvent, &SerializedEvent) -> bool + Send + Sync>;

/// 按事件类型配对的冲突检测器
///
/// 领域代码为 (尝试提交的类型, 已提交的类型) 注册判定函数；
/// 任何未注册的配对都视为冲突。
#[derive(Clone, Default)]
pub struct EventTypeConflictDetector {
    predicates: HashMap<(String, String), ConflictPredicate>,
}

impl EventTypeConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册判定函数；返回 `true` 表示该配对冲突
    pub fn register<F>(
        mut self,
        attempted_type: impl Into<String>,
        committed_type: impl Into<String>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&SerializedEvent, &SerializedEvent) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(
            (attempted_type.into(), committed_type.into()),
            Arc::new(predicate),
        );
        self
    }

    /// 声明两种事件类型互不冲突
    pub fn allow(self, attempted_type: impl Into<String>, committed_type: impl Into<String>) -> Self {
        self.register(attempted_type, committed_type, |_, _| false)
    }

    fn pair_conflicts(&self, attempted: &SerializedEvent, committed: &SerializedEvent) -> bool {
        let key = (
            attempted.event_type().to_string(),
            committed.event_type().to_string(),
        );
        match self.predicates.get(&key) {
            Some(predicate) => predicate(attempted, committed),
            None => true,
        }
    }
}

impl ConflictDetector for EventTypeConflictDetector {
    fn has_conflict(&self, committed_since: &[Commit], attempted: &[SerializedEvent]) -> bool {
        committed_since
            .iter()
            .flat_map(Commit::events)
            .any(|committed| attempted.iter().any(|a| self.pair_conflicts(a, committed)))
    }
}

impl std::fmt::Debug for EventTypeConflictDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTypeConflictDetector")
            .field("pairs", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}
