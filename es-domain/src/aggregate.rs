//! 聚合（Aggregate）抽象
//!
//! 聚合状态是其事件按顺序应用的纯函数：
//! - `apply` 将单个事件投影到状态（唯一的状态变更路径）；
//! - `raise` 记录新事件并立即应用，使同一会话中的后续业务逻辑可见；
//! - `apply_history` 回放已提交事件，每个事件使版本加一。
//!
use crate::entity::Entity;
use serde::{Serialize, de::DeserializeOwned};

/// 聚合根接口
pub trait Aggregate: Entity + Serialize + DeserializeOwned {
    /// 聚合类型名（用于存储、快照与工厂注册）
    const TYPE: &'static str;

    /// 应用事件，更新聚合状态
    ///
    /// 实现中对事件枚举显式 `match`；不得校验业务规则，也不得失败。
    fn apply(&mut self, event: &Self::Event);

    /// 记录一个新事件：立即应用到本地状态并追加到未提交缓冲，持久化版本不变
    fn raise(&mut self, event: Self::Event) {
        self.apply(&event);
        self.uncommitted_mut().push(event);
    }

    /// 按顺序回放已提交的事件，每个事件使版本加一
    fn apply_history<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
            let next = self.version().next();
            self.set_version(next);
        }
    }

    /// 自上次重建/保存以来产生的事件
    fn pending_events(&self) -> &[Self::Event] {
        self.uncommitted()
    }

    fn has_pending_events(&self) -> bool {
        !self.uncommitted().is_empty()
    }

    fn clear_pending(&mut self) {
        self.uncommitted_mut().clear();
    }
}
