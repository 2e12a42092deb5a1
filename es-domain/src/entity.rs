//! 实体（Entity）基础抽象
//!
//! 为聚合提供统一的标识、持久化版本与未提交事件缓冲；通常由 `#[entity(event = ...)]`
//! 宏生成实现。
//!
use crate::domain_event::DomainEvent;
use crate::value_object::{AggregateId, Version};

/// 具备唯一标识、版本与未提交事件缓冲的实体
pub trait Entity: Send + Sync {
    /// 该实体产生的领域事件类型
    type Event: DomainEvent;

    /// 重建路径：构造给定标识与版本的零状态实例
    ///
    /// 不执行任何业务校验，也不产生事件；与面向领域的创建方法相互独立，
    /// 仅供工厂在回放前使用。
    fn rehydrate(id: AggregateId, version: Version) -> Self;

    fn id(&self) -> &AggregateId;

    /// 已持久化的版本（不含未提交事件）
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn uncommitted(&self) -> &[Self::Event];

    fn uncommitted_mut(&mut self) -> &mut Vec<Self::Event>;
}
