//! 事件溯源领域层基础库（es-domain）
//!
//! 提供事件溯源聚合的通用抽象与构件：
//! - 聚合（`aggregate`）与实体（`entity`）建模，状态仅由事件回放得出
//! - 领域事件（`domain_event`）、提交头与事件上抬（`event_upcaster`）
//! - 以提交为单位的事件流存储、乐观并发与冲突判定、快照与提交分发（`persist`）
//! - 值对象（`value_object`）：聚合标识与流版本号
//!
//! 本 crate 与具体存储与传输实现解耦，仅定义领域层接口与统一的错误类型；
//! `in-memory` 特性（默认开启）附带内存后端，便于测试与本地开发。
//!
//! 典型用法：
//! 1. 用 `#[entity]` / `#[domain_event]`（`es-macros`）定义聚合与事件，实现 `Aggregate::apply`；
//! 2. 业务方法校验状态后 `raise` 事件；
//! 3. 通过 `EventSourcedRepository` 加载与保存，或交由 `AggregateRoot` 编排并处理冲突重试。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod event_upcaster;
pub mod persist;
pub mod value_object;

// 允许在本 crate 内部通过 ::es_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::es_domain 路径。
extern crate self as es_domain;
