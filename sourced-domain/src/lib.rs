//! 事件溯源持久化核心（sourced-domain）
//!
//! 定义应用状态事实（事件）、时点摘要（快照）与派生读模型（投影）
//! 如何被校验、追加、版本化与重建，并对可插拔的存储后端约束其
//! 必须保持的语义：
//! - 记录模型（`record`）：共享信封与按种类的记录结构；
//! - 校验（`validator`）：记录、归属与批次一致性的纯校验；
//! - 聚合（`aggregate`）：未提交事件缓冲、版本不变式与重建；
//! - 转换器（`converter`）：以 `Type` 判别的多态编解码与迁移链;
//! - 持久化协议（`persist`）：乐观并发追加、穷尽删除与分区事务；
//! - 投影（`projection`）：工厂派生与基于内容哈希的新鲜度。
//!
//! 本 crate 不含任何具体存储实现；后端通过 `persist::RecordBackend`
//! 注入。聚合根是单写者值对象，跨写者的并发安全完全由后端在
//! `(partition_id, aggregate_id, index)` 上的唯一约束保证。
//!
pub mod aggregate;
pub mod converter;
pub mod error;
pub mod persist;
pub mod projection;
pub mod record;
pub mod validator;
