//! 持久化协议（persist）
//!
//! 定义记录的存储形态、后端契约与写入/读取协议：
//! - 存储形态（`SerializedEvent`/`SerializedSnapshot`/`SerializedProjection`）
//!   与经由转换器的批量编解码；
//! - 后端契约（`RecordBackend`）：原子追加、范围读取、有界删除轮次、
//!   事务提交；
//! - 协议层（`RecordStore`）：追加前整批校验、穷尽删除、
//!   分区作用域事务（`RecordTransaction`）。
//!
//! 具体存储后端由上层提供实现并注入，核心只约束语义。
//!
mod backend;
mod record_store;
mod serialized_event;
mod serialized_projection;
mod serialized_snapshot;
mod transaction;

pub use backend::{DeleteRound, RecordBackend, RecordWrite};
pub use record_store::RecordStore;
pub use serialized_event::{SerializedEvent, deserialize_events, serialize_events};
pub use serialized_projection::SerializedProjection;
pub use serialized_snapshot::SerializedSnapshot;
pub use transaction::RecordTransaction;
