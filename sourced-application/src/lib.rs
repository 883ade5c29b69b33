//! 应用编排层（sourced-application）
//!
//! 在 `sourced-domain` 的持久化协议之上提供面向调用方的服务：
//! - `AggregateService`：重建 → 变更 → 持久化的标准循环，
//!   含快照间隔落盘与可选的投影随写维护；
//! - `ProjectionUpdateService`：按工厂重算陈旧投影。
//!
pub mod aggregate_service;
pub mod error;
pub mod projection_service;

pub use aggregate_service::AggregateService;
pub use error::{AppError, AppResult};
pub use projection_service::ProjectionUpdateService;
