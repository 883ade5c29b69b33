//! 统一错误定义
//!
//! 按错误分类建模：校验（调用方可修正）、并发（调用方可重试）、
//! 后端（由存储实现定义）、配置（启动期致命），以及序列化相关错误。
//! Not-found 不是错误，统一以 `Ok(None)` 表达。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RecordError {
    // --- 校验：调用方可修正，核心不重试 ---
    #[error("record validation failed: {reason}")]
    Validation { reason: String },

    // --- 并发：同一标识槽位已被占用，调用方应重新重建后重试 ---
    #[error("concurrency conflict: aggregate_id={aggregate_id}, index={index}")]
    Concurrency { aggregate_id: String, index: u64 },

    // --- 后端：连接、配额等由存储实现上抛，核心仅透传 ---
    #[error("record store error: {reason}")]
    Backend { reason: String },

    // --- 配置：迁移环、自迁移、重复注册等，必须在构造期失败 ---
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 序列化/类型解析 ---
    #[error("record type not found: {name}")]
    TypeNotFound { name: String },
    #[error("record document is missing the `Type` discriminator")]
    MissingDiscriminator,
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// 统一 Result 类型别名
pub type RecordResult<T> = Result<T, RecordError>;

impl RecordError {
    /// 并发冲突可在重新重建聚合后重试，其余错误均不可重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecordError::Concurrency { .. })
    }
}
