use sourced_domain::error::RecordError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] RecordError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("projection factory not found: {0}")]
    FactoryNotFound(String),
}

impl AppError {
    /// 是否为可重试的并发冲突（重新重建聚合后重试变更）
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, AppError::Domain(RecordError::Concurrency { .. }))
    }
}

pub type AppResult<T> = Result<T, AppError>;
