//! 记录迁移器（Record Migrator）
//!
//! 每个迁移器声明一对 `(source, target)` 类型判别串和一个纯转换函数，
//! 读取路径按链逐步把旧形态升级到当前形态。多步演进由多个小迁移器
//! 组合表达，而不是一个大而全的转换。
//!
use std::sync::Arc;

use serde_json::Value;

use crate::error::RecordResult;

/// 单步记录形态迁移
pub trait RecordMigrator: Send + Sync {
    /// 源类型判别串
    fn source(&self) -> &'static str;

    /// 目标类型判别串；与 `source` 相同的迁移器在构造期被拒绝
    fn target(&self) -> &'static str;

    /// 纯转换：输入旧形态文档，输出目标形态文档。
    /// `Type` 字段由转换器统一盖章为 `target`，实现无需自行维护。
    fn convert(&self, doc: Value) -> RecordResult<Value>;
}

impl<T> RecordMigrator for Arc<T>
where
    T: RecordMigrator + ?Sized,
{
    fn source(&self) -> &'static str {
        (**self).source()
    }

    fn target(&self) -> &'static str {
        (**self).target()
    }

    fn convert(&self, doc: Value) -> RecordResult<Value> {
        (**self).convert(doc)
    }
}
