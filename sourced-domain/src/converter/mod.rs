//! 多态序列化与形态迁移（converter）
//!
//! 三个协作部分：
//! - 类型注册表（`TypeRegistry`）：判别串 ↔ 类型信息，白名单构造后不可变；
//! - 迁移器（`RecordMigrator`）：声明 `(source, target)` 的单步纯转换；
//! - 转换器（`RecordConverter`）：编码校验、读取侧迁移链与环检测。
//!
mod migrator;
mod record_converter;
mod registry;

pub use migrator::RecordMigrator;
pub use record_converter::{RecordConverter, TYPE_FIELD};
pub use registry::{RecordPayload, RecordTypeInfo, TypeRegistry, TypeRegistryBuilder};
