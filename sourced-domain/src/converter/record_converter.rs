//! 记录转换器（Record Converter）
//!
//! 以 `Type` 判别字段为中心的多态编解码：
//! - 写入：序列化为自描述文档并校验必填字段非空；
//! - 读取：按判别串沿迁移链升级到当前形态，再校验、反序列化。
//!
//! 迁移器集合在构造期完成自迁移、重复源与环检测，
//! 环链绝不允许进入运行期（读取时会无限循环）。
//!
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::converter::migrator::RecordMigrator;
use crate::converter::registry::{RecordPayload, RecordTypeInfo, TypeRegistry};
use crate::error::{RecordError, RecordResult};

/// 线上文档中判别字段的字面名称
pub const TYPE_FIELD: &str = "Type";

/// 多态编解码 + 迁移链。构造后不可变。
pub struct RecordConverter {
    registry: TypeRegistry,
    migrators: HashMap<&'static str, Arc<dyn RecordMigrator>>,
}

impl std::fmt::Debug for RecordConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordConverter")
            .field("registry", &self.registry)
            .field(
                "migrators",
                &self.migrators.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RecordConverter {
    /// 构造转换器。以下配置错误立即失败，绝不推迟到首次使用：
    /// - 自迁移（`source == target`）；
    /// - 同一源类型注册多个迁移器（链式推进会产生歧义）；
    /// - 迁移链成环。
    pub fn new(
        registry: TypeRegistry,
        migrators: Vec<Arc<dyn RecordMigrator>>,
    ) -> RecordResult<Self> {
        let mut by_source: HashMap<&'static str, Arc<dyn RecordMigrator>> = HashMap::new();

        for migrator in migrators {
            if migrator.source() == migrator.target() {
                return Err(RecordError::Configuration {
                    reason: format!(
                        "self-migration is not allowed: `{}`",
                        migrator.source()
                    ),
                });
            }
            let source = migrator.source();
            if by_source.insert(source, migrator).is_some() {
                return Err(RecordError::Configuration {
                    reason: format!("duplicate migrator source: `{source}`"),
                });
            }
        }

        detect_cycles(&by_source)?;

        Ok(Self {
            registry,
            migrators: by_source,
        })
    }

    /// 无迁移器的转换器
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            registry,
            migrators: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// 编码：序列化载荷为携带 `Type` 的自描述文档并校验必填字段。
    /// 未注册的类型在写入侧同样以 `TypeNotFound` 失败。
    pub fn encode<P>(&self, payload: &P) -> RecordResult<Value>
    where
        P: RecordPayload,
    {
        let doc = serde_json::to_value(payload)?;
        let info = self.registry.resolve(payload.record_type())?;
        validate_required(info, &doc)?;

        Ok(doc)
    }

    /// 读取侧迁移：取判别串、沿链升级直到没有迁移器适用，
    /// 然后按最终类型校验必填字段。返回升级后的文档。
    pub fn migrate(&self, mut doc: Value) -> RecordResult<Value> {
        let mut name = discriminator(&doc)?.to_string();

        while let Some(migrator) = self.migrators.get(name.as_str()) {
            doc = migrator.convert(doc)?;
            name = migrator.target().to_string();
            stamp_type(&mut doc, &name)?;
        }

        let info = self.registry.resolve(&name)?;
        validate_required(info, &doc)?;

        Ok(doc)
    }

    /// 解码：迁移 + 反序列化为当前形态的载荷
    pub fn decode<P>(&self, doc: Value) -> RecordResult<P>
    where
        P: RecordPayload,
    {
        let doc = self.migrate(doc)?;
        Ok(serde_json::from_value(doc)?)
    }
}

/// 读取文档的判别串；缺失属于格式错误而非校验错误
fn discriminator(doc: &Value) -> RecordResult<&str> {
    doc.get(TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingDiscriminator)
}

fn stamp_type(doc: &mut Value, name: &str) -> RecordResult<()> {
    match doc {
        Value::Object(map) => {
            map.insert(TYPE_FIELD.to_string(), Value::String(name.to_string()));
            Ok(())
        }
        _ => Err(RecordError::Validation {
            reason: "migrated record document must be a JSON object".to_string(),
        }),
    }
}

/// 必填字段校验：缺失与显式 null 同等对待，
/// 所有违规字段聚合进一条消息而不是逐个抛出。
fn validate_required(info: &RecordTypeInfo, doc: &Value) -> RecordResult<()> {
    let mut offending = Vec::new();

    for field in info.required {
        let present = doc.get(*field).map(|v| !v.is_null()).unwrap_or(false);
        if !present {
            offending.push(format!("{}.{}", info.name, field));
        }
    }

    if offending.is_empty() {
        return Ok(());
    }

    Err(RecordError::Validation {
        reason: format!("missing or null required fields: {}", offending.join(", ")),
    })
}

/// 迁移链环检测：每个源类型至多一个迁移器，链为函数式结构，
/// 从每个未访问的源出发沿 `target` 前进，命中本轮路径中
/// 已出现的类型即为环，按顺序报告环上的类型名。
fn detect_cycles(
    migrators: &HashMap<&'static str, Arc<dyn RecordMigrator>>,
) -> RecordResult<()> {
    let mut done: HashSet<&'static str> = HashSet::new();

    for start in migrators.keys() {
        if done.contains(start) {
            continue;
        }

        let mut path: Vec<&'static str> = Vec::new();
        let mut on_path: HashSet<&'static str> = HashSet::new();
        let mut current: &'static str = *start;

        while let Some(migrator) = migrators.get(current) {
            if !on_path.insert(current) {
                let from = path.iter().position(|t| *t == current).unwrap_or(0);
                let mut cycle: Vec<&str> = path[from..].to_vec();
                cycle.push(current);
                return Err(RecordError::Configuration {
                    reason: format!("cyclic migrator chain: {}", cycle.join(" -> ")),
                });
            }
            path.push(current);
            current = migrator.target();
        }

        done.extend(path);
    }

    Ok(())
}
