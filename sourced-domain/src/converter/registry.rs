//! 类型注册表（Type Registry）
//!
//! 判别串与具体记录类型的双向映射。注册来源是编译期穷举的显式白名单
//! （`RecordPayload::type_infos`），构造完成后不可变；不存在任何
//! 运行期“扫描全部类型”的步骤。
//!
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{RecordError, RecordResult};

/// 单个具体记录类型的注册信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTypeInfo {
    /// 判别串；通过 `#[serde(rename)]` 指定的显式覆盖优先于变体名
    pub name: &'static str,
    /// 非空必填字段，编解码两侧都会校验
    pub required: &'static [&'static str],
}

/// 记录载荷需要满足的能力边界。
///
/// 载荷以内部标签枚举表达（`#[serde(tag = "Type")]`），
/// 使线上文档天然携带名为 `Type` 的判别字段。
pub trait RecordPayload:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    /// 当前载荷值对应的判别串
    fn record_type(&self) -> &'static str;

    /// 该载荷类型全部变体的注册信息（编译期穷举）
    fn type_infos() -> &'static [RecordTypeInfo];
}

/// 不可变的判别串 → 类型信息映射
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, RecordTypeInfo>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// 解析判别串；未注册的类型视为 `TypeNotFound`
    pub fn resolve(&self, name: &str) -> RecordResult<&RecordTypeInfo> {
        self.types.get(name).ok_or_else(|| RecordError::TypeNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// 注册表构建器：白名单逐个登记，`build` 时检查判别串唯一
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    infos: Vec<RecordTypeInfo>,
}

impl TypeRegistryBuilder {
    /// 登记一个载荷类型的全部变体
    pub fn register<P>(mut self) -> Self
    where
        P: RecordPayload,
    {
        self.infos.extend_from_slice(P::type_infos());
        self
    }

    /// 登记单条类型信息（用于非枚举载荷，如快照）
    pub fn register_info(mut self, info: RecordTypeInfo) -> Self {
        self.infos.push(info);
        self
    }

    pub fn build(self) -> RecordResult<TypeRegistry> {
        let mut types = HashMap::with_capacity(self.infos.len());

        for info in self.infos {
            if types.insert(info.name, info).is_some() {
                return Err(RecordError::Configuration {
                    reason: format!("duplicate record type registration: `{}`", info.name),
                });
            }
        }

        Ok(TypeRegistry { types })
    }
}
