//! 投影工厂（Projection Factory）
//!
//! 投影由工厂从聚合当前状态派生，派生结果携带：
//! - `version`：派生时的聚合版本；
//! - `factory_type`：生成逻辑的类型名；
//! - `hash`：生成逻辑的内容哈希。
//!
//! 存储哈希与当前工厂哈希一致即视为最新；生成逻辑变更后
//! 无需急切重算，陈旧投影由哈希差异暴露，再统一重算补齐。
//!
use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::record::{ProjectionRecord, RecordMeta};

/// 生成逻辑内容的 SHA-256 十六进制哈希
pub fn content_hash(definition: &str) -> String {
    let digest = Sha256::digest(definition.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// 投影生成逻辑
pub trait ProjectionFactory: Send + Sync {
    /// 源聚合类型
    type Aggregate: Aggregate;

    /// 投影载荷类型
    type Projection: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    /// 工厂类型名，投影记录的 `factory_type`
    const FACTORY_TYPE: &'static str;

    /// 投影基类型名；同一聚合在同一基类型下至多一份存活投影
    const PROJECTION_TYPE: &'static str;

    /// 生成逻辑的内容描述，哈希的输入。
    /// 逻辑演进时必须随之变化，否则陈旧投影无法被识别。
    fn definition(&self) -> &str;

    /// 从聚合当前状态派生投影载荷
    fn project(&self, root: &AggregateRoot<Self::Aggregate>) -> Self::Projection;

    /// 当前生成逻辑的内容哈希
    fn hash(&self) -> String {
        content_hash(self.definition())
    }

    /// 派生投影记录并盖章版本、工厂类型与哈希
    fn derive(
        &self,
        root: &AggregateRoot<Self::Aggregate>,
    ) -> ProjectionRecord<Self::Projection> {
        let meta = RecordMeta::builder()
            .partition_id(root.partition_id().to_string())
            .aggregate_id(root.id().to_string())
            .index(root.version())
            .aggregate_type(<Self::Aggregate as Aggregate>::TYPE.to_string())
            .record_type(Self::PROJECTION_TYPE.to_string())
            .build();

        ProjectionRecord {
            meta,
            version: root.version(),
            factory_type: Self::FACTORY_TYPE.to_string(),
            hash: self.hash(),
            payload: self.project(root),
        }
    }
}
