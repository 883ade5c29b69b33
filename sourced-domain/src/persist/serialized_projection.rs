//! 投影持久化形态（SerializedProjection）
//!
//! 身份键为 `(partition_id, aggregate_id)`（按投影基类型各一份），
//! 携带派生时的聚合版本、工厂类型与生成逻辑哈希；
//! 新鲜度以存储哈希与当前工厂哈希是否一致判断。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::RecordResult;
use crate::record::{ProjectionRecord, RecordMeta};

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct SerializedProjection {
    partition_id: String,
    projection_id: String,
    /// 投影基类型名，同一聚合在同一基类型下至多一份存活投影
    projection_type: String,
    aggregate_id: String,
    aggregate_type: String,
    /// 派生时的聚合版本
    version: u64,
    /// 生成逻辑（工厂）类型名
    factory_type: String,
    /// 派生时生成逻辑的内容哈希
    hash: String,
    updated_at: DateTime<Utc>,
    payload: Value,
}

impl SerializedProjection {
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn projection_id(&self) -> &str {
        &self.projection_id
    }

    pub fn projection_type(&self) -> &str {
        &self.projection_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn factory_type(&self) -> &str {
        &self.factory_type
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 新鲜度判断：存储哈希等于当前工厂哈希即为最新
    pub fn is_up_to_date(&self, current_hash: &str) -> bool {
        self.hash == current_hash
    }

    pub fn to_meta(&self) -> RecordMeta {
        RecordMeta::builder()
            .partition_id(self.partition_id.clone())
            .aggregate_id(self.aggregate_id.clone())
            .record_id(self.projection_id.clone())
            .index(self.version)
            .aggregate_type(self.aggregate_type.clone())
            .record_type(self.projection_type.clone())
            .occurred_at(self.updated_at)
            .build()
    }

    pub fn from_record<P>(record: &ProjectionRecord<P>) -> RecordResult<Self>
    where
        P: Serialize,
    {
        Ok(Self {
            partition_id: record.meta.partition_id().to_string(),
            projection_id: record.meta.record_id().to_string(),
            projection_type: record.meta.record_type().to_string(),
            aggregate_id: record.meta.aggregate_id().to_string(),
            aggregate_type: record.meta.aggregate_type().to_string(),
            version: record.version,
            factory_type: record.factory_type.clone(),
            hash: record.hash.clone(),
            updated_at: record.meta.occurred_at(),
            payload: serde_json::to_value(&record.payload)?,
        })
    }

    /// 反序列化投影载荷
    pub fn to_payload<P>(&self) -> RecordResult<P>
    where
        P: DeserializeOwned,
    {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
