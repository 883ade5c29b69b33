//! 记录模型（Record Model）
//!
//! 所有持久化单元（事件、快照、投影）共享同一个信封 `RecordMeta`，
//! 记录种类以独立结构表达而非继承：
//! - `EventRecord`：一次状态变更，身份键 `(partition_id, aggregate_id, index)`；
//! - `SnapshotRecord`：某一 `index` 时刻的聚合全量状态；
//! - `ProjectionRecord`：派生读模型，身份键 `(partition_id, aggregate_id)`。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::converter::RecordPayload;

/// 记录公共信封：分区、归属聚合、流内位置与类型判别串
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct RecordMeta {
    /// 分区（租户）范围，创建后不可变
    partition_id: String,
    /// 归属聚合 ID
    aggregate_id: String,
    /// 全局唯一记录 ID，构造时生成
    #[builder(default = Uuid::new_v4().to_string())]
    record_id: String,
    /// 聚合流内位置，从零开始严格连续
    index: u64,
    /// 归属聚合类型名
    aggregate_type: String,
    /// 具体记录类型的判别串
    record_type: String,
    /// 创建时间
    #[builder(default = Utc::now())]
    occurred_at: DateTime<Utc>,
}

impl RecordMeta {
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// 事件/快照的派生身份键
    pub fn identity(&self) -> (&str, &str, u64) {
        (&self.partition_id, &self.aggregate_id, self.index)
    }
}

/// 事件记录：一次不可变的状态变更事实
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord<E> {
    pub meta: RecordMeta,
    pub payload: E,
}

impl<E> EventRecord<E>
where
    E: RecordPayload,
{
    /// 以聚合身份字段盖章构造事件记录
    pub fn new(
        partition_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        index: u64,
        payload: E,
    ) -> Self {
        let meta = RecordMeta::builder()
            .partition_id(partition_id.to_string())
            .aggregate_id(aggregate_id.to_string())
            .index(index)
            .aggregate_type(aggregate_type.to_string())
            .record_type(payload.record_type().to_string())
            .build();

        Self { meta, payload }
    }
}

/// 快照记录：载荷为聚合全量状态的序列化形态，
/// 与产生它的事件占用同一个 `index` 槽位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub meta: RecordMeta,
    pub payload: Value,
}

/// 投影记录：由聚合当前状态派生的读模型，
/// 额外携带派生时的聚合版本、工厂类型与生成逻辑哈希
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRecord<P> {
    pub meta: RecordMeta,
    /// 派生时的聚合版本
    pub version: u64,
    /// 生成逻辑（工厂）的类型名
    pub factory_type: String,
    /// 派生时生成逻辑的内容哈希，用于新鲜度判断
    pub hash: String,
    pub payload: P,
}
