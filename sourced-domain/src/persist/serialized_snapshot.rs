//! 快照持久化形态（SerializedSnapshot）
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{RecordMeta, SnapshotRecord};

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    partition_id: String,
    snapshot_id: String,
    snapshot_type: String,
    aggregate_id: String,
    aggregate_type: String,
    /// 快照覆盖到的事件槽位（与产生它的事件同一 `index`）
    index: u64,
    occurred_at: DateTime<Utc>,
    /// 聚合全量状态的序列化形态
    payload: Value,
}

impl SerializedSnapshot {
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    pub fn snapshot_type(&self) -> &str {
        &self.snapshot_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn to_meta(&self) -> RecordMeta {
        RecordMeta::builder()
            .partition_id(self.partition_id.clone())
            .aggregate_id(self.aggregate_id.clone())
            .record_id(self.snapshot_id.clone())
            .index(self.index)
            .aggregate_type(self.aggregate_type.clone())
            .record_type(self.snapshot_type.clone())
            .occurred_at(self.occurred_at)
            .build()
    }

    pub fn from_record(record: &SnapshotRecord) -> Self {
        Self {
            partition_id: record.meta.partition_id().to_string(),
            snapshot_id: record.meta.record_id().to_string(),
            snapshot_type: record.meta.record_type().to_string(),
            aggregate_id: record.meta.aggregate_id().to_string(),
            aggregate_type: record.meta.aggregate_type().to_string(),
            index: record.meta.index(),
            occurred_at: record.meta.occurred_at(),
            payload: record.payload.clone(),
        }
    }

    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            meta: self.to_meta(),
            payload: self.payload.clone(),
        }
    }
}
