//! 事件持久化形态（SerializedEvent）
//!
//! 事件在存储层的标准形态，以及与 `EventRecord` 间经由转换器的
//! 编解码：写入侧校验必填字段，读取侧先走迁移链再反序列化。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::converter::{RecordConverter, RecordPayload};
use crate::error::RecordResult;
use crate::record::{EventRecord, RecordMeta};

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 分区（租户）范围
    partition_id: String,
    /// 事件唯一标识符
    event_id: String,
    /// 类型判别串，与载荷文档内的 `Type` 字段一致，冗余存储便于查询
    event_type: String,
    /// 聚合 ID
    aggregate_id: String,
    /// 聚合类型名
    aggregate_type: String,
    /// 流内位置，乐观并发的唯一约束键之一
    index: u64,
    /// 事件发生时间
    occurred_at: DateTime<Utc>,
    /// 自描述载荷文档（携带 `Type` 判别字段）
    payload: Value,
}

impl SerializedEvent {
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
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

    /// 以信封形态视图用于校验
    pub fn to_meta(&self) -> RecordMeta {
        RecordMeta::builder()
            .partition_id(self.partition_id.clone())
            .aggregate_id(self.aggregate_id.clone())
            .record_id(self.event_id.clone())
            .index(self.index)
            .aggregate_type(self.aggregate_type.clone())
            .record_type(self.event_type.clone())
            .occurred_at(self.occurred_at)
            .build()
    }
}

/// 批量编码：每条事件经转换器产出自描述文档并校验必填字段
pub fn serialize_events<E>(
    converter: &RecordConverter,
    events: &[EventRecord<E>],
) -> RecordResult<Vec<SerializedEvent>>
where
    E: RecordPayload,
{
    events
        .iter()
        .map(|record| {
            let doc = converter.encode(&record.payload)?;

            Ok(SerializedEvent::builder()
                .partition_id(record.meta.partition_id().to_string())
                .event_id(record.meta.record_id().to_string())
                .event_type(record.meta.record_type().to_string())
                .aggregate_id(record.meta.aggregate_id().to_string())
                .aggregate_type(record.meta.aggregate_type().to_string())
                .index(record.meta.index())
                .occurred_at(record.meta.occurred_at())
                .payload(doc)
                .build())
        })
        .collect()
}

/// 批量解码：迁移链升级到当前形态后反序列化；
/// 判别串以迁移后的载荷为准。
pub fn deserialize_events<E>(
    converter: &RecordConverter,
    events: Vec<SerializedEvent>,
) -> RecordResult<Vec<EventRecord<E>>>
where
    E: RecordPayload,
{
    events
        .into_iter()
        .map(|event| {
            let payload: E = converter.decode(event.payload)?;

            let meta = RecordMeta::builder()
                .partition_id(event.partition_id)
                .aggregate_id(event.aggregate_id)
                .record_id(event.event_id)
                .index(event.index)
                .aggregate_type(event.aggregate_type)
                .record_type(payload.record_type().to_string())
                .occurred_at(event.occurred_at)
                .build();

            Ok(EventRecord { meta, payload })
        })
        .collect()
}
