//! 聚合（Aggregate）
//!
//! `Aggregate` 约束聚合状态的行为：以 `apply` 将事件投影到状态。
//! `AggregateRoot` 持有身份、版本与未提交事件缓冲，负责：
//! - `add`：为事件盖章身份字段、校验、应用并累积；
//! - `rehydrate`：从快照与事件流重建；
//! - 快照间隔判断与快照创建。
//!
//! 根实例是单写者值对象，跨实例的并发安全完全由存储层的
//! `(partition_id, aggregate_id, index)` 唯一约束保证。
//!
use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

use crate::converter::RecordPayload;
use crate::error::{RecordError, RecordResult};
use crate::record::{EventRecord, RecordMeta, SnapshotRecord};
use crate::validator;

/// 聚合状态接口
pub trait Aggregate:
    Default + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    const TYPE: &'static str;

    /// 快照间隔（每多少个事件落一次快照）；0 表示该聚合未实现快照
    const SNAPSHOT_INTERVAL: u64 = 0;

    /// 该聚合产生的事件载荷类型
    type Event: RecordPayload;

    /// 应用事件，更新聚合状态
    fn apply(&mut self, event: &Self::Event);
}

/// 快照记录的判别串，按聚合类型派生
pub fn snapshot_record_type<A: Aggregate>() -> String {
    format!("{}.Snapshot", A::TYPE)
}

/// 聚合根：状态 + 版本 + 未提交事件缓冲。
///
/// 不变式：`version` 恒等于已应用事件总数，
/// 每个事件应用时的 `index` 恒等于应用前的 `version`。
#[derive(Debug, Clone)]
pub struct AggregateRoot<A>
where
    A: Aggregate,
{
    partition_id: String,
    id: String,
    state: A,
    version: u64,
    uncommitted: Vec<EventRecord<A::Event>>,
}

impl<A> AggregateRoot<A>
where
    A: Aggregate,
{
    /// 创建空聚合根（`version = 0`），既用于新建也用于重建起点
    pub fn new(partition_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            partition_id: partition_id.into(),
            id: id.into(),
            state: A::default(),
            version: 0,
            uncommitted: Vec::new(),
        }
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn uncommitted_events(&self) -> &[EventRecord<A::Event>] {
        &self.uncommitted
    }

    /// 添加事件：以聚合身份盖章、校验、应用、版本 +1、入未提交缓冲。
    /// 返回盖章后的事件记录。
    pub fn add(&mut self, payload: A::Event) -> RecordResult<EventRecord<A::Event>> {
        if self.id.is_empty() {
            return Err(RecordError::Validation {
                reason: format!("{}.aggregate_id: must not be empty", A::TYPE),
            });
        }

        let record = EventRecord::new(
            &self.partition_id,
            &self.id,
            A::TYPE,
            self.version,
            payload,
        );

        validator::validate_event_record(&record)?;
        self.validate_event(&record.meta)?;

        self.state.apply(&record.payload);
        self.version += 1;
        self.uncommitted.push(record.clone());

        Ok(record)
    }

    /// 清空未提交事件，不改变版本与状态（持久化成功后调用）
    pub fn clear_uncommitted_events(&mut self) {
        self.uncommitted.clear();
    }

    /// 本批未提交事件是否越过了快照间隔边界。
    /// 由首末事件索引相对间隔的商判断，供持久化编排在批量提交后
    /// 决定是否附带落一份快照，聚合自身无需访问存储。
    pub fn is_snapshot_interval_exceeded(&self) -> bool {
        let interval = A::SNAPSHOT_INTERVAL;
        if interval == 0 {
            return false;
        }
        let (Some(first), Some(last)) = (self.uncommitted.first(), self.uncommitted.last())
        else {
            return false;
        };

        first.meta.index() / interval < (last.meta.index() + 1) / interval
    }

    /// 以当前状态创建快照记录，占用最后一个已应用事件的槽位。
    /// 未声明快照间隔的聚合类型视为未实现快照。
    pub fn create_snapshot(&self) -> RecordResult<SnapshotRecord> {
        if A::SNAPSHOT_INTERVAL == 0 {
            return Err(RecordError::Configuration {
                reason: format!(
                    "snapshots are not implemented for aggregate type `{}`",
                    A::TYPE
                ),
            });
        }
        if self.version == 0 {
            return Err(RecordError::Validation {
                reason: format!("{}.version: cannot snapshot an aggregate with no history", A::TYPE),
            });
        }

        let meta = RecordMeta::builder()
            .partition_id(self.partition_id.clone())
            .aggregate_id(self.id.clone())
            .index(self.version - 1)
            .aggregate_type(A::TYPE.to_string())
            .record_type(snapshot_record_type::<A>())
            .build();

        Ok(SnapshotRecord {
            meta,
            payload: serde_json::to_value(&self.state)?,
        })
    }

    /// 从可选快照与后续事件流重建聚合。
    /// 一条记录都没有应用时返回 `Ok(None)`（聚合不存在）。
    pub fn rehydrate(
        partition_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        snapshot: Option<SnapshotRecord>,
        events: Vec<EventRecord<A::Event>>,
    ) -> RecordResult<Option<Self>> {
        let partition_id = partition_id.into();
        let aggregate_id = aggregate_id.into();

        if aggregate_id.is_empty() {
            return Err(RecordError::Validation {
                reason: format!("{}.aggregate_id: must not be empty", A::TYPE),
            });
        }

        let mut root = Self::new(partition_id, aggregate_id);
        let mut applied = 0usize;

        if let Some(snapshot) = snapshot {
            validator::validate_record_for_aggregate(
                &snapshot.meta,
                &root.partition_id,
                &root.id,
                A::TYPE,
            )?;

            root.state = serde_json::from_value(snapshot.payload)?;
            root.version = snapshot.meta.index() + 1;
            applied += 1;
        }

        for record in events {
            validator::validate_event_record(&record)?;
            root.validate_event(&record.meta)?;

            root.state.apply(&record.payload);
            root.version += 1;
            applied += 1;
        }

        if applied == 0 {
            return Ok(None);
        }

        Ok(Some(root))
    }

    /// 记录对本聚合的归属校验
    pub fn validate_record(&self, meta: &RecordMeta) -> RecordResult<()> {
        validator::validate_record_for_aggregate(meta, &self.partition_id, &self.id, A::TYPE)
    }

    /// 事件对本聚合的归属与槽位校验（`index == version`）
    pub fn validate_event(&self, meta: &RecordMeta) -> RecordResult<()> {
        validator::validate_event_for_aggregate(
            meta,
            &self.partition_id,
            &self.id,
            A::TYPE,
            self.version,
        )
    }

    /// 快照对本聚合的归属校验（`index` 指向已存在的事件槽位）
    pub fn validate_snapshot(&self, meta: &RecordMeta) -> RecordResult<()> {
        validator::validate_snapshot_for_aggregate(
            meta,
            &self.partition_id,
            &self.id,
            A::TYPE,
            self.version,
        )
    }
}
