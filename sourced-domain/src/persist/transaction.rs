//! 多记录事务（RecordTransaction）
//!
//! 固定分区的写入累积器：可混合多个聚合的事件批与快照，
//! 一起提交或一起失败。每次加入都在加入时即校验
//! （分区一致、批内连续），被拒绝的条目从未进入事务，
//! 不影响后续对已接受条目的提交。
//!
use crate::error::{RecordError, RecordResult};
use crate::persist::backend::{RecordBackend, RecordWrite};
use crate::persist::record_store::RecordStore;
use crate::persist::{SerializedEvent, SerializedSnapshot};
use crate::record::RecordMeta;
use crate::validator;

pub struct RecordTransaction<'a, B> {
    store: &'a RecordStore<B>,
    partition_id: String,
    writes: Vec<RecordWrite>,
}

impl<'a, B> RecordTransaction<'a, B>
where
    B: RecordBackend,
{
    pub(crate) fn new(store: &'a RecordStore<B>, partition_id: String) -> Self {
        Self {
            store,
            partition_id,
            writes: Vec::new(),
        }
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// 加入一个事件批；对事务分区与批内一致性即时校验
    pub fn add_events(&mut self, events: Vec<SerializedEvent>) -> RecordResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let metas: Vec<RecordMeta> = events.iter().map(SerializedEvent::to_meta).collect();
        validator::validate_event_sequence(&self.partition_id, metas.iter())?;

        self.writes.push(RecordWrite::Events(events));
        Ok(())
    }

    /// 加入一份快照；分区不符即时拒绝
    pub fn add_snapshot(&mut self, snapshot: SerializedSnapshot) -> RecordResult<()> {
        let meta = snapshot.to_meta();
        validator::validate_record(&meta)?;

        if meta.partition_id() != self.partition_id {
            return Err(RecordError::Validation {
                reason: format!(
                    "{}.partition_id: expected `{}`, found `{}`",
                    meta.record_type(),
                    self.partition_id,
                    meta.partition_id()
                ),
            });
        }

        self.writes.push(RecordWrite::Snapshot(snapshot));
        Ok(())
    }

    /// 原子提交全部已接受的写入；空事务是无操作成功
    pub async fn commit(self) -> RecordResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        self.store.commit_writes(&self.partition_id, self.writes).await
    }
}
