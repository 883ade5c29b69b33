//! 记录存储协议（RecordStore）
//!
//! 在后端契约之上落实写入/读取协议：
//! - 追加前整批校验（单分区、单聚合、索引严格连续）；
//! - 空批次是无操作成功；
//! - 删除循环后端的有界轮次直到穷尽，汇总准确条数；
//! - 事务构建器按固定分区累积异构写入。
//!
use crate::error::RecordResult;
use crate::persist::backend::{RecordBackend, RecordWrite};
use crate::persist::transaction::RecordTransaction;
use crate::persist::{SerializedEvent, SerializedProjection, SerializedSnapshot};
use crate::record::RecordMeta;
use crate::validator;

pub struct RecordStore<B> {
    backend: B,
}

impl<B> RecordStore<B>
where
    B: RecordBackend,
{
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 原子追加一批事件。空批次直接成功；
    /// 批次以首条事件的分区为基准整体校验后提交，
    /// 身份键冲突由后端以 `Concurrency` 报告且无部分写入。
    pub async fn add_events(&self, events: Vec<SerializedEvent>) -> RecordResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let metas: Vec<RecordMeta> = events.iter().map(SerializedEvent::to_meta).collect();
        validator::validate_event_sequence(metas[0].partition_id(), metas.iter())?;

        self.backend.append_events(events).await
    }

    /// 写入快照；同一槽位已有快照时由后端报告冲突
    pub async fn add_snapshot(&self, snapshot: SerializedSnapshot) -> RecordResult<()> {
        validator::validate_record(&snapshot.to_meta())?;
        self.backend.insert_snapshot(snapshot).await
    }

    /// 幂等建立或替换投影（派生数据，后写者胜）
    pub async fn upsert_projection(&self, projection: SerializedProjection) -> RecordResult<()> {
        validator::validate_record(&projection.to_meta())?;
        self.backend.upsert_projection(projection).await
    }

    pub async fn events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        after_index: Option<u64>,
    ) -> RecordResult<Vec<SerializedEvent>> {
        self.backend
            .events(partition_id, aggregate_id, after_index)
            .await
    }

    pub async fn latest_snapshot(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<Option<SerializedSnapshot>> {
        self.backend
            .latest_snapshot(partition_id, aggregate_id, None)
            .await
    }

    pub async fn projection(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        projection_type: &str,
    ) -> RecordResult<Option<SerializedProjection>> {
        self.backend
            .projection(partition_id, aggregate_id, projection_type)
            .await
    }

    pub async fn aggregate_ids(
        &self,
        partition_id: &str,
        aggregate_type: &str,
    ) -> RecordResult<Vec<String>> {
        self.backend.aggregate_ids(partition_id, aggregate_type).await
    }

    /// 穷尽删除聚合的全部事件，多轮累计，返回准确删除总数
    pub async fn delete_all_events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64> {
        let mut total = 0u64;
        loop {
            let round = self.backend.delete_events(partition_id, aggregate_id).await?;
            total += round.deleted;
            if round.done {
                return Ok(total);
            }
        }
    }

    /// 穷尽删除聚合的全部快照
    pub async fn delete_all_snapshots(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64> {
        let mut total = 0u64;
        loop {
            let round = self
                .backend
                .delete_snapshots(partition_id, aggregate_id)
                .await?;
            total += round.deleted;
            if round.done {
                return Ok(total);
            }
        }
    }

    /// 删除聚合投影；目标不存在时为无操作成功
    pub async fn delete_projection(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64> {
        self.backend
            .delete_projections(partition_id, aggregate_id)
            .await
    }

    /// 删除聚合的全部记录（事件、快照、投影），返回总删除条数
    pub async fn delete_aggregate_all(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64> {
        let events = self.delete_all_events(partition_id, aggregate_id).await?;
        let snapshots = self.delete_all_snapshots(partition_id, aggregate_id).await?;
        let projections = self.delete_projection(partition_id, aggregate_id).await?;

        Ok(events + snapshots + projections)
    }

    /// 打开一个分区作用域的多记录事务
    pub fn create_transaction(&self, partition_id: impl Into<String>) -> RecordTransaction<'_, B> {
        RecordTransaction::new(self, partition_id.into())
    }

    pub(crate) async fn commit_writes(
        &self,
        partition_id: &str,
        writes: Vec<RecordWrite>,
    ) -> RecordResult<()> {
        self.backend.commit(partition_id, writes).await
    }
}
