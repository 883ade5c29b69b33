//! 存储后端契约（RecordBackend）
//!
//! 核心消费的接口：具体实现（文档库、关系库、内存库等）由上层提供。
//! 实现必须保证：
//! - `append_events` 整批原子，`(partition_id, aggregate_id, index)`
//!   唯一约束冲突时返回 `Concurrency` 且无部分写入可见；
//! - 删除按轮进行（单轮可有界），核心负责循环到 `done`；
//! - `commit` 对一组异构写入整体原子。
//!
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RecordResult;
use crate::persist::{SerializedEvent, SerializedProjection, SerializedSnapshot};

/// 一轮有界删除的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRound {
    /// 本轮删除条数
    pub deleted: u64,
    /// 是否已无匹配记录残留
    pub done: bool,
}

/// 事务累积的一次异构写入
#[derive(Debug, Clone)]
pub enum RecordWrite {
    Events(Vec<SerializedEvent>),
    Snapshot(SerializedSnapshot),
}

#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// 原子追加一批事件；任一身份键已存在则整批拒绝并报告冲突槽位
    async fn append_events(&self, events: Vec<SerializedEvent>) -> RecordResult<()>;

    /// 插入快照；同一 `(aggregate_id, index)` 已有快照时返回 `Concurrency`
    async fn insert_snapshot(&self, snapshot: SerializedSnapshot) -> RecordResult<()>;

    /// 以 `(partition_id, aggregate_id, projection_type)` 为键建立或替换
    async fn upsert_projection(&self, projection: SerializedProjection) -> RecordResult<()>;

    /// 按 `index` 升序返回聚合事件；`after_index` 给定时仅返回其后的事件
    async fn events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        after_index: Option<u64>,
    ) -> RecordResult<Vec<SerializedEvent>>;

    /// 最近的快照；`before_index` 给定时限定 `index <= before_index`
    async fn latest_snapshot(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        before_index: Option<u64>,
    ) -> RecordResult<Option<SerializedSnapshot>>;

    async fn projection(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        projection_type: &str,
    ) -> RecordResult<Option<SerializedProjection>>;

    /// 分区内某聚合类型的全部聚合 ID（去重）
    async fn aggregate_ids(
        &self,
        partition_id: &str,
        aggregate_type: &str,
    ) -> RecordResult<Vec<String>>;

    /// 单轮有界删除事件；删除已不存在的记录是无操作成功
    async fn delete_events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<DeleteRound>;

    /// 单轮有界删除快照
    async fn delete_snapshots(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<DeleteRound>;

    /// 删除聚合的全部投影，返回删除条数
    async fn delete_projections(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64>;

    /// 原子提交一组异构写入（同一分区）
    async fn commit(&self, partition_id: &str, writes: Vec<RecordWrite>) -> RecordResult<()>;
}

#[async_trait]
impl<T> RecordBackend for Arc<T>
where
    T: RecordBackend + ?Sized,
{
    async fn append_events(&self, events: Vec<SerializedEvent>) -> RecordResult<()> {
        (**self).append_events(events).await
    }

    async fn insert_snapshot(&self, snapshot: SerializedSnapshot) -> RecordResult<()> {
        (**self).insert_snapshot(snapshot).await
    }

    async fn upsert_projection(&self, projection: SerializedProjection) -> RecordResult<()> {
        (**self).upsert_projection(projection).await
    }

    async fn events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        after_index: Option<u64>,
    ) -> RecordResult<Vec<SerializedEvent>> {
        (**self).events(partition_id, aggregate_id, after_index).await
    }

    async fn latest_snapshot(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        before_index: Option<u64>,
    ) -> RecordResult<Option<SerializedSnapshot>> {
        (**self)
            .latest_snapshot(partition_id, aggregate_id, before_index)
            .await
    }

    async fn projection(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        projection_type: &str,
    ) -> RecordResult<Option<SerializedProjection>> {
        (**self)
            .projection(partition_id, aggregate_id, projection_type)
            .await
    }

    async fn aggregate_ids(
        &self,
        partition_id: &str,
        aggregate_type: &str,
    ) -> RecordResult<Vec<String>> {
        (**self).aggregate_ids(partition_id, aggregate_type).await
    }

    async fn delete_events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<DeleteRound> {
        (**self).delete_events(partition_id, aggregate_id).await
    }

    async fn delete_snapshots(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<DeleteRound> {
        (**self).delete_snapshots(partition_id, aggregate_id).await
    }

    async fn delete_projections(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64> {
        (**self).delete_projections(partition_id, aggregate_id).await
    }

    async fn commit(&self, partition_id: &str, writes: Vec<RecordWrite>) -> RecordResult<()> {
        (**self).commit(partition_id, writes).await
    }
}
