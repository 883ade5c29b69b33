//! 聚合服务（AggregateService）
//!
//! 面向调用方封装“重建 → 变更 → 持久化”的标准循环：
//! - `persist`：未提交事件（必要时连同快照）走同一分区事务提交，
//!   事件写入失败则什么都不清空，也不再尝试快照/投影；
//! - `rehydrate`：最近快照 + 其后事件尾段重建，不存在返回 `Ok(None)`；
//! - `rehydrate_and_persist`：两者的组合便捷形式。
//!
use std::marker::PhantomData;
use std::sync::Arc;

use sourced_domain::aggregate::{Aggregate, AggregateRoot};
use sourced_domain::converter::RecordConverter;
use sourced_domain::error::RecordResult;
use sourced_domain::persist::{
    RecordBackend, RecordStore, SerializedProjection, SerializedSnapshot, deserialize_events,
    serialize_events,
};
use sourced_domain::projection::ProjectionFactory;

use crate::error::{AppError, AppResult};

type ProjectorFn<A> =
    Arc<dyn Fn(&AggregateRoot<A>) -> RecordResult<SerializedProjection> + Send + Sync>;

pub struct AggregateService<A, B>
where
    A: Aggregate,
    B: RecordBackend,
{
    store: Arc<RecordStore<B>>,
    converter: Arc<RecordConverter>,
    projector: Option<ProjectorFn<A>>,
    _marker: PhantomData<A>,
}

impl<A, B> AggregateService<A, B>
where
    A: Aggregate,
    B: RecordBackend,
{
    pub fn new(store: Arc<RecordStore<B>>, converter: Arc<RecordConverter>) -> Self {
        Self {
            store,
            converter,
            projector: None,
            _marker: PhantomData,
        }
    }

    /// 配置随持久化一并维护的投影工厂
    pub fn with_factory<F>(mut self, factory: Arc<F>) -> Self
    where
        F: ProjectionFactory<Aggregate = A> + 'static,
    {
        self.projector = Some(Arc::new(move |root| {
            SerializedProjection::from_record(&factory.derive(root))
        }));
        self
    }

    /// 持久化未提交事件。
    /// 快照间隔越界时在同一事务内附带快照；事务成功后按需刷新投影，
    /// 最后清空未提交缓冲。无未提交事件时是无操作成功。
    pub async fn persist(&self, root: &mut AggregateRoot<A>) -> AppResult<()> {
        if root.id().is_empty() {
            return Err(AppError::Validation(format!(
                "{}.aggregate_id: must not be empty",
                A::TYPE
            )));
        }
        if root.uncommitted_events().is_empty() {
            return Ok(());
        }

        let events = serialize_events(&self.converter, root.uncommitted_events())
            .map_err(AppError::from)?;

        let snapshot = if root.is_snapshot_interval_exceeded() {
            Some(SerializedSnapshot::from_record(&root.create_snapshot()?))
        } else {
            None
        };

        let mut txn = self.store.create_transaction(root.partition_id());
        txn.add_events(events)?;
        if let Some(snapshot) = snapshot {
            txn.add_snapshot(snapshot)?;
        }
        txn.commit().await?;

        if let Some(projector) = &self.projector {
            let projection = projector(root)?;
            self.store.upsert_projection(projection).await?;
        }

        root.clear_uncommitted_events();
        Ok(())
    }

    /// 重建聚合；没有任何记录时返回 `Ok(None)`
    pub async fn rehydrate(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> AppResult<Option<AggregateRoot<A>>> {
        load_root::<A, B>(&self.store, &self.converter, partition_id, aggregate_id).await
    }

    /// 重建 → 调用方变更 → 持久化，作为一个调用方视角的逻辑单元。
    /// 聚合不存在时返回 `Ok(None)`，不执行变更。
    pub async fn rehydrate_and_persist<M>(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        mutation: M,
    ) -> AppResult<Option<AggregateRoot<A>>>
    where
        M: FnOnce(&mut AggregateRoot<A>) -> AppResult<()> + Send,
    {
        let Some(mut root) = self.rehydrate(partition_id, aggregate_id).await? else {
            return Ok(None);
        };

        mutation(&mut root)?;
        self.persist(&mut root).await?;

        Ok(Some(root))
    }
}

/// 快照优先的重建：先取最近快照，再加载其后的事件尾段重放
pub(crate) async fn load_root<A, B>(
    store: &RecordStore<B>,
    converter: &RecordConverter,
    partition_id: &str,
    aggregate_id: &str,
) -> AppResult<Option<AggregateRoot<A>>>
where
    A: Aggregate,
    B: RecordBackend,
{
    if aggregate_id.is_empty() {
        return Err(AppError::Validation(format!(
            "{}.aggregate_id: must not be empty",
            A::TYPE
        )));
    }

    let snapshot = store.latest_snapshot(partition_id, aggregate_id).await?;
    let after_index = snapshot.as_ref().map(SerializedSnapshot::index);

    let serialized = store.events(partition_id, aggregate_id, after_index).await?;
    let events = deserialize_events::<A::Event>(converter, serialized)?;

    let root = AggregateRoot::rehydrate(
        partition_id,
        aggregate_id,
        snapshot.as_ref().map(SerializedSnapshot::to_record),
        events,
    )?;

    Ok(root)
}
