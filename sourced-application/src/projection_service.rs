//! 投影更新服务（ProjectionUpdateService）
//!
//! 以 `factory_type` 为键注册投影工厂，按分区重算并 upsert
//! 某聚合类型下全部聚合的投影。生成逻辑变更后哈希不再一致，
//! 用此服务统一补齐陈旧投影。
//!
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use sourced_domain::aggregate::Aggregate;
use sourced_domain::converter::RecordConverter;
use sourced_domain::persist::{RecordBackend, RecordStore, SerializedProjection};
use sourced_domain::projection::ProjectionFactory;

use crate::aggregate_service::load_root;
use crate::error::{AppError, AppResult};

type UpdateFuture<'a> = Pin<Box<dyn Future<Output = AppResult<u64>> + Send + 'a>>;

type UpdateFn<B> = Arc<
    dyn for<'a> Fn(&'a RecordStore<B>, &'a RecordConverter, &'a str) -> UpdateFuture<'a>
        + Send
        + Sync,
>;

pub struct ProjectionUpdateService<B>
where
    B: RecordBackend,
{
    store: Arc<RecordStore<B>>,
    converter: Arc<RecordConverter>,
    updaters: DashMap<&'static str, UpdateFn<B>>,
}

impl<B> ProjectionUpdateService<B>
where
    B: RecordBackend + 'static,
{
    pub fn new(store: Arc<RecordStore<B>>, converter: Arc<RecordConverter>) -> Self {
        Self {
            store,
            converter,
            updaters: DashMap::new(),
        }
    }

    /// 注册投影工厂，键为 `FACTORY_TYPE`
    pub fn register<F>(&self, factory: Arc<F>)
    where
        F: ProjectionFactory + 'static,
    {
        let updater: UpdateFn<B> = Arc::new(move |store, converter, partition_id| {
            let factory = Arc::clone(&factory);
            Box::pin(async move {
                update_projections::<F, B>(store, converter, partition_id, factory).await
            })
        });

        self.updaters.insert(F::FACTORY_TYPE, updater);
    }

    /// 重算指定工厂在某分区下的全部投影，返回更新条数
    pub async fn update_all_projections(
        &self,
        partition_id: &str,
        factory_type: &str,
    ) -> AppResult<u64> {
        let Some(updater) = self.updaters.get(factory_type).map(|e| Arc::clone(e.value()))
        else {
            return Err(AppError::FactoryNotFound(factory_type.to_string()));
        };

        (updater)(&self.store, &self.converter, partition_id).await
    }

    /// 重算全部已注册工厂的投影，返回更新总条数
    pub async fn update_all(&self, partition_id: &str) -> AppResult<u64> {
        let updaters: Vec<UpdateFn<B>> = self
            .updaters
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut total = 0u64;
        for updater in updaters {
            total += (updater)(&self.store, &self.converter, partition_id).await?;
        }

        Ok(total)
    }
}

/// 逐聚合重建并派生投影后 upsert（派生数据，后写者胜）
async fn update_projections<F, B>(
    store: &RecordStore<B>,
    converter: &RecordConverter,
    partition_id: &str,
    factory: Arc<F>,
) -> AppResult<u64>
where
    F: ProjectionFactory,
    B: RecordBackend,
{
    let aggregate_type = <F::Aggregate as Aggregate>::TYPE;
    let ids = store.aggregate_ids(partition_id, aggregate_type).await?;

    let mut updated = 0u64;
    for aggregate_id in ids {
        let Some(root) =
            load_root::<F::Aggregate, B>(store, converter, partition_id, &aggregate_id).await?
        else {
            continue;
        };

        let projection = SerializedProjection::from_record(&factory.derive(&root))?;
        store.upsert_projection(projection).await?;
        updated += 1;
    }

    Ok(updated)
}
