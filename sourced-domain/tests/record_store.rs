use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sourced_domain::error::{RecordError, RecordResult};
use sourced_domain::persist::{
    DeleteRound, RecordBackend, RecordStore, RecordWrite, SerializedEvent, SerializedProjection,
    SerializedSnapshot,
};
use std::sync::Mutex;
use uuid::Uuid;

/// 内存后端：模拟唯一约束、原子提交与单轮最多 2 条的有界删除
#[derive(Default)]
struct MemoryBackend {
    events: Mutex<Vec<SerializedEvent>>,
    snapshots: Mutex<Vec<SerializedSnapshot>>,
    projections: Mutex<Vec<SerializedProjection>>,
}

const DELETE_BATCH: usize = 2;

impl MemoryBackend {
    fn event_conflict(
        existing: &[SerializedEvent],
        incoming: &SerializedEvent,
    ) -> Option<RecordError> {
        existing
            .iter()
            .any(|e| {
                e.partition_id() == incoming.partition_id()
                    && e.aggregate_id() == incoming.aggregate_id()
                    && e.index() == incoming.index()
            })
            .then(|| RecordError::Concurrency {
                aggregate_id: incoming.aggregate_id().to_string(),
                index: incoming.index(),
            })
    }

    fn snapshot_conflict(
        existing: &[SerializedSnapshot],
        incoming: &SerializedSnapshot,
    ) -> Option<RecordError> {
        existing
            .iter()
            .any(|s| {
                s.partition_id() == incoming.partition_id()
                    && s.aggregate_id() == incoming.aggregate_id()
                    && s.index() == incoming.index()
            })
            .then(|| RecordError::Concurrency {
                aggregate_id: incoming.aggregate_id().to_string(),
                index: incoming.index(),
            })
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn append_events(&self, events: Vec<SerializedEvent>) -> RecordResult<()> {
        let mut guard = self.events.lock().unwrap();
        // 先整批检查唯一约束，再写入，保证无部分写入可见
        for event in &events {
            if let Some(err) = Self::event_conflict(&guard, event) {
                return Err(err);
            }
        }
        guard.extend(events);
        Ok(())
    }

    async fn insert_snapshot(&self, snapshot: SerializedSnapshot) -> RecordResult<()> {
        let mut guard = self.snapshots.lock().unwrap();
        if let Some(err) = Self::snapshot_conflict(&guard, &snapshot) {
            return Err(err);
        }
        guard.push(snapshot);
        Ok(())
    }

    async fn upsert_projection(&self, projection: SerializedProjection) -> RecordResult<()> {
        let mut guard = self.projections.lock().unwrap();
        guard.retain(|p| {
            !(p.partition_id() == projection.partition_id()
                && p.aggregate_id() == projection.aggregate_id()
                && p.projection_type() == projection.projection_type())
        });
        guard.push(projection);
        Ok(())
    }

    async fn events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        after_index: Option<u64>,
    ) -> RecordResult<Vec<SerializedEvent>> {
        let mut matched: Vec<SerializedEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.partition_id() == partition_id
                    && e.aggregate_id() == aggregate_id
                    && after_index.is_none_or(|after| e.index() > after)
            })
            .cloned()
            .collect();
        matched.sort_by_key(SerializedEvent::index);
        Ok(matched)
    }

    async fn latest_snapshot(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        before_index: Option<u64>,
    ) -> RecordResult<Option<SerializedSnapshot>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.partition_id() == partition_id
                    && s.aggregate_id() == aggregate_id
                    && before_index.is_none_or(|before| s.index() <= before)
            })
            .max_by_key(|s| s.index())
            .cloned())
    }

    async fn projection(
        &self,
        partition_id: &str,
        aggregate_id: &str,
        projection_type: &str,
    ) -> RecordResult<Option<SerializedProjection>> {
        Ok(self
            .projections
            .lock()
            .unwrap()
            .iter()
            .find(|p| {
                p.partition_id() == partition_id
                    && p.aggregate_id() == aggregate_id
                    && p.projection_type() == projection_type
            })
            .cloned())
    }

    async fn aggregate_ids(
        &self,
        partition_id: &str,
        aggregate_type: &str,
    ) -> RecordResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.partition_id() == partition_id && e.aggregate_type() == aggregate_type)
            .map(|e| e.aggregate_id().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_events(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<DeleteRound> {
        let mut guard = self.events.lock().unwrap();
        let mut deleted = 0u64;
        guard.retain(|e| {
            let matches = e.partition_id() == partition_id && e.aggregate_id() == aggregate_id;
            if matches && (deleted as usize) < DELETE_BATCH {
                deleted += 1;
                return false;
            }
            true
        });
        let done = !guard
            .iter()
            .any(|e| e.partition_id() == partition_id && e.aggregate_id() == aggregate_id);
        Ok(DeleteRound { deleted, done })
    }

    async fn delete_snapshots(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<DeleteRound> {
        let mut guard = self.snapshots.lock().unwrap();
        let before = guard.len();
        guard.retain(|s| !(s.partition_id() == partition_id && s.aggregate_id() == aggregate_id));
        Ok(DeleteRound {
            deleted: (before - guard.len()) as u64,
            done: true,
        })
    }

    async fn delete_projections(
        &self,
        partition_id: &str,
        aggregate_id: &str,
    ) -> RecordResult<u64> {
        let mut guard = self.projections.lock().unwrap();
        let before = guard.len();
        guard.retain(|p| !(p.partition_id() == partition_id && p.aggregate_id() == aggregate_id));
        Ok((before - guard.len()) as u64)
    }

    async fn commit(&self, _partition_id: &str, writes: Vec<RecordWrite>) -> RecordResult<()> {
        // 两阶段：先全量检查冲突，再一次性落盘
        let mut events = self.events.lock().unwrap();
        let mut snapshots = self.snapshots.lock().unwrap();

        let mut staged_events: Vec<SerializedEvent> = Vec::new();
        let mut staged_snapshots: Vec<SerializedSnapshot> = Vec::new();

        for write in &writes {
            match write {
                RecordWrite::Events(batch) => {
                    for event in batch {
                        if let Some(err) = MemoryBackend::event_conflict(&events, event) {
                            return Err(err);
                        }
                        if let Some(err) = MemoryBackend::event_conflict(&staged_events, event) {
                            return Err(err);
                        }
                        staged_events.push(event.clone());
                    }
                }
                RecordWrite::Snapshot(snapshot) => {
                    if let Some(err) = MemoryBackend::snapshot_conflict(&snapshots, snapshot) {
                        return Err(err);
                    }
                    staged_snapshots.push(snapshot.clone());
                }
            }
        }

        events.extend(staged_events);
        snapshots.extend(staged_snapshots);
        Ok(())
    }
}

fn event(partition: &str, aggregate: &str, index: u64) -> SerializedEvent {
    SerializedEvent::builder()
        .partition_id(partition.to_string())
        .event_id(Uuid::new_v4().to_string())
        .event_type("Account.Credited".to_string())
        .aggregate_id(aggregate.to_string())
        .aggregate_type("Account".to_string())
        .index(index)
        .occurred_at(Utc::now())
        .payload(json!({ "Type": "Account.Credited", "amount": 1 }))
        .build()
}

fn snapshot(partition: &str, aggregate: &str, index: u64) -> SerializedSnapshot {
    SerializedSnapshot::builder()
        .partition_id(partition.to_string())
        .snapshot_id(Uuid::new_v4().to_string())
        .snapshot_type("Account.Snapshot".to_string())
        .aggregate_id(aggregate.to_string())
        .aggregate_type("Account".to_string())
        .index(index)
        .occurred_at(Utc::now())
        .payload(json!({ "balance": 1 }))
        .build()
}

fn store() -> RecordStore<MemoryBackend> {
    RecordStore::new(MemoryBackend::default())
}

#[tokio::test]
async fn empty_batch_is_a_noop_success() {
    let store = store();
    store.add_events(vec![]).await.unwrap();
    assert!(store.events("p", "a-1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_consecutive_batch_is_rejected_atomically() {
    let store = store();
    let batch = vec![event("p", "a-1", 0), event("p", "a-1", 2)];

    let err = store.add_events(batch).await.unwrap_err();
    assert!(matches!(err, RecordError::Validation { .. }));

    // 整批拒绝：流中不得有任何记录
    assert!(store.events("p", "a-1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn mixed_aggregate_batch_is_rejected() {
    let store = store();
    let batch = vec![event("p", "a-1", 0), event("p", "a-2", 1)];

    let err = store.add_events(batch).await.unwrap_err();
    assert!(matches!(err, RecordError::Validation { .. }));
    assert!(store.events("p", "a-1", None).await.unwrap().is_empty());
    assert!(store.events("p", "a-2", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_append_at_same_index_is_exclusive() {
    let store = store();

    store.add_events(vec![event("p", "a-1", 0)]).await.unwrap();
    let err = store.add_events(vec![event("p", "a-1", 0)]).await.unwrap_err();

    match err {
        RecordError::Concurrency { aggregate_id, index } => {
            assert_eq!(aggregate_id, "a-1");
            assert_eq!(index, 0);
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(store.events("p", "a-1", None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn conflicting_batch_leaves_no_partial_writes() {
    let store = store();
    store.add_events(vec![event("p", "a-1", 0)]).await.unwrap();

    // 首条与已有记录冲突时，后续无冲突的事件也不得落盘
    let stale = vec![event("p", "a-1", 0), event("p", "a-1", 1)];
    let err = store.add_events(stale).await.unwrap_err();
    assert!(matches!(err, RecordError::Concurrency { .. }));

    assert_eq!(store.events("p", "a-1", None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn events_read_supports_tail_after_index() {
    let store = store();
    store
        .add_events(vec![
            event("p", "a-1", 0),
            event("p", "a-1", 1),
            event("p", "a-1", 2),
        ])
        .await
        .unwrap();

    let tail = store.events("p", "a-1", Some(0)).await.unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].index(), 1);
    assert_eq!(tail[1].index(), 2);
}

#[tokio::test]
async fn snapshot_slot_conflict_is_a_concurrency_error() {
    let store = store();
    store.add_snapshot(snapshot("p", "a-1", 3)).await.unwrap();

    let err = store.add_snapshot(snapshot("p", "a-1", 3)).await.unwrap_err();
    assert!(matches!(err, RecordError::Concurrency { .. }));

    // 其它槽位不受影响
    store.add_snapshot(snapshot("p", "a-1", 7)).await.unwrap();
    let latest = store.latest_snapshot("p", "a-1").await.unwrap().unwrap();
    assert_eq!(latest.index(), 7);
}

#[tokio::test]
async fn exhaustive_delete_sums_bounded_rounds() {
    let store = store();
    let batch: Vec<_> = (0..5).map(|i| event("p", "a-1", i)).collect();
    store.add_events(batch).await.unwrap();

    // 后端单轮最多删 2 条，5 条需要 3 轮
    let deleted = store.delete_all_events("p", "a-1").await.unwrap();
    assert_eq!(deleted, 5);
    assert!(store.events("p", "a-1", None).await.unwrap().is_empty());

    // 目标已不存在：无操作成功
    let deleted = store.delete_all_events("p", "a-1").await.unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn delete_aggregate_all_reports_total_count() {
    let store = store();
    store
        .add_events(vec![event("p", "a-1", 0), event("p", "a-1", 1)])
        .await
        .unwrap();
    store.add_snapshot(snapshot("p", "a-1", 1)).await.unwrap();

    // 其它聚合不受删除影响
    store.add_events(vec![event("p", "a-2", 0)]).await.unwrap();

    let total = store.delete_aggregate_all("p", "a-1").await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(store.events("p", "a-2", None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn transaction_commits_mixed_writes_atomically() {
    let store = store();

    let mut txn = store.create_transaction("p");
    txn.add_events(vec![event("p", "a-1", 0), event("p", "a-1", 1)])
        .unwrap();
    txn.add_events(vec![event("p", "a-2", 0)]).unwrap();
    txn.add_snapshot(snapshot("p", "a-1", 1)).unwrap();
    assert_eq!(txn.len(), 3);

    txn.commit().await.unwrap();

    assert_eq!(store.events("p", "a-1", None).await.unwrap().len(), 2);
    assert_eq!(store.events("p", "a-2", None).await.unwrap().len(), 1);
    assert!(store.latest_snapshot("p", "a-1").await.unwrap().is_some());
}

#[tokio::test]
async fn transaction_rejects_foreign_partition_at_add_time() {
    let store = store();

    let mut txn = store.create_transaction("p");
    txn.add_events(vec![event("p", "a-1", 0)]).unwrap();

    let err = txn.add_events(vec![event("q", "a-1", 1)]).unwrap_err();
    assert!(matches!(err, RecordError::Validation { .. }));

    let err = txn.add_snapshot(snapshot("q", "a-1", 0)).unwrap_err();
    assert!(matches!(err, RecordError::Validation { .. }));

    // 被拒绝的条目从未进入事务，其余照常提交
    assert_eq!(txn.len(), 1);
    txn.commit().await.unwrap();
    assert_eq!(store.events("p", "a-1", None).await.unwrap().len(), 1);
    assert!(store.events("q", "a-1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn transaction_conflict_rolls_back_everything() {
    let store = store();
    store.add_events(vec![event("p", "a-1", 0)]).await.unwrap();

    let mut txn = store.create_transaction("p");
    txn.add_events(vec![event("p", "a-2", 0)]).unwrap();
    txn.add_events(vec![event("p", "a-1", 0)]).unwrap();

    let err = txn.commit().await.unwrap_err();
    assert!(matches!(err, RecordError::Concurrency { .. }));

    // 同一事务中的无冲突批也不得可见
    assert!(store.events("p", "a-2", None).await.unwrap().is_empty());
}
