//! 记录校验（Record Validator）
//!
//! 无副作用的纯校验函数。失败统一返回 `RecordError::Validation`，
//! 消息按 `类型名.字段名: 原因` 定位到具体字段；批量校验整体拒绝，
//! 不做部分接受。
//!
use std::fmt;

use crate::converter::RecordPayload;
use crate::error::{RecordError, RecordResult};
use crate::record::{EventRecord, RecordMeta};

fn fail(type_name: &str, field: &str, reason: impl fmt::Display) -> RecordError {
    RecordError::Validation {
        reason: format!("{type_name}.{field}: {reason}"),
    }
}

/// 单条记录的内部一致性校验
pub fn validate_record(meta: &RecordMeta) -> RecordResult<()> {
    if meta.record_type().is_empty() {
        return Err(RecordError::Validation {
            reason: "record_type: must not be empty".to_string(),
        });
    }
    if meta.aggregate_id().is_empty() {
        return Err(fail(meta.record_type(), "aggregate_id", "must not be empty"));
    }
    if meta.aggregate_type().is_empty() {
        return Err(fail(meta.record_type(), "aggregate_type", "must not be empty"));
    }

    Ok(())
}

/// 事件记录的判别串必须与载荷实际变体一致
pub fn validate_event_record<E>(record: &EventRecord<E>) -> RecordResult<()>
where
    E: RecordPayload,
{
    validate_record(&record.meta)?;

    let expected = record.payload.record_type();
    if record.meta.record_type() != expected {
        return Err(fail(
            expected,
            "record_type",
            format!("discriminator mismatch, found `{}`", record.meta.record_type()),
        ));
    }

    Ok(())
}

/// 记录对其归属聚合的一致性校验
pub fn validate_record_for_aggregate(
    meta: &RecordMeta,
    partition_id: &str,
    aggregate_id: &str,
    aggregate_type: &str,
) -> RecordResult<()> {
    validate_record(meta)?;

    if meta.aggregate_id() != aggregate_id {
        return Err(fail(
            meta.record_type(),
            "aggregate_id",
            format!("expected `{aggregate_id}`, found `{}`", meta.aggregate_id()),
        ));
    }
    if meta.aggregate_type() != aggregate_type {
        return Err(fail(
            meta.record_type(),
            "aggregate_type",
            format!("expected `{aggregate_type}`, found `{}`", meta.aggregate_type()),
        ));
    }
    if meta.partition_id() != partition_id {
        return Err(fail(
            meta.record_type(),
            "partition_id",
            format!("expected `{partition_id}`, found `{}`", meta.partition_id()),
        ));
    }

    Ok(())
}

/// 事件必须落在聚合的下一个槽位（`index == version`）
pub fn validate_event_for_aggregate(
    meta: &RecordMeta,
    partition_id: &str,
    aggregate_id: &str,
    aggregate_type: &str,
    version: u64,
) -> RecordResult<()> {
    validate_record_for_aggregate(meta, partition_id, aggregate_id, aggregate_type)?;

    if meta.index() != version {
        return Err(fail(
            meta.record_type(),
            "index",
            format!("expected {version}, found {}", meta.index()),
        ));
    }

    Ok(())
}

/// 快照的归属校验：`index` 必须指向已存在的事件槽位（小于当前版本）
pub fn validate_snapshot_for_aggregate(
    meta: &RecordMeta,
    partition_id: &str,
    aggregate_id: &str,
    aggregate_type: &str,
    version: u64,
) -> RecordResult<()> {
    validate_record_for_aggregate(meta, partition_id, aggregate_id, aggregate_type)?;

    if meta.index() >= version {
        return Err(fail(
            meta.record_type(),
            "index",
            format!(
                "must reference an existing event index, found {} with version {version}",
                meta.index()
            ),
        ));
    }

    Ok(())
}

/// 事件批次的一致性校验：
/// 同一分区、同一聚合、按提交顺序 `index` 严格连续（不重排）。
/// 任一条不满足则整批拒绝。
pub fn validate_event_sequence<'a, I>(partition_id: &str, events: I) -> RecordResult<()>
where
    I: IntoIterator<Item = &'a RecordMeta>,
{
    let mut prev: Option<&RecordMeta> = None;

    for meta in events {
        validate_record(meta)?;

        if meta.partition_id() != partition_id {
            return Err(fail(
                meta.record_type(),
                "partition_id",
                format!("expected `{partition_id}`, found `{}`", meta.partition_id()),
            ));
        }

        if let Some(prev) = prev {
            if meta.aggregate_id() != prev.aggregate_id() {
                return Err(fail(
                    meta.record_type(),
                    "aggregate_id",
                    format!(
                        "batch must target one aggregate, expected `{}`, found `{}`",
                        prev.aggregate_id(),
                        meta.aggregate_id()
                    ),
                ));
            }
            if meta.index() != prev.index() + 1 {
                return Err(fail(
                    meta.record_type(),
                    "index",
                    format!("expected {}, found {}", prev.index() + 1, meta.index()),
                ));
            }
        }

        prev = Some(meta);
    }

    Ok(())
}
