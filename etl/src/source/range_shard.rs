use std::sync::Arc;

use futures::{stream, StreamExt};
use mongodb::bson::oid::ObjectId;
use tracing::debug;

use super::WorkUnitStream;
use crate::checkpoint::CheckpointStore;
use crate::error::{EtlError, EtlResult};
use crate::types::{IdRange, RangeFilter, WorkUnit};

/// Split the ObjectId space into `shard_count` contiguous `[start, end)` ranges on the
/// first hex digit. The first range starts at zero and the last one is unbounded, so the
/// ranges cover every id exactly once.
pub fn shard_ranges(filter: RangeFilter, shard_count: usize) -> EtlResult<Vec<IdRange>> {
    if !(1..=16).contains(&shard_count) {
        return Err(EtlError::ConfigError(format!("shard_count must be between 1 and 16, got {}", shard_count)));
    }

    let boundary = |index: usize| {
        let digit = (index * 16 / shard_count) as u8;
        let mut bytes = [0u8; 12];
        bytes[0] = digit << 4;
        ObjectId::from_bytes(bytes)
    };

    Ok((0..shard_count)
        .map(|index| IdRange {
            filter,
            index,
            start: boundary(index),
            end: (index + 1 < shard_count).then(|| boundary(index + 1)),
        })
        .collect())
}

pub fn range_units(filter: RangeFilter, shard_count: usize, checkpoint: Arc<CheckpointStore>) -> EtlResult<WorkUnitStream> {
    let units: Vec<EtlResult<WorkUnit>> = shard_ranges(filter, shard_count)?
        .into_iter()
        .map(WorkUnit::for_range)
        .filter(|unit| {
            let pending = checkpoint.should_process(unit.key());
            if !pending {
                debug!(unit = %unit, "Range already terminal");
            }
            pending
        })
        .map(Ok)
        .collect();
    Ok(stream::iter(units).boxed())
}
