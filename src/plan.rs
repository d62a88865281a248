//! Record-count chunk planner.
//!
//! Splits an ordered list of records into contiguous units no larger than
//! a provider's chunk size. A list that fits in one unit is analyzed in a
//! single direct pass; anything larger goes through map-reduce.
//!
//! Chunk sizes are coarse record counts, not token budgets.

use std::ops::Range;

/// How an analysis will walk its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Half-open index ranges, in order, covering `[0, record_count)` exactly once.
    pub boundaries: Vec<Range<usize>>,
    /// `true` when everything fits in one provider call.
    pub direct: bool,
}

impl ChunkPlan {
    pub fn unit_count(&self) -> usize {
        self.boundaries.len()
    }
}

/// Plan how `record_count` records are split for a provider that accepts
/// `chunk_size` records per call.
///
/// A `chunk_size` of zero is treated as one. Unit `i` spans
/// `[i * chunk_size, min((i + 1) * chunk_size, record_count))`.
pub fn plan_chunks(record_count: usize, chunk_size: usize) -> ChunkPlan {
    let chunk_size = chunk_size.max(1);

    if record_count <= chunk_size {
        return ChunkPlan {
            boundaries: vec![0..record_count],
            direct: true,
        };
    }

    let unit_count = record_count.div_ceil(chunk_size);
    let boundaries = (0..unit_count)
        .map(|i| {
            let start = i * chunk_size;
            let end = ((i + 1) * chunk_size).min(record_count);
            start..end
        })
        .collect();

    ChunkPlan {
        boundaries,
        direct: false,
    }
}
