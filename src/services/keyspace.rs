//! Exact arithmetic over the 128-bit chunk-ID keyspace.
//!
//! Splits and progress fractions are computed with arbitrary-precision
//! integers: floating point would introduce rounding that could leave
//! gaps or overlaps between shard ranges.

use num_bigint::BigUint;

use crate::domain::errors::{DomainError, DomainResult};

/// Number of bits in the chunk-ID keyspace.
const KEYSPACE_BITS: u64 = 128;

/// Hex width of a chunk ID.
const CHUNK_ID_WIDTH: usize = 32;

fn keyspace_size() -> BigUint {
    BigUint::from(1u8) << KEYSPACE_BITS
}

/// Divides the chunk-ID keyspace evenly into `count` partitions,
/// returning `count + 1` boundaries. Partition `i` covers the range
/// from boundary `i` (exclusive) to boundary `i + 1` (inclusive);
/// boundary 0 is the empty string, denoting the start of the keyspace,
/// and the last boundary is the maximum chunk ID.
pub fn worker_splits(count: usize) -> Vec<String> {
    let mut result = Vec::with_capacity(count + 1);
    result.push(String::new());

    let size = keyspace_size();
    for i in 0..count {
        // split = keyspaceSize * (i + 1) / count, minus one to adjust
        // for the upper bound being inclusive rather than exclusive
        // (the final split is ff..ff, not 1 followed by 32 zeroes).
        let split = &size * BigUint::from(i as u64 + 1) / BigUint::from(count as u64)
            - BigUint::from(1u8);
        result.push(format!("{:0>width$x}", split, width = CHUNK_ID_WIDTH));
    }
    result
}

/// The fraction, out of 1000, of the shard range `(start, end]` that is
/// consumed once `next_chunk_id` is the next chunk to process.
pub fn shard_progress(start: &str, end: &str, next_chunk_id: &str) -> DomainResult<i64> {
    let start = parse_bound(start)?;
    let end = parse_bound(end)?;
    let next = parse_bound(next_chunk_id)?;
    if end <= start {
        return Err(DomainError::ValidationFailed(
            "shard end must be greater than shard start".into(),
        ));
    }
    if next < start || next > end {
        return Err(DomainError::ValidationFailed(
            "chunk ID lies outside the shard range".into(),
        ));
    }
    let progress = (&next - &start) * BigUint::from(1000u32) / (&end - &start);
    i64::try_from(progress)
        .map_err(|_| DomainError::ValidationFailed("progress out of range".into()))
}

/// Estimates the number of chunks in a project from the ID of the
/// 100th chunk in ascending keyspace order. Chunk IDs are approximately
/// uniformly distributed, so the estimator is
/// `100 / (fraction of keyspace used by the first 100 rows)`, i.e.
/// `100 * 2^128 / (chunk_id_100 + 1)`. Capped at one billion.
pub fn estimate_chunks_from_id(chunk_id_100: &str) -> DomainResult<u64> {
    const MAX_ESTIMATE: u64 = 1_000_000_000;

    let numerator = BigUint::from(100u8) << KEYSPACE_BITS;
    // The keyspace consumed includes the ID itself.
    let denominator = parse_bound(chunk_id_100)? + BigUint::from(1u8);
    let estimate = numerator / denominator;
    Ok(u64::try_from(estimate).unwrap_or(u64::MAX).min(MAX_ESTIMATE))
}

/// Parses a chunk-ID range bound. The empty string is the start of the
/// keyspace (zero).
fn parse_bound(bound: &str) -> DomainResult<BigUint> {
    if bound.is_empty() {
        return Ok(BigUint::from(0u8));
    }
    BigUint::parse_bytes(bound.as_bytes(), 16)
        .ok_or_else(|| DomainError::ValidationFailed(format!("invalid chunk ID {bound:?}")))
}
