//! Planning of parallel range reads.
//!
//! The planner is a pure function from a read request to a list of
//! disjoint sub-ranges; executing the plan is the façade's job. Keeping it
//! side-effect free makes the arithmetic testable without any backend.

/// One sub-range of a planned read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReadSlice {
    /// Offset of this slice within the destination buffer. The backend
    /// offset of the slice is the request offset plus `begin`.
    pub begin: usize,
    /// Bytes covered by this slice. Always at least 1.
    pub nbytes: usize,
}

/// Splits a read of `nbytes` into sub-ranges for concurrent execution.
///
/// The fan-out is `min(max(nbytes / min_parallel_size, 1), pool_size)`,
/// with each slice covering `ceil(nbytes / fan_out)` bytes except for a
/// shorter final slice. The slices are contiguous, pairwise disjoint, and
/// tile `[0, nbytes)` exactly; empty tail slices are never emitted.
///
/// A plan of length 0 (empty read) or 1 means: do not fan out.
pub fn plan_read(nbytes: usize, min_parallel_size: u64, pool_size: usize) -> Vec<ReadSlice> {
    if nbytes == 0 {
        return Vec::new();
    }

    let by_size = (nbytes as u64 / min_parallel_size.max(1)).max(1);
    let num_ops = by_size.min(pool_size.max(1) as u64) as usize;
    let per_op = (nbytes + num_ops - 1) / num_ops;

    let mut slices = Vec::with_capacity(num_ops);
    for index in 0..num_ops {
        let begin = index * per_op;
        if begin >= nbytes {
            break;
        }
        let end = ((index + 1) * per_op - 1).min(nbytes - 1);
        slices.push(ReadSlice { begin, nbytes: end - begin + 1 });
    }
    slices
}

#[cfg(test)]
mod test {
    use super::*;

    fn spans(slices: &[ReadSlice]) -> Vec<(usize, usize)> {
        slices.iter().map(|s| (s.begin, s.begin + s.nbytes - 1)).collect()
    }

    #[test]
    fn four_way_split() {
        let slices = plan_read(10_000, 1_000, 4);
        assert_eq!(spans(&slices), vec![(0, 2499), (2500, 4999), (5000, 7499), (7500, 9999)]);
    }

    #[test]
    fn small_read_stays_synchronous() {
        assert_eq!(plan_read(500, 1_000, 4).len(), 1);
    }

    #[test]
    fn two_way_split() {
        let slices = plan_read(2_000, 1_000, 4);
        assert_eq!(spans(&slices), vec![(0, 999), (1000, 1999)]);
    }

    #[test]
    fn empty_read_plans_nothing() {
        assert!(plan_read(0, 1_000, 4).is_empty());
    }

    #[test]
    fn fan_out_is_capped_by_pool_size() {
        assert_eq!(plan_read(100_000, 1_000, 4).len(), 4);
        assert_eq!(plan_read(100_000, 1_000, 2).len(), 2);
    }

    #[test]
    fn slices_tile_the_request_exactly() {
        for nbytes in 1..=300 {
            for min_size in [1, 7, 32, 100] {
                for pool in [1, 2, 3, 8] {
                    let slices = plan_read(nbytes, min_size, pool);
                    let expected = ((nbytes as u64 / min_size).max(1)).min(pool as u64) as usize;
                    assert!(slices.len() <= expected);
                    assert!(!slices.is_empty());

                    let mut next = 0;
                    for slice in &slices {
                        assert_eq!(slice.begin, next, "contiguous, non-overlapping");
                        assert!(slice.nbytes >= 1);
                        next = slice.begin + slice.nbytes;
                    }
                    assert_eq!(next, nbytes, "full coverage");
                }
            }
        }
    }
}
