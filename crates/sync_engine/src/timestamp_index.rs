//! Read-only timestamp index over one stream.
//!
//! Sorted arrays are answered with binary search. Near-monotonic arrays
//! (a few out-of-order entries) fall back to a full scan with identical
//! results, so callers never need to care which path was taken.

use std::cmp::Ordering;
use std::ops::Range;

use contracts::{ContractError, StreamKind};

/// Timestamp index for one stream
#[derive(Debug, Clone)]
pub struct TimestampIndex {
    stream: StreamKind,
    timestamps: Vec<f64>,
    sorted: bool,
}

impl TimestampIndex {
    /// Build an index; fails with `EmptyStream` for zero timestamps
    pub fn new(stream: StreamKind, timestamps: Vec<f64>) -> Result<Self, ContractError> {
        if timestamps.is_empty() {
            return Err(ContractError::EmptyStream { stream });
        }
        let sorted = timestamps.windows(2).all(|w| w[0] <= w[1]);
        Ok(Self {
            stream,
            timestamps,
            sorted,
        })
    }

    #[inline]
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Always false, construction rejects empty streams
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Whether the fast (binary search) path is used
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    #[inline]
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Timestamp at `index`
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.timestamps.get(index).copied()
    }

    /// Largest step between consecutive timestamps (`None` for one element)
    pub fn max_gap(&self) -> Option<f64> {
        self.timestamps
            .windows(2)
            .map(|w| w[1] - w[0])
            .max_by(f64::total_cmp)
    }

    /// The `k` indices closest to `query` by absolute difference
    ///
    /// Ordered by ascending distance, ties broken by lower index. Returns
    /// every index when the stream holds fewer than `k` elements.
    pub fn nearest_indices(&self, query: f64, k: usize) -> Vec<usize> {
        let k = k.min(self.len());
        if k == 0 {
            return Vec::new();
        }
        if self.sorted && !query.is_nan() {
            self.nearest_sorted(query, k)
        } else {
            self.nearest_scan(query, k)
        }
    }

    /// Indices with timestamps in `[lo, hi)`, in index order
    pub fn range_indices(&self, lo: f64, hi: f64) -> Vec<usize> {
        match self.sorted_range(lo, hi) {
            Some(range) => range.collect(),
            None => self
                .timestamps
                .iter()
                .enumerate()
                .filter(|&(_, &t)| t >= lo && t < hi)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// Contiguous index range for `[lo, hi)` when the stream is sorted
    pub fn sorted_range(&self, lo: f64, hi: f64) -> Option<Range<usize>> {
        if !self.sorted {
            return None;
        }
        let start = self.timestamps.partition_point(|&t| t < lo);
        let end = self.timestamps.partition_point(|&t| t < hi);
        Some(start..end.max(start))
    }

    /// Reorder indices by ascending timestamp, ties by index
    ///
    /// The result does not depend on the order of `indices`.
    pub fn sort_by_timestamp(&self, indices: &[usize]) -> Vec<usize> {
        let mut out: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.len())
            .collect();
        out.sort_by(|&a, &b| {
            self.timestamps[a]
                .total_cmp(&self.timestamps[b])
                .then(a.cmp(&b))
        });
        out
    }

    #[inline]
    fn distance(&self, index: usize, query: f64) -> f64 {
        (self.timestamps[index] - query).abs()
    }

    fn by_distance(&self, query: f64) -> impl Fn(&usize, &usize) -> Ordering + '_ {
        move |&a, &b| {
            self.distance(a, query)
                .total_cmp(&self.distance(b, query))
                .then(a.cmp(&b))
        }
    }

    fn nearest_sorted(&self, query: f64, k: usize) -> Vec<usize> {
        let n = self.len();
        let split = self.timestamps.partition_point(|&t| t < query);

        // Grow [left, right) around the insertion point.
        let (mut left, mut right) = (split, split);
        while right - left < k {
            let take_left = match (left > 0, right < n) {
                (true, true) => self.distance(left - 1, query) <= self.distance(right, query),
                (true, false) => true,
                (false, _) => false,
            };
            if take_left {
                left -= 1;
            } else {
                right += 1;
            }
        }

        // Equal timestamps can straddle the boundary; widen to every
        // candidate at the k-th distance so lower indices win ties.
        let kth = (left..right)
            .map(|i| self.distance(i, query))
            .fold(0.0, f64::max);
        while left > 0 && self.distance(left - 1, query) <= kth {
            left -= 1;
        }
        while right < n && self.distance(right, query) <= kth {
            right += 1;
        }

        let mut candidates: Vec<usize> = (left..right).collect();
        candidates.sort_by(self.by_distance(query));
        candidates.truncate(k);
        candidates
    }

    fn nearest_scan(&self, query: f64, k: usize) -> Vec<usize> {
        let mut all: Vec<usize> = (0..self.len()).collect();
        all.sort_by(self.by_distance(query));
        all.truncate(k);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(ts: &[f64]) -> TimestampIndex {
        TimestampIndex::new(StreamKind::SecondaryVideo, ts.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_stream_rejected() {
        let err = TimestampIndex::new(StreamKind::Audio, vec![]).unwrap_err();
        assert!(matches!(
            err,
            ContractError::EmptyStream {
                stream: StreamKind::Audio
            }
        ));
    }

    #[test]
    fn test_nearest_sorted_by_distance() {
        let idx = index(&[0.2, 1.2, 2.2, 3.2, 4.2, 5.2, 6.2, 7.2, 8.2, 9.2]);
        assert_eq!(idx.nearest_indices(5.0, 3), vec![5, 4, 6]);
    }

    #[test]
    fn test_nearest_returns_all_when_short() {
        let idx = index(&[1.0, 2.0]);
        assert_eq!(idx.nearest_indices(1.9, 5), vec![1, 0]);
        assert!(idx.nearest_indices(1.9, 0).is_empty());
    }

    #[test]
    fn test_nearest_tie_lower_index_wins() {
        // 1.0 and 3.0 are both 1.0 away from 2.0
        let idx = index(&[1.0, 3.0, 10.0]);
        assert_eq!(idx.nearest_indices(2.0, 1), vec![0]);
        assert_eq!(idx.nearest_indices(2.0, 2), vec![0, 1]);
    }

    #[test]
    fn test_nearest_tie_on_duplicate_timestamps() {
        // Duplicates left of the query: the lower index must come first.
        let idx = index(&[1.0, 1.0, 1.0, 5.0]);
        assert_eq!(idx.nearest_indices(2.0, 1), vec![0]);
        assert_eq!(idx.nearest_indices(2.0, 2), vec![0, 1]);
    }

    #[test]
    fn test_nearest_query_outside_range() {
        let idx = index(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(idx.nearest_indices(-10.0, 2), vec![0, 1]);
        assert_eq!(idx.nearest_indices(10.0, 2), vec![3, 2]);
    }

    #[test]
    fn test_unsorted_matches_sorted_semantics() {
        let idx = index(&[0.0, 2.0, 1.0, 3.0, 2.5]);
        assert!(!idx.is_sorted());
        assert_eq!(idx.nearest_indices(2.1, 3), vec![1, 4, 3]);
        assert_eq!(idx.range_indices(1.0, 2.5), vec![1, 2]);
    }

    #[test]
    fn test_sorted_and_scan_agree() {
        let ts: Vec<f64> = (0..50).map(|i| (i / 2) as f64 * 0.5).collect();
        let idx = index(&ts);
        assert!(idx.is_sorted());
        for q in [-1.0, 0.0, 0.25, 3.1, 6.0, 12.2, 40.0] {
            for k in 1..6 {
                assert_eq!(
                    idx.nearest_sorted(q, k),
                    idx.nearest_scan(q, k),
                    "query {q}, k {k}"
                );
            }
        }
    }

    #[test]
    fn test_range_half_open() {
        let idx = index(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(idx.range_indices(1.0, 3.0), vec![1, 2]);
        assert_eq!(idx.range_indices(3.5, 1.0), Vec::<usize>::new());
        assert_eq!(idx.sorted_range(-5.0, 0.5), Some(0..1));
    }

    #[test]
    fn test_sort_by_timestamp_is_order_independent() {
        let idx = index(&[0.0, 3.0, 1.0, 2.0, 2.0]);
        let expected = vec![2, 3, 4];
        for perm in [[2, 3, 4], [4, 3, 2], [3, 2, 4], [4, 2, 3]] {
            assert_eq!(idx.sort_by_timestamp(&perm), expected);
        }
    }

    #[test]
    fn test_max_gap() {
        assert_eq!(index(&[0.0, 1.0, 3.5, 4.0]).max_gap(), Some(2.5));
        assert_eq!(index(&[7.0]).max_gap(), None);
    }
}
