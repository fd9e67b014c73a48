//! Offset result sets and their set algebra.
//!
//! A `ResultSet` is an ascending, duplicate-free list of segment-relative
//! offsets tagged with the segment it belongs to. Sets from different
//! segments never combine: the result is an empty, detached set.

use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    segment_offset: Option<u64>,
    values: Vec<u32>,
}

impl ResultSet {
    /// Build a set for `segment_offset`.
    ///
    /// Input that is not strictly ascending is sorted and deduplicated, so
    /// the merge operations can rely on the ordering.
    pub fn new(segment_offset: u64, mut values: Vec<u32>) -> Self {
        if !is_strictly_ascending(&values) {
            values.sort_unstable();
            values.dedup();
        }
        Self {
            segment_offset: Some(segment_offset),
            values,
        }
    }

    /// Empty set belonging to `segment_offset`.
    pub fn empty(segment_offset: u64) -> Self {
        Self {
            segment_offset: Some(segment_offset),
            values: Vec::new(),
        }
    }

    /// Empty set with no segment, the result of combining incompatible sets.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Originating segment, `None` for detached sets.
    pub fn segment_offset(&self) -> Option<u64> {
        self.segment_offset
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<u32> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.values.binary_search(&offset).is_ok()
    }

    /// Absolute capture positions (segment offset + relative offset).
    pub fn absolute_offsets(&self) -> impl Iterator<Item = u64> + '_ {
        let base = self.segment_offset.unwrap_or(0);
        self.values.iter().map(move |&v| base + v as u64)
    }

    fn compatible(&self, other: &ResultSet) -> Option<u64> {
        match (self.segment_offset, other.segment_offset) {
            (Some(a), Some(b)) if a == b => Some(a),
            _ => None,
        }
    }

    /// Values in either set.
    pub fn union(&self, other: &ResultSet) -> ResultSet {
        let Some(segment) = self.compatible(other) else {
            return ResultSet::detached();
        };
        let (a, b) = (&self.values, &other.values);
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    out.push(a[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(b[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&a[i..]);
        out.extend_from_slice(&b[j..]);
        ResultSet {
            segment_offset: Some(segment),
            values: out,
        }
    }

    /// Values in both sets.
    pub fn intersection(&self, other: &ResultSet) -> ResultSet {
        let Some(segment) = self.compatible(other) else {
            return ResultSet::detached();
        };
        let (a, b) = (&self.values, &other.values);
        let mut out = Vec::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        ResultSet {
            segment_offset: Some(segment),
            values: out,
        }
    }

    /// Values of `self` absent from `other`.
    pub fn complement(&self, other: &ResultSet) -> ResultSet {
        let Some(segment) = self.compatible(other) else {
            return ResultSet::detached();
        };
        let (a, b) = (&self.values, &other.values);
        let mut out = Vec::with_capacity(a.len());
        let mut j = 0;
        for &v in a {
            while j < b.len() && b[j] < v {
                j += 1;
            }
            if j == b.len() || b[j] != v {
                out.push(v);
            }
        }
        ResultSet {
            segment_offset: Some(segment),
            values: out,
        }
    }
}

fn is_strictly_ascending(values: &[u32]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

// ── Tests ─────────────────────────────────────────────────────────
