//! Synthetic cache keys.
//!
//! A key is a non-empty sequence of integers compared lexicographically.
//! Keys survive buffer shifts (they are never renumbered); new keys are
//! generated strictly between two neighbours so partial synchronization
//! can insert elements without touching the rest of the index.

use smallvec::{SmallVec, smallvec};

const MAX_LEVEL: u64 = u64::MAX;
const DEFAULT_STEP: u64 = MAX_LEVEL / 2;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(SmallVec<[u64; 4]>);

impl CacheKey {
    /// The natural key of an element at `begin`; the first row of a table
    /// or first item of a list passes `child: true` so the parent sorts
    /// strictly before it.
    pub fn natural(begin: usize, child: bool) -> Self {
        CacheKey(smallvec![begin as u64 + u64::from(child)])
    }

    /// Smallest key that any element with `begin >= pos` can have: used as
    /// a scan lower bound.
    pub fn lower_bound(pos: usize) -> Self {
        CacheKey(smallvec![pos as u64])
    }

    /// Largest key reachable by elements with `begin <= pos` (the
    /// `begin + 1` child adjustment included): used as a search upper
    /// bound.
    pub fn upper_bound(pos: usize) -> Self {
        CacheKey(smallvec![pos as u64, MAX_LEVEL])
    }

    fn level(&self, i: usize) -> Option<u64> {
        self.0.get(i).copied()
    }
}

/// Generate a key strictly between `lower` and `upper`. A missing bound is
/// treated as zero (below) or infinity (above).
pub fn generate(lower: Option<&CacheKey>, upper: Option<&CacheKey>) -> CacheKey {
    let mut key: SmallVec<[u64; 4]> = SmallVec::new();
    let mut skip_upper = upper.is_none();
    let mut i = 0;
    loop {
        let min = lower.and_then(|k| k.level(i)).unwrap_or(0);
        let max = if skip_upper {
            MAX_LEVEL
        } else {
            upper.and_then(|k| k.level(i)).unwrap_or(MAX_LEVEL)
        };
        if min == max {
            key.push(min);
        } else if max - min > 1 {
            // With a live upper bound, halve the gap; once the upper side
            // is exhausted, step up from the lower value instead.
            let between = if skip_upper {
                min.saturating_add(DEFAULT_STEP)
            } else {
                min + (max - min) / 2
            };
            key.push(between);
            break;
        } else {
            // Consecutive levels: keep the lower one and descend; the upper
            // bound no longer constrains deeper levels.
            key.push(min);
            skip_upper = true;
        }
        i += 1;
        // Levels are 64-bit; a gap always appears long before this.
        debug_assert!(i < 64);
    }
    CacheKey(key)
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "[{}]", parts.join(" "))
    }
}
