use std::collections::BTreeMap;

use tabula_common::RowId;

/// Result of evaluating a search expression: the matching rows, and for each
/// row the sorted word positions that contributed to the match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    rows: BTreeMap<RowId, Vec<u32>>,
}

impl SearchHits {
    pub fn new() -> SearchHits {
        SearchHits::default()
    }

    /// Groups raw `(row, position)` occurrences by row.
    pub fn from_occurrences(occurrences: impl IntoIterator<Item = (RowId, u32)>) -> SearchHits {
        let mut rows: BTreeMap<RowId, Vec<u32>> = BTreeMap::new();
        for (row, pos) in occurrences {
            rows.entry(row).or_default().push(pos);
        }
        for positions in rows.values_mut() {
            positions.sort_unstable();
            positions.dedup();
        }
        SearchHits { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Matching rows in increasing order.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.keys().copied().collect()
    }

    pub fn positions(&self, row: RowId) -> Option<&[u32]> {
        self.rows.get(&row).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowId, &[u32])> {
        self.rows.iter().map(|(&r, p)| (r, p.as_slice()))
    }

    /// Row union; positions of rows hit on both sides are merged.
    pub fn union(mut self, other: SearchHits) -> SearchHits {
        for (row, positions) in other.rows {
            let slot = self.rows.entry(row).or_default();
            slot.extend(positions);
            slot.sort_unstable();
            slot.dedup();
        }
        self
    }

    /// Row intersection; positions from both sides are merged.
    pub fn intersect(self, other: &SearchHits) -> SearchHits {
        let rows = self
            .rows
            .into_iter()
            .filter_map(|(row, mut positions)| {
                let theirs = other.rows.get(&row)?;
                positions.extend_from_slice(theirs);
                positions.sort_unstable();
                positions.dedup();
                Some((row, positions))
            })
            .collect();
        SearchHits { rows }
    }

    /// Rows of `self` not hit by `other`, keeping only this side's positions.
    pub fn difference(self, other: &SearchHits) -> SearchHits {
        let rows = self
            .rows
            .into_iter()
            .filter(|(row, _)| !other.rows.contains_key(row))
            .collect();
        SearchHits { rows }
    }

    /// Row intersection where a row survives only if some pair of positions
    /// satisfies `accept(left, right)`. The surviving positions are exactly
    /// those taking part in an accepted pair.
    pub fn pairwise<F>(&self, other: &SearchHits, accept: F) -> SearchHits
    where
        F: Fn(u32, u32) -> bool,
    {
        let mut rows = BTreeMap::new();
        for (&row, left) in &self.rows {
            let Some(right) = other.rows.get(&row) else {
                continue;
            };
            let mut hits = Vec::new();
            for &l in left {
                for &r in right {
                    if accept(l, r) {
                        hits.push(l);
                        hits.push(r);
                    }
                }
            }
            if !hits.is_empty() {
                hits.sort_unstable();
                hits.dedup();
                rows.insert(row, hits);
            }
        }
        SearchHits { rows }
    }

    /// Keeps only rows for which `keep` returns a new row id, renumbering them.
    pub fn remap<F>(self, mut keep: F) -> SearchHits
    where
        F: FnMut(RowId) -> Option<RowId>,
    {
        let rows = self
            .rows
            .into_iter()
            .filter_map(|(row, positions)| keep(row).map(|r| (r, positions)))
            .collect();
        SearchHits { rows }
    }
}
