//! Image-set and field change detection.

use crate::catalog::ProductContent;

/// Difference between a stored image set and a submitted one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDiff {
    /// URLs present in both, in submitted order.
    pub keep: Vec<String>,
    /// URLs only in the submission, in submitted order.
    pub to_add: Vec<String>,
    /// URLs only in storage, in stored order.
    pub to_delete: Vec<String>,
}

impl ImageDiff {
    /// Computes keep/add/delete between cleaned URL lists.
    #[must_use]
    pub fn compute(existing: &[String], desired: &[String]) -> Self {
        let (keep, to_add) = desired
            .iter()
            .cloned()
            .partition(|url| existing.contains(url));
        let to_delete = existing
            .iter()
            .filter(|url| !desired.contains(url))
            .cloned()
            .collect();
        Self {
            keep,
            to_add,
            to_delete,
        }
    }

    /// Returns true if any image is added or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_delete.is_empty()
    }
}

/// Returns true if any importable field differs.
#[must_use]
pub fn fields_changed(before: &ProductContent, after: &ProductContent) -> bool {
    before != after
}
