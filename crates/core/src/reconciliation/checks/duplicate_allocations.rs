//! Duplicate allocation integrity check.
//!
//! `(fund_id, deal_id)` is unique by construction; duplicates can only come
//! from imported or pre-index data. The repair merges each group into the
//! allocation with the lowest id: committed amounts are summed, calls are
//! re-pointed, and the other records are deleted.

use std::collections::BTreeMap;

use crate::reconciliation::model::{IntegrityCategory, IntegrityViolation, Severity};
use crate::reconciliation::traits::{IntegrityCheck, LedgerSnapshot};

/// One set of allocations sharing a `(fund_id, deal_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub fund_id: String,
    pub deal_id: String,
    /// Lowest id in the group; the merge survivor.
    pub survivor_id: String,
    /// The ids to be merged away, ascending.
    pub duplicate_ids: Vec<String>,
}

/// Groups the snapshot's allocations by `(fund_id, deal_id)` and returns
/// every group with more than one member.
pub fn duplicate_groups(snapshot: &LedgerSnapshot) -> Vec<DuplicateGroup> {
    let mut by_pair: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for allocation in &snapshot.allocations {
        by_pair
            .entry((allocation.fund_id.clone(), allocation.deal_id.clone()))
            .or_default()
            .push(allocation.id.clone());
    }

    by_pair
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((fund_id, deal_id), mut ids)| {
            ids.sort();
            let survivor_id = ids.remove(0);
            DuplicateGroup {
                fund_id,
                deal_id,
                survivor_id,
                duplicate_ids: ids,
            }
        })
        .collect()
}

/// Integrity check that detects duplicate `(fund_id, deal_id)` allocations.
pub struct DuplicateAllocationCheck;

impl DuplicateAllocationCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DuplicateAllocationCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrityCheck for DuplicateAllocationCheck {
    fn id(&self) -> &'static str {
        "duplicate_allocations"
    }

    fn category(&self) -> IntegrityCategory {
        IntegrityCategory::DuplicateAllocation
    }

    fn analyze(&self, snapshot: &LedgerSnapshot) -> Vec<IntegrityViolation> {
        duplicate_groups(snapshot)
            .into_iter()
            .map(|group| {
                IntegrityViolation::new(
                    IntegrityCategory::DuplicateAllocation,
                    Severity::Error,
                    Some(group.survivor_id.clone()),
                    format!(
                        "{} allocations share fund {} / deal {}",
                        group.duplicate_ids.len() + 1,
                        group.fund_id,
                        group.deal_id
                    ),
                    serde_json::json!({
                        "fundId": group.fund_id,
                        "dealId": group.deal_id,
                        "survivorId": group.survivor_id,
                        "duplicateIds": group.duplicate_ids,
                    }),
                )
            })
            .collect()
    }
}
