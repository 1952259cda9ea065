//! Reconciliation domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels for integrity violations.
///
/// Ordered from lowest to highest: Info < Warning < Error < Critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categories of integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityCategory {
    /// Cached called/funded amounts disagree with the call/payment rows.
    AggregateDrift,
    /// More than one allocation for the same `(fund_id, deal_id)` pair.
    DuplicateAllocation,
    /// Payments whose call, or whose call's allocation, is missing.
    OrphanedPayment,
}

impl IntegrityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityCategory::AggregateDrift => "AGGREGATE_DRIFT",
            IntegrityCategory::DuplicateAllocation => "DUPLICATE_ALLOCATION",
            IntegrityCategory::OrphanedPayment => "ORPHANED_PAYMENT",
        }
    }

    /// True when `repair()` can resolve violations of this category without
    /// an operator decision.
    pub fn is_repairable(&self) -> bool {
        !matches!(self, IntegrityCategory::OrphanedPayment)
    }
}

impl std::fmt::Display for IntegrityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected invariant violation.
///
/// Carries the figures a reviewer needs without re-querying the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityViolation {
    /// Stable identifier, unique within one report (e.g.
    /// `aggregate_drift:alloc-1`).
    pub id: String,
    pub category: IntegrityCategory,
    pub severity: Severity,
    /// The allocation concerned, when one can be named.
    pub allocation_id: Option<String>,
    pub message: String,
    /// Structured figures backing the message (cached vs recomputed
    /// amounts, duplicate ids, orphaned payment ids).
    pub details: serde_json::Value,
}

impl IntegrityViolation {
    pub fn new(
        category: IntegrityCategory,
        severity: Severity,
        allocation_id: Option<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let suffix = allocation_id.as_deref().unwrap_or("global");
        Self {
            id: format!("{}:{}", category.as_str().to_lowercase(), suffix),
            category,
            severity,
            allocation_id,
            message: message.into(),
            details,
        }
    }
}

/// Result of a dry-run integrity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub generated_at: DateTime<Utc>,
    pub allocations_checked: usize,
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    pub fn new(allocations_checked: usize, violations: Vec<IntegrityViolation>) -> Self {
        Self {
            generated_at: Utc::now(),
            allocations_checked,
            violations,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count_for(&self, category: IntegrityCategory) -> usize {
        self.violations
            .iter()
            .filter(|v| v.category == category)
            .count()
    }

    /// Highest severity present, or None for a clean report.
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }
}

/// Result of a repair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSummary {
    /// Allocations whose cached aggregates were overwritten.
    pub drift_repaired: Vec<String>,
    /// Surviving allocation ids of merged duplicate groups.
    pub duplicates_merged: Vec<String>,
    /// Violations left for manual action (orphaned payments).
    pub remaining: Vec<IntegrityViolation>,
}

impl RepairSummary {
    pub fn repair_count(&self) -> u32 {
        (self.drift_repaired.len() + self.duplicates_merged.len()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_report_aggregation() {
        let report = IntegrityReport::new(
            3,
            vec![
                IntegrityViolation::new(
                    IntegrityCategory::AggregateDrift,
                    Severity::Error,
                    Some("a1".to_string()),
                    "drift",
                    serde_json::json!({}),
                ),
                IntegrityViolation::new(
                    IntegrityCategory::OrphanedPayment,
                    Severity::Warning,
                    None,
                    "orphan",
                    serde_json::json!({}),
                ),
            ],
        );
        assert!(!report.is_clean());
        assert_eq!(report.count_for(IntegrityCategory::AggregateDrift), 1);
        assert_eq!(report.max_severity(), Some(Severity::Error));
    }

    #[test]
    fn test_orphans_are_not_repairable() {
        assert!(IntegrityCategory::AggregateDrift.is_repairable());
        assert!(IntegrityCategory::DuplicateAllocation.is_repairable());
        assert!(!IntegrityCategory::OrphanedPayment.is_repairable());
    }
}
