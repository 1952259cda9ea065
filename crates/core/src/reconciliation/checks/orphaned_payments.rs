//! Orphaned payment integrity check.
//!
//! Foreign keys make these unreachable through normal operation; they can
//! appear after partial imports or manual database edits. Money records are
//! never silently deleted, so this check is report-only: the violations are
//! surfaced for manual action.

use std::collections::HashSet;

use crate::reconciliation::model::{IntegrityCategory, IntegrityViolation, Severity};
use crate::reconciliation::traits::{IntegrityCheck, LedgerSnapshot};

/// Integrity check that detects payments without a resolvable owner chain.
pub struct OrphanedPaymentCheck;

impl OrphanedPaymentCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrphanedPaymentCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrityCheck for OrphanedPaymentCheck {
    fn id(&self) -> &'static str {
        "orphaned_payments"
    }

    fn category(&self) -> IntegrityCategory {
        IntegrityCategory::OrphanedPayment
    }

    fn analyze(&self, snapshot: &LedgerSnapshot) -> Vec<IntegrityViolation> {
        let allocation_ids: HashSet<&str> =
            snapshot.allocations.iter().map(|a| a.id.as_str()).collect();

        let mut missing_call: Vec<&str> = Vec::new();
        let mut missing_allocation: Vec<&str> = Vec::new();
        for payment in &snapshot.payments {
            match snapshot
                .calls
                .iter()
                .find(|c| c.id == payment.capital_call_id)
            {
                None => missing_call.push(payment.id.as_str()),
                Some(call) if !allocation_ids.contains(call.allocation_id.as_str()) => {
                    missing_allocation.push(payment.id.as_str())
                }
                Some(_) => {}
            }
        }

        let mut violations = Vec::new();
        if !missing_call.is_empty() {
            violations.push(IntegrityViolation::new(
                IntegrityCategory::OrphanedPayment,
                Severity::Warning,
                None,
                format!("{} payments reference a missing capital call", missing_call.len()),
                serde_json::json!({ "paymentIds": missing_call, "missing": "capitalCall" }),
            ));
        }
        if !missing_allocation.is_empty() {
            violations.push(IntegrityViolation::new(
                IntegrityCategory::OrphanedPayment,
                Severity::Warning,
                None,
                format!(
                    "{} payments belong to a call whose allocation is missing",
                    missing_allocation.len()
                ),
                serde_json::json!({ "paymentIds": missing_allocation, "missing": "allocation" }),
            ));
        }
        violations
    }
}
