//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::lifecycle::AllocationStatus;

/// Domain events emitted by core services after successful mutations.
///
/// These events represent facts about ledger changes. Runtime adapters
/// translate them into platform-specific actions (deal-stage updates,
/// dashboard refresh, notifications).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// An allocation was created, adjusted, written off, or deleted.
    AllocationsChanged {
        allocation_ids: Vec<String>,
        fund_ids: Vec<String>,
    },

    /// A capital call was issued; allocation aggregates were recomputed.
    CapitalCallsChanged {
        allocation_id: String,
        call_ids: Vec<String>,
        status: AllocationStatus,
    },

    /// A payment (or reversal) was recorded against a call.
    PaymentsChanged {
        allocation_id: String,
        capital_call_id: String,
        payment_ids: Vec<String>,
        status: AllocationStatus,
    },

    /// A commitment was explicitly adjusted (audited event).
    CommitmentAdjusted {
        allocation_id: String,
        old_amount: String,
        new_amount: String,
        reason: String,
    },

    /// The reconciliation engine repaired ledger data.
    IntegrityRepaired {
        allocation_ids: Vec<String>,
        repair_count: u32,
    },
}

impl DomainEvent {
    /// Creates an AllocationsChanged event.
    pub fn allocations_changed(allocation_ids: Vec<String>, fund_ids: Vec<String>) -> Self {
        Self::AllocationsChanged {
            allocation_ids,
            fund_ids,
        }
    }

    /// Creates a CapitalCallsChanged event.
    pub fn capital_calls_changed(
        allocation_id: String,
        call_ids: Vec<String>,
        status: AllocationStatus,
    ) -> Self {
        Self::CapitalCallsChanged {
            allocation_id,
            call_ids,
            status,
        }
    }

    /// Creates a PaymentsChanged event.
    pub fn payments_changed(
        allocation_id: String,
        capital_call_id: String,
        payment_ids: Vec<String>,
        status: AllocationStatus,
    ) -> Self {
        Self::PaymentsChanged {
            allocation_id,
            capital_call_id,
            payment_ids,
            status,
        }
    }

    /// Creates an IntegrityRepaired event.
    pub fn integrity_repaired(allocation_ids: Vec<String>, repair_count: u32) -> Self {
        Self::IntegrityRepaired {
            allocation_ids,
            repair_count,
        }
    }
}
