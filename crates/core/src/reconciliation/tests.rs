use std::sync::{Arc, Mutex};

use chrono::Utc;
use diesel::sqlite::SqliteConnection;
use rust_decimal_macros::dec;

use super::model::IntegrityCategory;
use super::service::IntegrityService;
use super::traits::{IntegrityRepositoryTrait, IntegrityServiceTrait, LedgerSnapshot};
use crate::allocations::Allocation;
use crate::capital_calls::CapitalCall;
use crate::db::MockTransactionExecutor;
use crate::events::{DomainEvent, MockDomainEventSink};
use crate::money::Amount;
use crate::payments::{Payment, PaymentKind};
use crate::Error;

/// In-memory ledger backing the integrity repository contract.
#[derive(Clone, Default)]
struct MockIntegrityRepository {
    state: Arc<Mutex<LedgerSnapshot>>,
}

impl MockIntegrityRepository {
    fn new(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
        }
    }

    fn allocation(&self, id: &str) -> Option<Allocation> {
        self.state
            .lock()
            .unwrap()
            .allocations
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }
}

impl IntegrityRepositoryTrait for MockIntegrityRepository {
    fn load_snapshot(&self) -> crate::Result<LedgerSnapshot> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn calls_for_allocation_in_transaction(
        &self,
        allocation_id: &str,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<Vec<CapitalCall>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.allocation_id == allocation_id)
            .cloned()
            .collect())
    }

    fn payments_for_call_in_transaction(
        &self,
        capital_call_id: &str,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<Vec<Payment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payments
            .iter()
            .filter(|p| p.capital_call_id == capital_call_id)
            .cloned()
            .collect())
    }

    fn update_aggregates_in_transaction(
        &self,
        allocation_id: &str,
        called: Amount,
        funded: Amount,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        let allocation = state
            .allocations
            .iter_mut()
            .find(|a| a.id == allocation_id)
            .ok_or_else(|| Error::not_found("Allocation", allocation_id))?;
        allocation.called_amount = called;
        allocation.funded_amount = funded;
        Ok(())
    }

    fn update_call_paid_in_transaction(
        &self,
        call_id: &str,
        paid: Amount,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        let call = state
            .calls
            .iter_mut()
            .find(|c| c.id == call_id)
            .ok_or_else(|| Error::not_found("Capital call", call_id))?;
        call.paid_amount = paid;
        Ok(())
    }

    fn repoint_calls_in_transaction(
        &self,
        from_allocation_id: &str,
        to_allocation_id: &str,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        for call in state
            .calls
            .iter_mut()
            .filter(|c| c.allocation_id == from_allocation_id)
        {
            call.allocation_id = to_allocation_id.to_string();
        }
        Ok(())
    }

    fn set_committed_amount_in_transaction(
        &self,
        allocation_id: &str,
        committed: Amount,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        let allocation = state
            .allocations
            .iter_mut()
            .find(|a| a.id == allocation_id)
            .ok_or_else(|| Error::not_found("Allocation", allocation_id))?;
        allocation.committed_amount = committed;
        Ok(())
    }

    fn delete_allocation_in_transaction(
        &self,
        allocation_id: &str,
        _conn: &mut SqliteConnection,
    ) -> crate::Result<()> {
        self.state
            .lock()
            .unwrap()
            .allocations
            .retain(|a| a.id != allocation_id);
        Ok(())
    }
}

fn allocation(id: &str, fund: &str, deal: &str, committed: &str, called: &str, funded: &str) -> Allocation {
    let now = Utc::now().naive_utc();
    Allocation {
        id: id.to_string(),
        fund_id: fund.to_string(),
        deal_id: deal.to_string(),
        committed_amount: committed.parse().unwrap(),
        called_amount: called.parse().unwrap(),
        funded_amount: funded.parse().unwrap(),
        security_type: None,
        portfolio_weight: None,
        notes: None,
        written_off_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn call(id: &str, allocation_id: &str, amount: &str, paid: &str) -> CapitalCall {
    let now = Utc::now().naive_utc();
    CapitalCall {
        id: id.to_string(),
        allocation_id: allocation_id.to_string(),
        call_amount: amount.parse().unwrap(),
        paid_amount: paid.parse().unwrap(),
        call_date: "2026-01-10".parse().unwrap(),
        due_date: "2026-02-10".parse().unwrap(),
        notes: None,
        idempotency_key: None,
        created_at: now,
        updated_at: now,
    }
}

fn payment(id: &str, call_id: &str, amount: &str) -> Payment {
    Payment {
        id: id.to_string(),
        capital_call_id: call_id.to_string(),
        amount: amount.parse().unwrap(),
        payment_date: "2026-01-20".parse().unwrap(),
        kind: PaymentKind::Payment,
        reverses_payment_id: None,
        tx_ref: None,
        idempotency_key: None,
        created_at: Utc::now().naive_utc(),
    }
}

fn service(
    repository: MockIntegrityRepository,
    sink: MockDomainEventSink,
) -> IntegrityService<MockTransactionExecutor> {
    IntegrityService::new(Arc::new(repository), Arc::new(sink), MockTransactionExecutor)
}

fn amt(v: rust_decimal::Decimal) -> Amount {
    Amount::new(v).unwrap()
}

#[tokio::test]
async fn test_report_on_clean_ledger() {
    let repository = MockIntegrityRepository::new(LedgerSnapshot {
        allocations: vec![allocation("a1", "fund-1", "acme", "1000000", "400000", "150000")],
        calls: vec![call("c1", "a1", "400000", "150000")],
        payments: vec![payment("p1", "c1", "150000")],
    });
    let service = service(repository, MockDomainEventSink::new());

    let report = service.report().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.allocations_checked, 1);
}

#[tokio::test]
async fn test_report_does_not_mutate() {
    let repository = MockIntegrityRepository::new(LedgerSnapshot {
        allocations: vec![allocation("a1", "fund-1", "acme", "1000000", "999", "0")],
        calls: vec![call("c1", "a1", "400000", "150000")],
        payments: vec![payment("p1", "c1", "150000")],
    });
    let service = service(repository.clone(), MockDomainEventSink::new());

    let report = service.report().await.unwrap();
    assert_eq!(report.count_for(IntegrityCategory::AggregateDrift), 1);
    // Dry run: the drifted cache is still drifted.
    assert_eq!(
        repository.allocation("a1").unwrap().called_amount,
        amt(dec!(999))
    );
}

#[tokio::test]
async fn test_repair_overwrites_drifted_caches() {
    let repository = MockIntegrityRepository::new(LedgerSnapshot {
        allocations: vec![allocation("a1", "fund-1", "acme", "1000000", "999", "0")],
        calls: vec![call("c1", "a1", "400000", "0")],
        payments: vec![payment("p1", "c1", "150000")],
    });
    let sink = MockDomainEventSink::new();
    let service = service(repository.clone(), sink.clone());

    let summary = service.repair().await.unwrap();
    assert_eq!(summary.drift_repaired, vec!["a1"]);
    assert!(summary.remaining.is_empty());

    let repaired = repository.allocation("a1").unwrap();
    assert_eq!(repaired.called_amount, amt(dec!(400000)));
    assert_eq!(repaired.funded_amount, amt(dec!(150000)));
    assert!(matches!(
        &sink.events()[0],
        DomainEvent::IntegrityRepaired { repair_count: 1, .. }
    ));

    // Idempotent: the second run finds nothing.
    let summary = service.repair().await.unwrap();
    assert_eq!(summary.repair_count(), 0);
    assert_eq!(sink.len(), 1);
    assert!(service.report().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_repair_merges_duplicates_into_lowest_id() {
    let repository = MockIntegrityRepository::new(LedgerSnapshot {
        allocations: vec![
            allocation("a7", "fund-1", "acme", "600000", "200000", "0"),
            allocation("a2", "fund-1", "acme", "400000", "100000", "0"),
        ],
        calls: vec![call("c1", "a7", "200000", "0"), call("c2", "a2", "100000", "0")],
        payments: vec![],
    });
    let service = service(repository.clone(), MockDomainEventSink::new());

    let summary = service.repair().await.unwrap();
    assert_eq!(summary.duplicates_merged, vec!["a2"]);

    // The survivor carries the summed commitment and both calls.
    assert!(repository.allocation("a7").is_none());
    let survivor = repository.allocation("a2").unwrap();
    assert_eq!(survivor.committed_amount, amt(dec!(1000000)));
    assert_eq!(survivor.called_amount, amt(dec!(300000)));

    let report = service.report().await.unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_orphaned_payments_survive_repair() {
    let repository = MockIntegrityRepository::new(LedgerSnapshot {
        allocations: vec![allocation("a1", "fund-1", "acme", "1000000", "400000", "150000")],
        calls: vec![call("c1", "a1", "400000", "150000")],
        payments: vec![payment("p1", "c1", "150000"), payment("p2", "ghost", "5000")],
    });
    let service = service(repository.clone(), MockDomainEventSink::new());

    let summary = service.repair().await.unwrap();
    assert_eq!(summary.remaining.len(), 1);
    assert_eq!(
        summary.remaining[0].category,
        IntegrityCategory::OrphanedPayment
    );
    // Money records are never silently deleted.
    assert_eq!(repository.load_snapshot().unwrap().payments.len(), 2);
}
