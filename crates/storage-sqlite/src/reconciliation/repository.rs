use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;

use fundledger_core::allocations::Allocation;
use fundledger_core::capital_calls::CapitalCall;
use fundledger_core::db::DbPool;
use fundledger_core::money::Amount;
use fundledger_core::payments::Payment;
use fundledger_core::reconciliation::{IntegrityRepositoryTrait, LedgerSnapshot};
use fundledger_core::{Error, Result};

use crate::allocations::AllocationDB;
use crate::capital_calls::CapitalCallDB;
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::payments::PaymentDB;
use crate::schema::{allocations, capital_calls, payments};

pub struct IntegrityRepository {
    pool: Arc<DbPool>,
}

impl IntegrityRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        IntegrityRepository { pool }
    }
}

impl IntegrityRepositoryTrait for IntegrityRepository {
    fn load_snapshot(&self) -> Result<LedgerSnapshot> {
        let mut conn = get_connection(&self.pool)?;

        let allocation_rows = allocations::table
            .load::<AllocationDB>(&mut conn)
            .map_err(StorageError::from)?;
        let call_rows = capital_calls::table
            .load::<CapitalCallDB>(&mut conn)
            .map_err(StorageError::from)?;
        let payment_rows = payments::table
            .load::<PaymentDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(LedgerSnapshot {
            allocations: allocation_rows
                .into_iter()
                .map(|r| Allocation::try_from(r).into_core())
                .collect::<Result<Vec<_>>>()?,
            calls: call_rows
                .into_iter()
                .map(|r| CapitalCall::try_from(r).into_core())
                .collect::<Result<Vec<_>>>()?,
            payments: payment_rows
                .into_iter()
                .map(|r| Payment::try_from(r).into_core())
                .collect::<Result<Vec<_>>>()?,
        })
    }

    fn calls_for_allocation_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<CapitalCall>> {
        let rows = capital_calls::table
            .filter(capital_calls::allocation_id.eq(allocation_id))
            .load::<CapitalCallDB>(conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|r| CapitalCall::try_from(r).into_core())
            .collect()
    }

    fn payments_for_call_in_transaction(
        &self,
        capital_call_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Payment>> {
        let rows = payments::table
            .filter(payments::capital_call_id.eq(capital_call_id))
            .load::<PaymentDB>(conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|r| Payment::try_from(r).into_core())
            .collect()
    }

    fn update_aggregates_in_transaction(
        &self,
        allocation_id: &str,
        called: Amount,
        funded: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(allocations::table.find(allocation_id))
            .set((
                allocations::called_amount.eq(called.to_string()),
                allocations::funded_amount.eq(funded.to_string()),
                allocations::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .into_core()?;
        Ok(())
    }

    fn update_call_paid_in_transaction(
        &self,
        call_id: &str,
        paid: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(capital_calls::table.find(call_id))
            .set((
                capital_calls::paid_amount.eq(paid.to_string()),
                capital_calls::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .into_core()?;
        Ok(())
    }

    fn repoint_calls_in_transaction(
        &self,
        from_allocation_id: &str,
        to_allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(
            capital_calls::table.filter(capital_calls::allocation_id.eq(from_allocation_id)),
        )
        .set((
            capital_calls::allocation_id.eq(to_allocation_id),
            capital_calls::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .into_core()?;
        Ok(())
    }

    fn set_committed_amount_in_transaction(
        &self,
        allocation_id: &str,
        committed: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(allocations::table.find(allocation_id))
            .set((
                allocations::committed_amount.eq(committed.to_string()),
                allocations::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .into_core()?;
        Ok(())
    }

    fn delete_allocation_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        let affected = diesel::delete(allocations::table.find(allocation_id))
            .execute(conn)
            .into_core()?;
        if affected == 0 {
            return Err(Error::not_found("allocation", allocation_id));
        }
        Ok(())
    }
}
