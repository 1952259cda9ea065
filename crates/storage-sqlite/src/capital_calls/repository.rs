use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use fundledger_core::capital_calls::{CapitalCall, CapitalCallRepositoryTrait};
use fundledger_core::db::DbPool;
use fundledger_core::money::Amount;
use fundledger_core::{Error, Result};

use super::model::CapitalCallDB;
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::schema::capital_calls;
use crate::schema::capital_calls::dsl::*;

pub struct CapitalCallRepository {
    pool: Arc<DbPool>,
}

impl CapitalCallRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        CapitalCallRepository { pool }
    }

    fn get_impl(call_id: &str, conn: &mut SqliteConnection) -> Result<CapitalCall> {
        let row = capital_calls
            .find(call_id)
            .first::<CapitalCallDB>(conn)
            .optional()
            .into_core()?
            .ok_or_else(|| Error::not_found("capital call", call_id))?;
        CapitalCall::try_from(row).into_core()
    }

    fn list_impl(owner: &str, conn: &mut SqliteConnection) -> Result<Vec<CapitalCall>> {
        let rows = capital_calls
            .filter(allocation_id.eq(owner))
            .order(call_date.asc())
            .load::<CapitalCallDB>(conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| CapitalCall::try_from(row).into_core())
            .collect()
    }
}

impl CapitalCallRepositoryTrait for CapitalCallRepository {
    fn get_by_id(&self, call_id: &str) -> Result<CapitalCall> {
        let mut conn = get_connection(&self.pool)?;
        Self::get_impl(call_id, &mut conn)
    }

    fn list_for_allocation(&self, owner: &str) -> Result<Vec<CapitalCall>> {
        let mut conn = get_connection(&self.pool)?;
        Self::list_impl(owner, &mut conn)
    }

    fn list_overdue(&self, as_of: NaiveDate) -> Result<Vec<CapitalCall>> {
        let mut conn = get_connection(&self.pool)?;
        // Amounts are TEXT columns, so the paid-vs-called comparison happens
        // in Rust after the date filter narrows the rows.
        let rows = capital_calls
            .filter(due_date.lt(as_of))
            .order(due_date.asc())
            .load::<CapitalCallDB>(&mut conn)
            .map_err(StorageError::from)?;
        let calls: Result<Vec<CapitalCall>> = rows
            .into_iter()
            .map(|row| CapitalCall::try_from(row).into_core())
            .collect();
        Ok(calls?.into_iter().filter(|c| c.is_open()).collect())
    }

    fn get_in_transaction(
        &self,
        call_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<CapitalCall> {
        Self::get_impl(call_id, conn)
    }

    fn list_for_allocation_in_transaction(
        &self,
        owner: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<CapitalCall>> {
        Self::list_impl(owner, conn)
    }

    fn find_by_idempotency_key_in_transaction(
        &self,
        key: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<CapitalCall>> {
        let row = capital_calls
            .filter(idempotency_key.eq(key))
            .first::<CapitalCallDB>(conn)
            .optional()
            .into_core()?;
        row.map(|r| CapitalCall::try_from(r).into_core()).transpose()
    }

    fn create_in_transaction(
        &self,
        call: CapitalCall,
        conn: &mut SqliteConnection,
    ) -> Result<CapitalCall> {
        let row = CapitalCallDB::from(&call);
        let inserted = diesel::insert_into(capital_calls::table)
            .values(&row)
            .returning(CapitalCallDB::as_returning())
            .get_result::<CapitalCallDB>(conn)
            .map_err(StorageError::from)?;
        CapitalCall::try_from(inserted).into_core()
    }

    fn update_paid_amount_in_transaction(
        &self,
        call_id: &str,
        paid: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(capital_calls.find(call_id))
            .set((
                paid_amount.eq(paid.to_string()),
                updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .into_core()?;
        Ok(())
    }
}
