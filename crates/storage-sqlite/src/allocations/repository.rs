use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use fundledger_core::allocations::{Allocation, AllocationRepositoryTrait};
use fundledger_core::db::DbPool;
use fundledger_core::money::Amount;
use fundledger_core::{Error, Result};

use super::model::AllocationDB;
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::schema::allocations;
use crate::schema::allocations::dsl::*;

pub struct AllocationRepository {
    pool: Arc<DbPool>,
}

impl AllocationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        AllocationRepository { pool }
    }

    fn get_impl(allocation_id: &str, conn: &mut SqliteConnection) -> Result<Allocation> {
        let row = allocations
            .find(allocation_id)
            .first::<AllocationDB>(conn)
            .optional()
            .into_core()?
            .ok_or_else(|| Error::not_found("allocation", allocation_id))?;
        Allocation::try_from(row).into_core()
    }
}

impl AllocationRepositoryTrait for AllocationRepository {
    fn get_by_id(&self, allocation_id: &str) -> Result<Allocation> {
        let mut conn = get_connection(&self.pool)?;
        Self::get_impl(allocation_id, &mut conn)
    }

    fn list(&self, fund_id_filter: Option<&str>) -> Result<Vec<Allocation>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = allocations.into_boxed();
        if let Some(fund) = fund_id_filter {
            query = query.filter(fund_id.eq(fund));
        }
        let rows = query
            .order(created_at.asc())
            .load::<AllocationDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| Allocation::try_from(row).into_core())
            .collect()
    }

    fn get_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Allocation> {
        Self::get_impl(allocation_id, conn)
    }

    fn find_by_fund_and_deal_in_transaction(
        &self,
        fund: &str,
        deal: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Allocation>> {
        let row = allocations
            .filter(fund_id.eq(fund))
            .filter(deal_id.eq(deal))
            .first::<AllocationDB>(conn)
            .optional()
            .into_core()?;
        row.map(|r| Allocation::try_from(r).into_core()).transpose()
    }

    fn create_in_transaction(
        &self,
        allocation: Allocation,
        conn: &mut SqliteConnection,
    ) -> Result<Allocation> {
        let row = AllocationDB::from(&allocation);
        let inserted = diesel::insert_into(allocations::table)
            .values(&row)
            .returning(AllocationDB::as_returning())
            .get_result::<AllocationDB>(conn)
            .map_err(StorageError::from)?;
        Allocation::try_from(inserted).into_core()
    }

    fn update_aggregates_in_transaction(
        &self,
        allocation_id: &str,
        called: Amount,
        funded: Amount,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(allocations.find(allocation_id))
            .set((
                called_amount.eq(called.to_string()),
                funded_amount.eq(funded.to_string()),
                updated_at.eq(Utc::now().naive_utc()),
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
        diesel::update(allocations.find(allocation_id))
            .set((
                committed_amount.eq(committed.to_string()),
                updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .into_core()?;
        Ok(())
    }

    fn set_written_off_in_transaction(
        &self,
        allocation_id: &str,
        when: NaiveDateTime,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(allocations.find(allocation_id))
            .set((written_off_at.eq(Some(when)), updated_at.eq(when)))
            .execute(conn)
            .into_core()?;
        Ok(())
    }

    fn delete_in_transaction(
        &self,
        allocation_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<()> {
        // Calls and payments cascade via foreign keys.
        let affected = diesel::delete(allocations.find(allocation_id))
            .execute(conn)
            .into_core()?;
        if affected == 0 {
            return Err(Error::not_found("allocation", allocation_id));
        }
        Ok(())
    }
}
