use std::sync::Arc;

use diesel::prelude::*;
use diesel::SqliteConnection;

use fundledger_core::db::DbPool;
use fundledger_core::payments::{Payment, PaymentRepositoryTrait};
use fundledger_core::{Error, Result};

use super::model::PaymentDB;
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::schema::payments;
use crate::schema::payments::dsl::*;

pub struct PaymentRepository {
    pool: Arc<DbPool>,
}

impl PaymentRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        PaymentRepository { pool }
    }

    fn get_impl(payment_id: &str, conn: &mut SqliteConnection) -> Result<Payment> {
        let row = payments
            .find(payment_id)
            .first::<PaymentDB>(conn)
            .optional()
            .into_core()?
            .ok_or_else(|| Error::not_found("payment", payment_id))?;
        Payment::try_from(row).into_core()
    }

    fn list_impl(call_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Payment>> {
        let rows = payments
            .filter(capital_call_id.eq(call_id))
            .order(created_at.asc())
            .load::<PaymentDB>(conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| Payment::try_from(row).into_core())
            .collect()
    }
}

impl PaymentRepositoryTrait for PaymentRepository {
    fn get_by_id(&self, payment_id: &str) -> Result<Payment> {
        let mut conn = get_connection(&self.pool)?;
        Self::get_impl(payment_id, &mut conn)
    }

    fn list_for_call(&self, call_id: &str) -> Result<Vec<Payment>> {
        let mut conn = get_connection(&self.pool)?;
        Self::list_impl(call_id, &mut conn)
    }

    fn get_in_transaction(
        &self,
        payment_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Payment> {
        Self::get_impl(payment_id, conn)
    }

    fn list_for_call_in_transaction(
        &self,
        call_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Payment>> {
        Self::list_impl(call_id, conn)
    }

    fn find_by_idempotency_key_in_transaction(
        &self,
        key: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Payment>> {
        let row = payments
            .filter(idempotency_key.eq(key))
            .first::<PaymentDB>(conn)
            .optional()
            .into_core()?;
        row.map(|r| Payment::try_from(r).into_core()).transpose()
    }

    fn create_in_transaction(
        &self,
        payment: Payment,
        conn: &mut SqliteConnection,
    ) -> Result<Payment> {
        let row = PaymentDB::from(&payment);
        let inserted = diesel::insert_into(payments::table)
            .values(&row)
            .returning(PaymentDB::as_returning())
            .get_result::<PaymentDB>(conn)
            .map_err(StorageError::from)?;
        Payment::try_from(inserted).into_core()
    }
}
