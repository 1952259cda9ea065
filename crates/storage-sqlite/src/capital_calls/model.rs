//! Database models for capital calls.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use fundledger_core::capital_calls::CapitalCall;

use crate::allocations::AllocationDB;
use crate::conversion::parse_amount;
use crate::errors::StorageError;

/// Database model for capital calls.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Associations,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(AllocationDB, foreign_key = allocation_id))]
#[diesel(table_name = crate::schema::capital_calls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct CapitalCallDB {
    pub id: String,
    pub allocation_id: String,
    pub call_amount: String,
    pub paid_amount: String,
    pub call_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<CapitalCallDB> for CapitalCall {
    type Error = StorageError;

    fn try_from(db: CapitalCallDB) -> Result<Self, Self::Error> {
        Ok(CapitalCall {
            call_amount: parse_amount("call_amount", &db.call_amount)?,
            paid_amount: parse_amount("paid_amount", &db.paid_amount)?,
            id: db.id,
            allocation_id: db.allocation_id,
            call_date: db.call_date,
            due_date: db.due_date,
            notes: db.notes,
            idempotency_key: db.idempotency_key,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<&CapitalCall> for CapitalCallDB {
    fn from(domain: &CapitalCall) -> Self {
        Self {
            id: domain.id.clone(),
            allocation_id: domain.allocation_id.clone(),
            call_amount: domain.call_amount.to_string(),
            paid_amount: domain.paid_amount.to_string(),
            call_date: domain.call_date,
            due_date: domain.due_date,
            notes: domain.notes.clone(),
            idempotency_key: domain.idempotency_key.clone(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}
