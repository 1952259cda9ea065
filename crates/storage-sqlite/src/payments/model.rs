//! Database models for payments.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use fundledger_core::payments::{Payment, PaymentKind};

use crate::capital_calls::CapitalCallDB;
use crate::conversion::parse_amount;
use crate::errors::StorageError;

const KIND_PAYMENT: &str = "PAYMENT";
const KIND_REVERSAL: &str = "REVERSAL";

/// Database model for payments.
///
/// Rows are append-only: there is no `AsChangeset` derive because payments
/// and reversals are never edited in place.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Associations,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(CapitalCallDB, foreign_key = capital_call_id))]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PaymentDB {
    pub id: String,
    pub capital_call_id: String,
    pub amount: String,
    pub payment_date: NaiveDate,
    pub kind: String,
    pub reverses_payment_id: Option<String>,
    pub tx_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: NaiveDateTime,
}

fn parse_kind(value: &str) -> Result<PaymentKind, StorageError> {
    match value {
        KIND_PAYMENT => Ok(PaymentKind::Payment),
        KIND_REVERSAL => Ok(PaymentKind::Reversal),
        other => Err(StorageError::SerializationError(format!(
            "unknown payment kind '{other}'"
        ))),
    }
}

fn kind_str(kind: PaymentKind) -> &'static str {
    match kind {
        PaymentKind::Payment => KIND_PAYMENT,
        PaymentKind::Reversal => KIND_REVERSAL,
    }
}

impl TryFrom<PaymentDB> for Payment {
    type Error = StorageError;

    fn try_from(db: PaymentDB) -> Result<Self, Self::Error> {
        Ok(Payment {
            amount: parse_amount("amount", &db.amount)?,
            kind: parse_kind(&db.kind)?,
            id: db.id,
            capital_call_id: db.capital_call_id,
            payment_date: db.payment_date,
            reverses_payment_id: db.reverses_payment_id,
            tx_ref: db.tx_ref,
            idempotency_key: db.idempotency_key,
            created_at: db.created_at,
        })
    }
}

impl From<&Payment> for PaymentDB {
    fn from(domain: &Payment) -> Self {
        Self {
            id: domain.id.clone(),
            capital_call_id: domain.capital_call_id.clone(),
            amount: domain.amount.to_string(),
            payment_date: domain.payment_date,
            kind: kind_str(domain.kind).to_string(),
            reverses_payment_id: domain.reverses_payment_id.clone(),
            tx_ref: domain.tx_ref.clone(),
            idempotency_key: domain.idempotency_key.clone(),
            created_at: domain.created_at,
        }
    }
}
