//! Database models for allocations.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use fundledger_core::allocations::Allocation;

use crate::conversion::{parse_amount, parse_decimal};
use crate::errors::StorageError;

/// Database model for allocations.
///
/// Amount columns are decimal strings; `TryFrom` parses them back into
/// `Amount` and fails on corrupted rows instead of guessing.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::allocations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct AllocationDB {
    pub id: String,
    pub fund_id: String,
    pub deal_id: String,
    pub committed_amount: String,
    pub called_amount: String,
    pub funded_amount: String,
    pub security_type: Option<String>,
    pub portfolio_weight: Option<String>,
    pub notes: Option<String>,
    pub written_off_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<AllocationDB> for Allocation {
    type Error = StorageError;

    fn try_from(db: AllocationDB) -> Result<Self, Self::Error> {
        Ok(Allocation {
            committed_amount: parse_amount("committed_amount", &db.committed_amount)?,
            called_amount: parse_amount("called_amount", &db.called_amount)?,
            funded_amount: parse_amount("funded_amount", &db.funded_amount)?,
            portfolio_weight: db
                .portfolio_weight
                .as_deref()
                .map(|w| parse_decimal("portfolio_weight", w))
                .transpose()?,
            id: db.id,
            fund_id: db.fund_id,
            deal_id: db.deal_id,
            security_type: db.security_type,
            notes: db.notes,
            written_off_at: db.written_off_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<&Allocation> for AllocationDB {
    fn from(domain: &Allocation) -> Self {
        Self {
            id: domain.id.clone(),
            fund_id: domain.fund_id.clone(),
            deal_id: domain.deal_id.clone(),
            committed_amount: domain.committed_amount.to_string(),
            called_amount: domain.called_amount.to_string(),
            funded_amount: domain.funded_amount.to_string(),
            security_type: domain.security_type.clone(),
            portfolio_weight: domain.portfolio_weight.map(|w| w.to_string()),
            notes: domain.notes.clone(),
            written_off_at: domain.written_off_at,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}
