use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use super::payments_model::{NewPayment, Payment, PaymentOutcome};
use crate::money::Amount;
use crate::Result;

/// Trait defining the contract for payment repository operations.
pub trait PaymentRepositoryTrait: Send + Sync {
    fn get_by_id(&self, payment_id: &str) -> Result<Payment>;
    fn list_for_call(&self, capital_call_id: &str) -> Result<Vec<Payment>>;

    fn get_in_transaction(
        &self,
        payment_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Payment>;
    fn list_for_call_in_transaction(
        &self,
        capital_call_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Payment>>;
    fn find_by_idempotency_key_in_transaction(
        &self,
        key: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Payment>>;
    fn create_in_transaction(
        &self,
        payment: Payment,
        conn: &mut SqliteConnection,
    ) -> Result<Payment>;
}

/// Trait defining the contract for payment service operations.
#[async_trait]
pub trait PaymentServiceTrait: Send + Sync {
    /// PAYMENT_RECEIVED: records a transfer against a specific call,
    /// atomically with the call and allocation aggregate updates. Fails when
    /// the call does not exist or the payment would exceed its outstanding
    /// balance.
    async fn record_payment(&self, new_payment: NewPayment) -> Result<PaymentOutcome>;

    /// Records an offsetting reversal against an earlier payment. The
    /// original row is never edited.
    async fn reverse_payment(
        &self,
        payment_id: &str,
        amount: Amount,
        reason: &str,
    ) -> Result<PaymentOutcome>;

    fn get_payment(&self, payment_id: &str) -> Result<Payment>;
    fn get_payments_for_call(&self, capital_call_id: &str) -> Result<Vec<Payment>>;
}
