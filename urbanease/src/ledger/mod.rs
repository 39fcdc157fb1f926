//! Double-entry payment recording.
//!
//! Every money movement is written as a set of legs sharing one `transaction_id`, and the signed
//! sum (`transaction_code * amount_paid`) over those legs is always zero:
//!
//! - a single payment ([`record_payment`]) writes a payer leg and an opposite treasury leg
//! - bulk billing ([`bill_residents`]) writes one debit leg per resident and a single aggregate
//!   credit leg for the account raising the charge
//!
//! Planning is pure: [`plan_single_payment`] and [`plan_bulk_billing`] turn a validated
//! instruction into a [`LedgerPosting`], and the store writes that posting as one atomic unit.
//! The transaction id is allocated before the posting is written, so a failure can be reported
//! against it. A failed posting leaves no legs behind; its identifier is simply never used.

use crate::api::models::{
    MAX_AMOUNT,
    payments::{PaymentStatus, TransactionCode},
};
use crate::db::{
    errors::DbError,
    models::{
        payments::{LedgerPosting, PaymentCreateDBRequest, PaymentDBResponse, PaymentFilter},
        sequences::SequenceKind,
        users::{ResidentFilter, UserFilter},
    },
    store::Store,
};
use crate::metrics;
use crate::types::{BillId, UserId, abbrev_uuid};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found")]
    UnknownAccount { account: UserId },

    #[error("Bill not found")]
    UnknownBill { bill_id: BillId },

    #[error("Amount must be greater than zero, at most 999999999999.99, with at most two decimal places")]
    InvalidAmount { amount: Decimal },

    #[error("Invalid transaction code {code}, expected 1 or -1")]
    InvalidDirection { code: i32 },

    #[error("Residents not found")]
    NoResidents { filter: ResidentFilter },

    #[error("Bill does not belong to this account")]
    BillMismatch { bill_id: BillId, account: UserId },

    /// The store rejected the posting; nothing was written.
    #[error("Failed to post transaction {transaction_id}: {source}")]
    PostingFailed {
        transaction_id: String,
        #[source]
        source: DbError,
    },

    /// A lookup made while preparing a posting failed
    #[error(transparent)]
    Storage(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A payment between one account and the treasury.
#[derive(Debug, Clone)]
pub struct PaymentInstruction {
    pub payer: UserId,
    pub amount: Decimal,
    pub payment_method: String,
    /// `1` when the payer pays, `-1` when the payer is charged
    pub direction: i32,
    pub payment_for: String,
    pub description: Option<String>,
    pub bill_id: Option<BillId>,
}

/// One charge fanned out to every resident matching `filter`.
#[derive(Debug, Clone)]
pub struct BulkBillingInstruction {
    pub initiator: UserId,
    /// Charged to each resident
    pub amount: Decimal,
    pub payment_method: String,
    pub filter: ResidentFilter,
    pub payment_for: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    /// Payer leg first, then the treasury leg
    pub legs: Vec<PaymentDBResponse>,
}

#[derive(Debug, Clone)]
pub struct BulkBillingReceipt {
    pub transaction_id: String,
    pub residents_billed: usize,
    /// Amount of the aggregate credit leg
    pub total_amount: Decimal,
    pub legs: Vec<PaymentDBResponse>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub account: UserId,
    /// Sum of the account's debit legs
    pub total_charges: Decimal,
    /// Sum of the account's credit legs
    pub total_payments: Decimal,
    /// Positive when the account owes money
    pub balance: Decimal,
    pub entries: Vec<PaymentDBResponse>,
}

/// Reference shared by every leg of a transaction: `{initiatorId}_{payment_for}_{amount}`.
pub fn reference(initiator: UserId, payment_for: &str, amount: Decimal) -> String {
    format!("{initiator}_{payment_for}_{amount}")
}

/// True when the signed amounts of the legs cancel out.
pub fn transaction_is_balanced(legs: &[PaymentCreateDBRequest]) -> bool {
    legs.iter()
        .map(|leg| leg.transaction_code.signed(leg.amount_paid))
        .sum::<Decimal>()
        .is_zero()
}

fn check_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO || amount > MAX_AMOUNT || amount.normalize().scale() > 2 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Amount of the aggregate credit leg; it has to fit a money column like any other leg.
pub fn bulk_total(amount: Decimal, residents: usize) -> Result<Decimal> {
    amount
        .checked_mul(Decimal::from(residents))
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or(LedgerError::InvalidAmount { amount })
}

fn check_direction(code: i32) -> Result<TransactionCode> {
    TransactionCode::try_from(code).map_err(|_| LedgerError::InvalidDirection { code })
}

/// Status recorded on a leg. Payer legs use `PAID` for money in; counter legs (the treasury, or
/// the biller in bulk billing) use `CREDITED` for money in. Any money out is `DEBITED`.
fn status_for(code: TransactionCode, counter_leg: bool) -> PaymentStatus {
    match (code, counter_leg) {
        (TransactionCode::Debit, _) => PaymentStatus::Debited,
        (TransactionCode::Credit, false) => PaymentStatus::Paid,
        (TransactionCode::Credit, true) => PaymentStatus::Credited,
    }
}

/// Build the two legs of a single payment.
///
/// The payer leg carries `direction` and the bill reference; the treasury leg carries the
/// opposite code. A resident paying (`Credit`) against a bill asks the store to settle it.
pub fn plan_single_payment(
    transaction_id: String,
    treasury: UserId,
    payment: &PaymentInstruction,
    direction: TransactionCode,
) -> LedgerPosting {
    let reference = reference(payment.payer, &payment.payment_for, payment.amount);
    let leg = |account: UserId, bill_id: Option<BillId>, code: TransactionCode| PaymentCreateDBRequest {
        account,
        bill_id,
        amount_paid: payment.amount,
        payment_method: payment.payment_method.clone(),
        transaction_code: code,
        status: status_for(code, account != payment.payer),
        payment_for: payment.payment_for.clone(),
        reference: reference.clone(),
        transaction_id: transaction_id.clone(),
        description: payment.description.clone(),
    };

    let legs = vec![
        leg(payment.payer, payment.bill_id, direction),
        leg(treasury, None, direction.opposite()),
    ];

    LedgerPosting {
        settle_bill: payment.bill_id.filter(|_| direction == TransactionCode::Credit),
        transaction_id,
        legs,
    }
}

/// Build one debit leg per resident plus the aggregate credit leg for the initiator.
pub fn plan_bulk_billing(transaction_id: String, billing: &BulkBillingInstruction, residents: &[UserId]) -> Result<LedgerPosting> {
    let reference = reference(billing.initiator, &billing.payment_for, billing.amount);
    let leg = |account: UserId, amount: Decimal, code: TransactionCode, counter_leg: bool| PaymentCreateDBRequest {
        account,
        bill_id: None,
        amount_paid: amount,
        payment_method: billing.payment_method.clone(),
        transaction_code: code,
        status: status_for(code, counter_leg),
        payment_for: billing.payment_for.clone(),
        reference: reference.clone(),
        transaction_id: transaction_id.clone(),
        description: billing.description.clone(),
    };

    let total = bulk_total(billing.amount, residents.len())?;
    let mut legs: Vec<_> = residents
        .iter()
        .map(|resident| leg(*resident, billing.amount, TransactionCode::Debit, false))
        .collect();
    legs.push(leg(billing.initiator, total, TransactionCode::Credit, true));

    Ok(LedgerPosting {
        transaction_id,
        legs,
        settle_bill: None,
    })
}

async fn post(store: &dyn Store, posting: LedgerPosting) -> Result<Vec<PaymentDBResponse>> {
    debug_assert!(transaction_is_balanced(&posting.legs));

    match store.post_transaction(&posting).await {
        Ok(posted) => {
            metrics::record_legs_written(posted.legs.iter().map(|leg| &leg.status));
            Ok(posted.legs)
        }
        Err(source) => {
            metrics::record_posting_failure();
            warn!(transaction_id = %posting.transaction_id, "Ledger posting rolled back: {}", source);
            Err(LedgerError::PostingFailed {
                transaction_id: posting.transaction_id,
                source,
            })
        }
    }
}

/// Record a payment between `payment.payer` and the treasury account.
#[instrument(skip(store, payment), fields(payer = %abbrev_uuid(&payment.payer), amount = %payment.amount), err)]
pub async fn record_payment(store: &dyn Store, treasury: UserId, payment: PaymentInstruction) -> Result<PaymentReceipt> {
    check_amount(payment.amount)?;
    let direction = check_direction(payment.direction)?;

    if store.get_user(payment.payer).await?.is_none() {
        return Err(LedgerError::UnknownAccount { account: payment.payer });
    }

    if let Some(bill_id) = payment.bill_id {
        let bill = store.get_bill(bill_id).await?.ok_or(LedgerError::UnknownBill { bill_id })?;
        if bill.user_id != payment.payer {
            return Err(LedgerError::BillMismatch {
                bill_id,
                account: payment.payer,
            });
        }
    }

    let transaction_id = store.next_sequence_id(SequenceKind::Payment).await?;
    let posting = plan_single_payment(transaction_id.clone(), treasury, &payment, direction);
    let legs = post(store, posting).await?;

    info!(%transaction_id, "Recorded payment");
    Ok(PaymentReceipt { transaction_id, legs })
}

/// Charge every resident matching the filter and credit the total to the initiator.
///
/// Two identical calls produce two independent transactions.
#[instrument(skip(store, billing), fields(initiator = %abbrev_uuid(&billing.initiator), filter = %billing.filter), err)]
pub async fn bill_residents(store: &dyn Store, billing: BulkBillingInstruction) -> Result<BulkBillingReceipt> {
    check_amount(billing.amount)?;

    if store.get_user(billing.initiator).await?.is_none() {
        return Err(LedgerError::UnknownAccount {
            account: billing.initiator,
        });
    }

    let residents: Vec<UserId> = store
        .list_users(&UserFilter::residents(billing.filter))
        .await?
        .into_iter()
        .map(|user| user.id)
        .collect();
    if residents.is_empty() {
        return Err(LedgerError::NoResidents { filter: billing.filter });
    }

    let total_amount = bulk_total(billing.amount, residents.len())?;

    let transaction_id = store.next_sequence_id(SequenceKind::Bill).await?;
    let posting = plan_bulk_billing(transaction_id.clone(), &billing, &residents)?;
    let legs = post(store, posting).await?;

    metrics::record_bulk_billing();
    info!(%transaction_id, residents = residents.len(), %total_amount, "Billed residents");

    Ok(BulkBillingReceipt {
        transaction_id,
        residents_billed: residents.len(),
        total_amount,
        legs,
    })
}

/// All legs of one account in creation order, with charge and payment totals.
#[instrument(skip(store), fields(account = %abbrev_uuid(&account)), err)]
pub async fn statement(store: &dyn Store, account: UserId) -> Result<Statement> {
    if store.get_user(account).await?.is_none() {
        return Err(LedgerError::UnknownAccount { account });
    }

    let entries = store
        .list_payments(&PaymentFilter {
            account: Some(account),
            ..Default::default()
        })
        .await?;

    let total_of = |code| {
        entries
            .iter()
            .filter(|leg| leg.transaction_code == code)
            .map(|leg| leg.amount_paid)
            .sum::<Decimal>()
    };
    let total_charges = total_of(TransactionCode::Debit);
    let total_payments = total_of(TransactionCode::Credit);

    Ok(Statement {
        account,
        total_charges,
        total_payments,
        balance: total_charges - total_payments,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::bills::BillStatus;
    use crate::api::models::users::{Role, StandType};
    use crate::db::models::{bills::BillCreateDBRequest, users::UserCreateDBRequest};
    use crate::db::store::InMemoryStore;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::str::FromStr;
    use uuid::Uuid;

    async fn create_user(store: &InMemoryStore, email: &str, stand_type: StandType) -> UserId {
        store
            .create_user(&UserCreateDBRequest {
                name: email.split('@').next().unwrap_or_default().to_string(),
                email: email.to_string(),
                password_hash: None,
                role: if stand_type == StandType::System { Role::Admin } else { Role::Resident },
                phone: None,
                address: None,
                stand_type,
                auth_source: "native".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn payment(payer: UserId, amount: i64, direction: i32) -> PaymentInstruction {
        PaymentInstruction {
            payer,
            amount: Decimal::from(amount),
            payment_method: "cash".to_string(),
            direction,
            payment_for: "Water".to_string(),
            description: Some("October".to_string()),
            bill_id: None,
        }
    }

    fn billing(initiator: UserId, amount: i64, filter: ResidentFilter) -> BulkBillingInstruction {
        BulkBillingInstruction {
            initiator,
            amount: Decimal::from(amount),
            payment_method: "invoice".to_string(),
            filter,
            payment_for: "Refuse".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_single_payment_legs_mirror_each_other() {
        let payer = Uuid::new_v4();
        let treasury = Uuid::new_v4();
        let posting = plan_single_payment("PYM-001".to_string(), treasury, &payment(payer, 20, 1), TransactionCode::Credit);

        let [payer_leg, treasury_leg] = posting.legs.as_slice() else {
            panic!("expected two legs");
        };
        assert_eq!(payer_leg.account, payer);
        assert_eq!(payer_leg.transaction_code, TransactionCode::Credit);
        assert_eq!(payer_leg.status, PaymentStatus::Paid);
        assert_eq!(treasury_leg.account, treasury);
        assert_eq!(treasury_leg.transaction_code, TransactionCode::Debit);
        assert_eq!(treasury_leg.status, PaymentStatus::Debited);
        assert_eq!(payer_leg.amount_paid, treasury_leg.amount_paid);
        assert_eq!(payer_leg.reference, format!("{payer}_Water_20"));
        assert_eq!(payer_leg.reference, treasury_leg.reference);
        assert!(transaction_is_balanced(&posting.legs));
    }

    #[test]
    fn test_charge_to_resident_credits_treasury() {
        let payer = Uuid::new_v4();
        let mut instruction = payment(payer, 35, -1);
        instruction.bill_id = Some(Uuid::new_v4());
        let posting = plan_single_payment("PYM-002".to_string(), Uuid::new_v4(), &instruction, TransactionCode::Debit);

        assert_eq!(posting.legs[0].status, PaymentStatus::Debited);
        assert_eq!(posting.legs[1].status, PaymentStatus::Credited);
        assert_eq!(posting.legs[0].bill_id, instruction.bill_id);
        assert_eq!(posting.legs[1].bill_id, None);
        // Charges never settle a bill
        assert_eq!(posting.settle_bill, None);
        assert!(transaction_is_balanced(&posting.legs));
    }

    #[test]
    fn test_bulk_plan_aggregates_credit() {
        let initiator = Uuid::new_v4();
        let residents: Vec<UserId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let posting = plan_bulk_billing(
            "BIL-001".to_string(),
            &billing(initiator, 50, ResidentFilter::All),
            &residents,
        )
        .unwrap();

        assert_eq!(posting.legs.len(), 4);
        let (debits, credits): (Vec<_>, Vec<_>) = posting
            .legs
            .iter()
            .partition(|leg| leg.transaction_code == TransactionCode::Debit);
        assert!(debits.iter().all(|leg| leg.amount_paid == Decimal::from(50) && leg.status == PaymentStatus::Debited));
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].account, initiator);
        assert_eq!(credits[0].amount_paid, Decimal::from(150));
        assert_eq!(credits[0].status, PaymentStatus::Credited);
        assert!(posting.legs.iter().all(|leg| leg.transaction_id == "BIL-001"));
        assert!(transaction_is_balanced(&posting.legs));
    }

    #[test]
    fn test_unbalanced_legs_are_detected() {
        let mut posting = plan_single_payment(
            "PYM-003".to_string(),
            Uuid::new_v4(),
            &payment(Uuid::new_v4(), 10, 1),
            TransactionCode::Credit,
        );
        posting.legs[1].amount_paid = Decimal::from(9);
        assert!(!transaction_is_balanced(&posting.legs));
    }

    #[tokio::test]
    async fn test_record_payment_validates_input() {
        let store = InMemoryStore::new();
        let treasury = create_user(&store, "treasury@example.com", StandType::System).await;
        let payer = create_user(&store, "payer@example.com", StandType::Residential).await;

        let err = record_payment(&store, treasury, payment(payer, 0, 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));

        let err = record_payment(&store, treasury, payment(payer, 10, 2)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDirection { code: 2 }));

        let err = record_payment(&store, treasury, payment(Uuid::new_v4(), 10, 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownAccount { .. }));

        assert!(store.list_payments(&PaymentFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_against_bill_settles_it() {
        let store = InMemoryStore::new();
        let treasury = create_user(&store, "treasury@example.com", StandType::System).await;
        let payer = create_user(&store, "payer@example.com", StandType::Residential).await;
        let other = create_user(&store, "other@example.com", StandType::Residential).await;
        let bill = store
            .create_bill(&BillCreateDBRequest {
                user_id: payer,
                bill_type: "Water".to_string(),
                amount: Decimal::from(40),
                due_date: Utc::now(),
                status: BillStatus::Pending,
            })
            .await
            .unwrap();

        let mut wrong_owner = payment(other, 40, 1);
        wrong_owner.bill_id = Some(bill.id);
        let err = record_payment(&store, treasury, wrong_owner).await.unwrap_err();
        assert!(matches!(err, LedgerError::BillMismatch { .. }));

        let mut partial = payment(payer, 15, 1);
        partial.bill_id = Some(bill.id);
        record_payment(&store, treasury, partial).await.unwrap();
        assert_eq!(store.get_bill(bill.id).await.unwrap().unwrap().status, BillStatus::Pending);

        let mut rest = payment(payer, 25, 1);
        rest.bill_id = Some(bill.id);
        let receipt = record_payment(&store, treasury, rest).await.unwrap();
        assert_eq!(receipt.transaction_id, "PYM-002");
        assert_eq!(store.get_bill(bill.id).await.unwrap().unwrap().status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn test_bill_residents_by_stand_type() {
        let store = InMemoryStore::new();
        let admin = create_user(&store, "admin@example.com", StandType::System).await;
        let mut residential = HashSet::new();
        for i in 0..3 {
            residential.insert(create_user(&store, &format!("r{i}@example.com"), StandType::Residential).await);
        }
        create_user(&store, "shop@example.com", StandType::Commercial).await;

        let receipt = bill_residents(&store, billing(admin, 50, ResidentFilter::StandType(StandType::Residential)))
            .await
            .unwrap();

        assert_eq!(receipt.transaction_id, "BIL-001");
        assert_eq!(receipt.residents_billed, 3);
        assert_eq!(receipt.total_amount, Decimal::from(150));

        let debited: HashSet<UserId> = receipt
            .legs
            .iter()
            .filter(|leg| leg.transaction_code == TransactionCode::Debit)
            .map(|leg| leg.account)
            .collect();
        assert_eq!(debited, residential);
    }

    #[tokio::test]
    async fn test_bill_residents_all_skips_system_accounts() {
        let store = InMemoryStore::new();
        let admin = create_user(&store, "admin@example.com", StandType::System).await;
        create_user(&store, "a@example.com", StandType::Residential).await;
        create_user(&store, "b@example.com", StandType::Commercial).await;
        create_user(&store, "c@example.com", StandType::Other).await;

        let receipt = bill_residents(&store, billing(admin, 12, ResidentFilter::All)).await.unwrap();
        assert_eq!(receipt.residents_billed, 3);
        assert!(receipt.legs.iter().all(|leg| leg.account != admin || leg.transaction_code == TransactionCode::Credit));
    }

    #[tokio::test]
    async fn test_bill_residents_without_matches_writes_nothing() {
        let store = InMemoryStore::new();
        let admin = create_user(&store, "admin@example.com", StandType::System).await;
        create_user(&store, "a@example.com", StandType::Residential).await;

        let err = bill_residents(&store, billing(admin, 10, ResidentFilter::StandType(StandType::Commercial)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoResidents { .. }));
        assert_eq!(err.to_string(), "Residents not found");
        assert!(store.list_payments(&PaymentFilter::default()).await.unwrap().is_empty());

        // No identifier was consumed
        assert_eq!(store.next_sequence_id(SequenceKind::Bill).await.unwrap(), "BIL-001");
    }

    #[test]
    fn test_bulk_total_must_fit_a_money_column() {
        assert_eq!(bulk_total(Decimal::from(50), 3).unwrap(), Decimal::from(150));
        assert_eq!(bulk_total(MAX_AMOUNT, 1).unwrap(), MAX_AMOUNT);
        assert!(matches!(bulk_total(MAX_AMOUNT, 2), Err(LedgerError::InvalidAmount { .. })));

        let huge = Decimal::from_str("50000000000000000000000000000").unwrap();
        assert!(matches!(bulk_total(huge, 2), Err(LedgerError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn test_bill_residents_rejects_totals_too_large_to_post() {
        let store = InMemoryStore::new();
        let admin = create_user(&store, "admin@example.com", StandType::System).await;
        create_user(&store, "a@example.com", StandType::Residential).await;
        create_user(&store, "b@example.com", StandType::Residential).await;

        let mut instruction = billing(admin, 1, ResidentFilter::All);
        instruction.amount = Decimal::from_str("50000000000000000000000000000").unwrap();
        let err = bill_residents(&store, instruction).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));

        // Each charge fits, the aggregate credit does not
        let mut instruction = billing(admin, 1, ResidentFilter::All);
        instruction.amount = Decimal::from_str("600000000000").unwrap();
        let err = bill_residents(&store, instruction).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));

        assert!(store.list_payments(&PaymentFilter::default()).await.unwrap().is_empty());
        assert_eq!(store.next_sequence_id(SequenceKind::Bill).await.unwrap(), "BIL-001");
    }

    #[tokio::test]
    async fn test_bulk_billing_is_not_idempotent() {
        let store = InMemoryStore::new();
        let admin = create_user(&store, "admin@example.com", StandType::System).await;
        create_user(&store, "a@example.com", StandType::Residential).await;

        let first = bill_residents(&store, billing(admin, 10, ResidentFilter::All)).await.unwrap();
        let second = bill_residents(&store, billing(admin, 10, ResidentFilter::All)).await.unwrap();

        assert_ne!(first.transaction_id, second.transaction_id);
        assert_eq!(store.list_payments(&PaymentFilter::default()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_statement_totals() {
        let store = InMemoryStore::new();
        let admin = create_user(&store, "admin@example.com", StandType::System).await;
        let resident = create_user(&store, "a@example.com", StandType::Residential).await;

        bill_residents(&store, billing(admin, 50, ResidentFilter::All)).await.unwrap();
        record_payment(&store, admin, payment(resident, 20, 1)).await.unwrap();

        let statement = statement(&store, resident).await.unwrap();
        assert_eq!(statement.entries.len(), 2);
        assert_eq!(statement.total_charges, Decimal::from(50));
        assert_eq!(statement.total_payments, Decimal::from(20));
        assert_eq!(statement.balance, Decimal::from(30));

        let err = super::statement(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownAccount { .. }));
    }
}
