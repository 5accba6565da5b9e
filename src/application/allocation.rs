use crate::domain::contract::{Contract, Installment, Payment};
use crate::domain::money::Money;
use crate::domain::overdue::OverdueInstallmentRecord;
use chrono::NaiveDate;

/// Sums a contract's payments into a single pool.
///
/// `None` when the total does not fit in a `Decimal`.
pub fn payment_pool<'a, I>(payments: I) -> Option<Money>
where
    I: IntoIterator<Item = &'a Payment>,
{
    payments
        .into_iter()
        .try_fold(Money::ZERO, |pool, p| pool.checked_add(p.amount))
}

/// How much of the pool went to one installment.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation<'a> {
    pub installment: &'a Installment,
    pub allocated: Money,
    pub outstanding: Money,
    pub days_overdue: i64,
}

impl Allocation<'_> {
    pub fn is_overdue(&self) -> bool {
        self.days_overdue > 0 && self.outstanding.is_positive()
    }
}

/// FIFO waterfall of `pool` over `installments`, earliest due date first.
///
/// Ties keep input order. Installments not yet due still draw from the pool
/// so later, already-due installments see the same remainder they would under
/// strict schedule order. The pool is never allowed to go below zero and no
/// installment receives more than its own amount.
pub fn allocate(
    installments: &[Installment],
    pool: Money,
    reference_date: NaiveDate,
) -> Vec<Allocation<'_>> {
    let mut ordered: Vec<&Installment> = installments.iter().collect();
    ordered.sort_by_key(|i| i.due_date);

    let mut remaining = pool;
    ordered
        .into_iter()
        .map(|installment| {
            let amount = installment.amount.non_negative();
            let allocated = amount.min(remaining.non_negative());
            remaining -= allocated;
            Allocation {
                installment,
                allocated,
                outstanding: amount - allocated,
                days_overdue: (reference_date - installment.due_date).num_days(),
            }
        })
        .collect()
}

/// Overdue remainders of one contract as of `reference_date`.
pub fn overdue_records(
    contract: &Contract,
    pool: Money,
    reference_date: NaiveDate,
) -> Vec<OverdueInstallmentRecord> {
    let records: Vec<_> = allocate(&contract.installments, pool, reference_date)
        .into_iter()
        .filter(Allocation::is_overdue)
        .map(|a| OverdueInstallmentRecord {
            contract_id: contract.id.clone(),
            customer_id: contract.customer_id().map(String::from),
            customer_name: contract.customer_name.clone(),
            overdue_amount: a.outstanding,
            due_date: a.installment.due_date,
            days_overdue: a.days_overdue,
            description: a.installment.description.clone(),
        })
        .collect();

    log::debug!(
        "contract {}: pool {}, {} of {} installments overdue",
        contract.id,
        pool,
        records.len(),
        contract.installments.len()
    );
    records
}
