/// Репозиторий кредитного реестра

use std::collections::BTreeMap;

use thiserror::Error;

use super::{
    BillAmount, CreditAccount, Customer, ExplanationResult, ModelResult, PaymentAmount,
    PaymentStatus, Table, MONTHS,
};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("{table} row {key} references missing {parent} row {parent_key}")]
    MissingParent {
        table: &'static str,
        key: i64,
        parent: &'static str,
        parent_key: i64,
    },

    #[error("{table} already has a row with key {key}")]
    DuplicateKey { table: &'static str, key: i64 },

    #[error("{table} row {key}: month {month} is outside 1..=6")]
    InvalidMonth {
        table: &'static str,
        key: i64,
        month: u8,
    },

    #[error("model_results row {key}: probability {probability} is outside [0, 1]")]
    InvalidProbability { key: i64, probability: f64 },
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Хранилище записей реестра. Реализация обязана проверять внешние ключи.
pub trait LedgerRepository {
    fn insert_customer(&mut self, customer: Customer) -> LedgerResult<()>;
    fn insert_account(&mut self, account: CreditAccount) -> LedgerResult<()>;
    fn insert_payment_status(&mut self, record: PaymentStatus) -> LedgerResult<()>;
    fn insert_bill_amount(&mut self, record: BillAmount) -> LedgerResult<()>;
    fn insert_payment_amount(&mut self, record: PaymentAmount) -> LedgerResult<()>;
    fn insert_model_result(&mut self, result: ModelResult) -> LedgerResult<()>;
    fn insert_explanation(&mut self, explanation: ExplanationResult) -> LedgerResult<()>;

    fn customer(&self, customer_id: i64) -> Option<Customer>;
    fn account(&self, account_id: i64) -> Option<CreditAccount>;
    fn model_result(&self, result_id: i64) -> Option<ModelResult>;

    fn accounts_for_customer(&self, customer_id: i64) -> Vec<CreditAccount>;
    /// Статусы платежей счёта, по возрастанию месяца
    fn payment_history(&self, account_id: i64) -> Vec<PaymentStatus>;
    fn bills_for_account(&self, account_id: i64) -> Vec<BillAmount>;
    fn payments_for_account(&self, account_id: i64) -> Vec<PaymentAmount>;
    fn results_for_account(&self, account_id: i64) -> Vec<ModelResult>;
    fn explanations_for_result(&self, result_id: i64) -> Vec<ExplanationResult>;
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    customers: BTreeMap<i64, Customer>,
    accounts: BTreeMap<i64, CreditAccount>,
    payment_statuses: BTreeMap<i64, PaymentStatus>,
    bill_amounts: BTreeMap<i64, BillAmount>,
    payment_amounts: BTreeMap<i64, PaymentAmount>,
    model_results: BTreeMap<i64, ModelResult>,
    explanations: BTreeMap<i64, ExplanationResult>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, table: Table) -> usize {
        match table {
            Table::Customer => self.customers.len(),
            Table::CreditAccount => self.accounts.len(),
            Table::PaymentStatus => self.payment_statuses.len(),
            Table::BillAmount => self.bill_amounts.len(),
            Table::PaymentAmount => self.payment_amounts.len(),
            Table::ModelResults => self.model_results.len(),
            Table::ExplanationResults => self.explanations.len(),
        }
    }

    fn require_account(&self, table: Table, key: i64, account_id: i64) -> LedgerResult<()> {
        if self.accounts.contains_key(&account_id) {
            Ok(())
        } else {
            Err(LedgerError::MissingParent {
                table: table.name(),
                key,
                parent: Table::CreditAccount.name(),
                parent_key: account_id,
            })
        }
    }
}

fn insert_unique<T>(map: &mut BTreeMap<i64, T>, table: Table, key: i64, value: T) -> LedgerResult<()> {
    if map.contains_key(&key) {
        return Err(LedgerError::DuplicateKey {
            table: table.name(),
            key,
        });
    }
    map.insert(key, value);
    Ok(())
}

fn check_month(table: Table, key: i64, month: u8) -> LedgerResult<()> {
    if MONTHS.contains(&month) {
        Ok(())
    } else {
        Err(LedgerError::InvalidMonth {
            table: table.name(),
            key,
            month,
        })
    }
}

impl LedgerRepository for InMemoryLedger {
    fn insert_customer(&mut self, customer: Customer) -> LedgerResult<()> {
        insert_unique(&mut self.customers, Table::Customer, customer.customer_id, customer)
    }

    fn insert_account(&mut self, account: CreditAccount) -> LedgerResult<()> {
        if !self.customers.contains_key(&account.customer_id) {
            return Err(LedgerError::MissingParent {
                table: Table::CreditAccount.name(),
                key: account.account_id,
                parent: Table::Customer.name(),
                parent_key: account.customer_id,
            });
        }
        insert_unique(&mut self.accounts, Table::CreditAccount, account.account_id, account)
    }

    fn insert_payment_status(&mut self, record: PaymentStatus) -> LedgerResult<()> {
        self.require_account(Table::PaymentStatus, record.pay_id, record.account_id)?;
        check_month(Table::PaymentStatus, record.pay_id, record.month)?;
        insert_unique(&mut self.payment_statuses, Table::PaymentStatus, record.pay_id, record)
    }

    fn insert_bill_amount(&mut self, record: BillAmount) -> LedgerResult<()> {
        self.require_account(Table::BillAmount, record.bill_id, record.account_id)?;
        check_month(Table::BillAmount, record.bill_id, record.month)?;
        insert_unique(&mut self.bill_amounts, Table::BillAmount, record.bill_id, record)
    }

    fn insert_payment_amount(&mut self, record: PaymentAmount) -> LedgerResult<()> {
        self.require_account(Table::PaymentAmount, record.payamt_id, record.account_id)?;
        check_month(Table::PaymentAmount, record.payamt_id, record.month)?;
        insert_unique(&mut self.payment_amounts, Table::PaymentAmount, record.payamt_id, record)
    }

    fn insert_model_result(&mut self, result: ModelResult) -> LedgerResult<()> {
        self.require_account(Table::ModelResults, result.result_id, result.account_id)?;
        if let Some(p) = result.probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(LedgerError::InvalidProbability {
                    key: result.result_id,
                    probability: p,
                });
            }
        }
        insert_unique(&mut self.model_results, Table::ModelResults, result.result_id, result)
    }

    fn insert_explanation(&mut self, explanation: ExplanationResult) -> LedgerResult<()> {
        if !self.model_results.contains_key(&explanation.result_id) {
            return Err(LedgerError::MissingParent {
                table: Table::ExplanationResults.name(),
                key: explanation.explanation_id,
                parent: Table::ModelResults.name(),
                parent_key: explanation.result_id,
            });
        }
        insert_unique(
            &mut self.explanations,
            Table::ExplanationResults,
            explanation.explanation_id,
            explanation,
        )
    }

    fn customer(&self, customer_id: i64) -> Option<Customer> {
        self.customers.get(&customer_id).cloned()
    }

    fn account(&self, account_id: i64) -> Option<CreditAccount> {
        self.accounts.get(&account_id).cloned()
    }

    fn model_result(&self, result_id: i64) -> Option<ModelResult> {
        self.model_results.get(&result_id).cloned()
    }

    fn accounts_for_customer(&self, customer_id: i64) -> Vec<CreditAccount> {
        self.accounts
            .values()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect()
    }

    fn payment_history(&self, account_id: i64) -> Vec<PaymentStatus> {
        let mut history: Vec<PaymentStatus> = self
            .payment_statuses
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        history.sort_by_key(|p| (p.month, p.pay_id));
        history
    }

    fn bills_for_account(&self, account_id: i64) -> Vec<BillAmount> {
        self.bill_amounts
            .values()
            .filter(|b| b.account_id == account_id)
            .cloned()
            .collect()
    }

    fn payments_for_account(&self, account_id: i64) -> Vec<PaymentAmount> {
        self.payment_amounts
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect()
    }

    fn results_for_account(&self, account_id: i64) -> Vec<ModelResult> {
        self.model_results
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect()
    }

    fn explanations_for_result(&self, result_id: i64) -> Vec<ExplanationResult> {
        self.explanations
            .values()
            .filter(|e| e.result_id == result_id)
            .cloned()
            .collect()
    }
}
