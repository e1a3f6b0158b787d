//! Схема кредитного реестра: клиенты, счета, помесячные записи, результаты моделей
//!
//! Записи хранят внешние ключи явно; связи разрешаются через репозиторий.

pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use repository::{InMemoryLedger, LedgerError, LedgerRepository};

/// Месяцы наблюдения в датасете: 1..=6
pub const MONTHS: std::ops::RangeInclusive<u8> = 1..=6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Customer,
    CreditAccount,
    PaymentStatus,
    BillAmount,
    PaymentAmount,
    ModelResults,
    ExplanationResults,
}

impl Table {
    /// В порядке создания (родитель раньше потомка)
    pub const ALL: [Table; 7] = [
        Table::Customer,
        Table::CreditAccount,
        Table::PaymentStatus,
        Table::BillAmount,
        Table::PaymentAmount,
        Table::ModelResults,
        Table::ExplanationResults,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Customer => "customer",
            Table::CreditAccount => "credit_account",
            Table::PaymentStatus => "payment_status",
            Table::BillAmount => "bill_amount",
            Table::PaymentAmount => "payment_amount",
            Table::ModelResults => "model_results",
            Table::ExplanationResults => "explanation_results",
        }
    }

    pub fn parent(self) -> Option<Table> {
        match self {
            Table::Customer => None,
            Table::CreditAccount => Some(Table::Customer),
            Table::PaymentStatus
            | Table::BillAmount
            | Table::PaymentAmount
            | Table::ModelResults => Some(Table::CreditAccount),
            Table::ExplanationResults => Some(Table::ModelResults),
        }
    }

    /// Колонки таблицы в порядке DDL; совпадают с полями записи
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Customer => &["customer_id", "sex", "education", "marriage", "age"],
            Table::CreditAccount => &["account_id", "customer_id", "limit_bal"],
            Table::PaymentStatus => &["pay_id", "account_id", "month", "status"],
            Table::BillAmount => &["bill_id", "account_id", "month", "amount"],
            Table::PaymentAmount => &["payamt_id", "account_id", "month", "amount"],
            Table::ModelResults => &[
                "result_id",
                "account_id",
                "model_name",
                "predicted_label",
                "probability",
                "run_at",
            ],
            Table::ExplanationResults => &[
                "explanation_id",
                "result_id",
                "method",
                "explanation_json",
                "summary",
            ],
        }
    }

    /// DDL в диалекте SQLite
    pub fn create_statement(self) -> &'static str {
        match self {
            Table::Customer => {
                "CREATE TABLE IF NOT EXISTS customer (\n\
                 \x20   customer_id INTEGER PRIMARY KEY,\n\
                 \x20   sex VARCHAR NOT NULL,\n\
                 \x20   education VARCHAR,\n\
                 \x20   marriage VARCHAR,\n\
                 \x20   age INTEGER NOT NULL\n\
                 )"
            }
            Table::CreditAccount => {
                "CREATE TABLE IF NOT EXISTS credit_account (\n\
                 \x20   account_id INTEGER PRIMARY KEY,\n\
                 \x20   customer_id INTEGER REFERENCES customer (customer_id),\n\
                 \x20   limit_bal NUMERIC NOT NULL\n\
                 )"
            }
            Table::PaymentStatus => {
                "CREATE TABLE IF NOT EXISTS payment_status (\n\
                 \x20   pay_id INTEGER PRIMARY KEY,\n\
                 \x20   account_id INTEGER REFERENCES credit_account (account_id),\n\
                 \x20   month INTEGER NOT NULL,\n\
                 \x20   status INTEGER NOT NULL\n\
                 )"
            }
            Table::BillAmount => {
                "CREATE TABLE IF NOT EXISTS bill_amount (\n\
                 \x20   bill_id INTEGER PRIMARY KEY,\n\
                 \x20   account_id INTEGER REFERENCES credit_account (account_id),\n\
                 \x20   month INTEGER NOT NULL,\n\
                 \x20   amount NUMERIC NOT NULL\n\
                 )"
            }
            Table::PaymentAmount => {
                "CREATE TABLE IF NOT EXISTS payment_amount (\n\
                 \x20   payamt_id INTEGER PRIMARY KEY,\n\
                 \x20   account_id INTEGER REFERENCES credit_account (account_id),\n\
                 \x20   month INTEGER NOT NULL,\n\
                 \x20   amount NUMERIC NOT NULL\n\
                 )"
            }
            Table::ModelResults => {
                "CREATE TABLE IF NOT EXISTS model_results (\n\
                 \x20   result_id INTEGER PRIMARY KEY,\n\
                 \x20   account_id INTEGER REFERENCES credit_account (account_id),\n\
                 \x20   model_name VARCHAR NOT NULL,\n\
                 \x20   predicted_label VARCHAR NOT NULL,\n\
                 \x20   probability FLOAT,\n\
                 \x20   run_at TIMESTAMP NOT NULL\n\
                 )"
            }
            Table::ExplanationResults => {
                "CREATE TABLE IF NOT EXISTS explanation_results (\n\
                 \x20   explanation_id INTEGER PRIMARY KEY,\n\
                 \x20   result_id INTEGER REFERENCES model_results (result_id),\n\
                 \x20   method VARCHAR NOT NULL,\n\
                 \x20   explanation_json TEXT NOT NULL,\n\
                 \x20   summary TEXT\n\
                 )"
            }
        }
    }
}

/// DDL для всех таблиц в порядке создания
pub fn create_statements() -> Vec<&'static str> {
    Table::ALL.iter().map(|t| t.create_statement()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i64,
    pub sex: String,               // 1=male, 2=female
    pub education: Option<String>, // 1=grad, 2=univ, 3=hs, 4=other
    pub marriage: Option<String>,  // 1=married, 2=single, 3=other
    pub age: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub account_id: i64,
    pub customer_id: i64,
    pub limit_bal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub pay_id: i64,
    pub account_id: i64,
    pub month: u8,
    pub status: i32, // -1=pay duly, 0=revolving, 1..9=delay months
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillAmount {
    pub bill_id: i64,
    pub account_id: i64,
    pub month: u8,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAmount {
    pub payamt_id: i64,
    pub account_id: i64,
    pub month: u8,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub result_id: i64,
    pub account_id: i64,
    pub model_name: String,
    pub predicted_label: String,
    pub probability: Option<f64>,
    pub run_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExplanationMethod {
    Shap,
    Lime,
}

impl ExplanationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExplanationMethod::Shap => "SHAP",
            ExplanationMethod::Lime => "LIME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub explanation_id: i64,
    pub result_id: i64,
    pub method: ExplanationMethod,
    pub explanation_json: String,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tables_have_ddl() {
        let statements = create_statements();
        assert_eq!(statements.len(), 7);
        for table in Table::ALL {
            assert!(table
                .create_statement()
                .starts_with(&format!("CREATE TABLE IF NOT EXISTS {} (", table.name())));
        }
    }

    /// Имена колонок из тела CREATE TABLE
    fn ddl_columns(table: Table) -> Vec<String> {
        let ddl = table.create_statement();
        let body = &ddl[ddl.find('(').unwrap() + 1..ddl.rfind(')').unwrap()];
        body.split(",\n")
            .map(|line| line.split_whitespace().next().unwrap().to_string())
            .collect()
    }

    fn record_columns<T: Serialize>(record: &T) -> Vec<String> {
        match serde_json::to_value(record).unwrap() {
            serde_json::Value::Object(fields) => fields.keys().cloned().collect(),
            other => panic!("not a record: {other}"),
        }
    }

    #[test]
    fn test_ddl_matches_columns() {
        for table in Table::ALL {
            assert_eq!(ddl_columns(table), table.columns(), "{}", table.name());
        }
    }

    #[test]
    fn test_records_match_columns() {
        let run_at = Utc::now();
        let records = [
            (
                Table::Customer,
                record_columns(&Customer {
                    customer_id: 1,
                    sex: "2".into(),
                    education: None,
                    marriage: None,
                    age: 30,
                }),
            ),
            (
                Table::CreditAccount,
                record_columns(&CreditAccount {
                    account_id: 1,
                    customer_id: 1,
                    limit_bal: 1.0,
                }),
            ),
            (
                Table::PaymentStatus,
                record_columns(&PaymentStatus {
                    pay_id: 1,
                    account_id: 1,
                    month: 1,
                    status: 0,
                }),
            ),
            (
                Table::BillAmount,
                record_columns(&BillAmount {
                    bill_id: 1,
                    account_id: 1,
                    month: 1,
                    amount: 0.0,
                }),
            ),
            (
                Table::PaymentAmount,
                record_columns(&PaymentAmount {
                    payamt_id: 1,
                    account_id: 1,
                    month: 1,
                    amount: 0.0,
                }),
            ),
            (
                Table::ModelResults,
                record_columns(&ModelResult {
                    result_id: 1,
                    account_id: 1,
                    model_name: "logreg".into(),
                    predicted_label: "0".into(),
                    probability: None,
                    run_at,
                }),
            ),
            (
                Table::ExplanationResults,
                record_columns(&ExplanationResult {
                    explanation_id: 1,
                    result_id: 1,
                    method: ExplanationMethod::Lime,
                    explanation_json: "{}".into(),
                    summary: None,
                }),
            ),
        ];

        assert_eq!(records.len(), Table::ALL.len());
        for (table, columns) in records {
            assert_eq!(columns, table.columns(), "{}", table.name());
        }
    }

    #[test]
    fn test_foreign_keys_reference_parent() {
        for table in Table::ALL {
            let ddl = table.create_statement();
            match table.parent() {
                Some(parent) => {
                    let key = parent.columns()[0];
                    let reference = format!("REFERENCES {} ({})", parent.name(), key);
                    assert!(ddl.contains(&reference), "{}", table.name());
                    assert!(table.columns().contains(&key));
                }
                None => assert!(!ddl.contains("REFERENCES")),
            }
        }
    }

    #[test]
    fn test_parents_are_created_first() {
        for (pos, table) in Table::ALL.iter().enumerate() {
            if let Some(parent) = table.parent() {
                let parent_pos = Table::ALL.iter().position(|t| *t == parent).unwrap();
                assert!(parent_pos < pos, "{} before {}", parent.name(), table.name());
            }
        }
    }

    #[test]
    fn test_explanation_method_serde() {
        let json = serde_json::to_string(&ExplanationMethod::Shap).unwrap();
        assert_eq!(json, "\"SHAP\"");
        assert_eq!(ExplanationMethod::Lime.as_str(), "LIME");
    }
}
