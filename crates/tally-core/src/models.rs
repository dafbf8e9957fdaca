//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A user. Authentication lives outside this crate; the row exists so that
/// accounts, categories, and rules can be ownership-checked against a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: Option<AccountKind>,
    pub institution: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Account types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
    Credit,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown account kind: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending category. `parent_id` forms a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = debit/expense, positive = credit/income
    pub amount: f64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A new transaction to be inserted
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
}

/// Full-field transaction update. Every field is written; callers pass the
/// current value for anything they don't intend to change.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
}

/// A categorization rule joined with its category name.
///
/// Rules carry no stored priority; precedence is derived from match
/// specificity at evaluation time, with `id` descending as retrieval order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationRule {
    pub id: i64,
    pub pattern: String,
    pub category_id: i64,
    pub category_name: String,
}

/// Filters for transaction listing
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub account_id: Option<i64>,
    /// Substring filter on the description
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<CategoryFilter>,
    pub limit: i64,
    pub offset: i64,
}

/// Category filter for transaction listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Only transactions with no category assigned
    Uncategorized,
    /// Only transactions in the given category
    Id(i64),
}

/// One page of transaction listing results
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total_items: i64,
}

/// Distinct description context for building rules against uncategorized
/// activity
#[derive(Debug, Clone, Serialize)]
pub struct UncategorizedContext {
    pub description: String,
    pub date: NaiveDate,
    pub amount: f64,
}
