//! Shared test fixtures
//!
//! Seed helpers for building a populated database in tests. These panic on
//! failure; they are never compiled into non-test builds.

use chrono::NaiveDate;

use crate::db::Database;
use crate::models::NewTransaction;

pub fn seed_user(db: &Database, name: &str) -> i64 {
    db.upsert_user(name).expect("failed to seed user").id
}

pub fn seed_account(db: &Database, user_id: i64, name: &str) -> i64 {
    db.create_account(user_id, name, None, None)
        .expect("failed to seed account")
        .id
}

pub fn seed_category(db: &Database, user_id: i64, name: &str, parent_id: Option<i64>) -> i64 {
    db.create_category(user_id, name, parent_id)
        .expect("failed to seed category")
        .id
}

pub fn seed_rule(db: &Database, user_id: i64, pattern: &str, category_id: i64) -> i64 {
    db.create_rule(user_id, pattern, category_id)
        .expect("failed to seed rule")
        .id
}

pub fn seed_transaction(
    db: &Database,
    user_id: i64,
    account_id: i64,
    date: &str,
    description: &str,
    amount: f64,
) -> i64 {
    let tx = NewTransaction {
        account_id,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("bad fixture date"),
        description: description.to_string(),
        amount,
        category_id: None,
    };
    db.insert_transaction(user_id, &tx)
        .expect("failed to seed transaction")
        .id
}
