//! Transaction operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    CategoryFilter, NewTransaction, Transaction, TransactionPage, TransactionQuery,
    TransactionUpdate, UncategorizedContext,
};

/// Helper to convert a row to Transaction
/// Column order: id, account_id, date, description, amount, category_id, created_at
fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(2)?;
    let created_at_str: String = row.get(6)?;
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
        description: row.get(3)?,
        amount: row.get(4)?,
        category_id: row.get(5)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Insert a transaction after verifying the account (and category, if
    /// set) belong to the user
    pub fn insert_transaction(&self, user_id: i64, tx: &NewTransaction) -> Result<Transaction> {
        self.assert_account_owner(user_id, tx.account_id)?;
        if let Some(category_id) = tx.category_id {
            self.assert_category_owner(user_id, category_id)?;
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, amount, category_id)
             VALUES (?, ?, ?, ?, ?)",
            params![
                tx.account_id,
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.category_id,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_transaction(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    /// Get a transaction by ID within a user's scope (via account ownership)
    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let transaction = conn
            .query_row(
                "SELECT t.id, t.account_id, t.date, t.description, t.amount, t.category_id, t.created_at
                 FROM transactions t
                 JOIN accounts a ON t.account_id = a.id
                 WHERE t.id = ? AND a.user_id = ?",
                params![id, user_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(transaction)
    }

    /// Full-field transaction update with scope checks on the transaction,
    /// the (possibly new) account, and the (possibly new) category
    pub fn update_transaction(
        &self,
        user_id: i64,
        update: &TransactionUpdate,
    ) -> Result<Transaction> {
        if self.get_transaction(user_id, update.id)?.is_none() {
            return Err(Error::AccessDenied(format!(
                "transaction {} not found for user {}",
                update.id, user_id
            )));
        }
        self.assert_account_owner(user_id, update.account_id)?;
        if let Some(category_id) = update.category_id {
            self.assert_category_owner(user_id, category_id)?;
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE transactions
             SET account_id = ?, date = ?, description = ?, amount = ?, category_id = ?
             WHERE id = ?",
            params![
                update.account_id,
                update.date.to_string(),
                update.description,
                update.amount,
                update.category_id,
                update.id,
            ],
        )?;
        drop(conn);

        self.get_transaction(user_id, update.id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", update.id)))
    }

    /// List transactions with optional filters and pagination
    pub fn list_transactions(
        &self,
        user_id: i64,
        query: &TransactionQuery,
    ) -> Result<TransactionPage> {
        let conn = self.conn()?;

        // Build dynamic WHERE clause
        let mut conditions = vec!["a.user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(account_id) = query.account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(account_id));
        }
        if let Some(ref description) = query.description {
            if !description.trim().is_empty() {
                conditions.push("t.description LIKE ? COLLATE NOCASE".to_string());
                params.push(Box::new(format!("%{}%", description.trim())));
            }
        }
        if let Some(start) = query.start_date {
            conditions.push("t.date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }
        if let Some(end) = query.end_date {
            conditions.push("t.date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }
        match query.category {
            Some(CategoryFilter::Uncategorized) => {
                conditions.push("t.category_id IS NULL".to_string());
            }
            Some(CategoryFilter::Id(category_id)) => {
                conditions.push("t.category_id = ?".to_string());
                params.push(Box::new(category_id));
            }
            None => {}
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        let count_sql = format!(
            "SELECT COUNT(*) FROM transactions t JOIN accounts a ON t.account_id = a.id {}",
            where_clause
        );
        let total_items: i64 = {
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            conn.query_row(&count_sql, params_refs.as_slice(), |row| row.get(0))?
        };

        let sql = format!(
            "SELECT t.id, t.account_id, t.date, t.description, t.amount, t.category_id, t.created_at
             FROM transactions t
             JOIN accounts a ON t.account_id = a.id
             {}
             ORDER BY t.date DESC, t.id DESC
             LIMIT ? OFFSET ?",
            where_clause
        );

        params.push(Box::new(if query.limit > 0 { query.limit } else { 50 }));
        params.push(Box::new(query.offset));
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_refs.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TransactionPage {
            transactions,
            total_items,
        })
    }

    /// All transactions for one account, unpaginated. Used to seed the import
    /// dedup set.
    pub fn list_account_transactions(
        &self,
        user_id: i64,
        account_id: i64,
    ) -> Result<Vec<Transaction>> {
        self.assert_account_owner(user_id, account_id)?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, date, description, amount, category_id, created_at
             FROM transactions WHERE account_id = ? ORDER BY date, id",
        )?;

        let transactions = stmt
            .query_map(params![account_id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// All of a user's uncategorized transactions
    pub fn list_uncategorized(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.account_id, t.date, t.description, t.amount, t.category_id, t.created_at
             FROM transactions t
             JOIN accounts a ON t.account_id = a.id
             WHERE t.category_id IS NULL AND a.user_id = ?",
        )?;

        let transactions = stmt
            .query_map(params![user_id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Distinct uncategorized descriptions with a sample date and amount, for
    /// building rules against
    pub fn uncategorized_descriptions(&self, user_id: i64) -> Result<Vec<UncategorizedContext>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT t.description, t.date, t.amount
             FROM transactions t
             JOIN accounts a ON t.account_id = a.id
             WHERE t.category_id IS NULL AND t.description != '' AND a.user_id = ?
             ORDER BY t.description ASC, t.date DESC",
        )?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                let date_str: String = row.get(1)?;
                Ok(UncategorizedContext {
                    description: row.get(0)?,
                    date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                        .unwrap_or_default(),
                    amount: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Assign (or clear) a transaction's category. Explicit user assignment
    /// bypasses the matcher entirely; it always succeeds regardless of rule
    /// state. Returns the number of rows updated.
    pub fn set_category(
        &self,
        user_id: i64,
        transaction_id: i64,
        category_id: Option<i64>,
    ) -> Result<usize> {
        if self.get_transaction(user_id, transaction_id)?.is_none() {
            return Err(Error::AccessDenied(format!(
                "transaction {} not found for user {}",
                transaction_id, user_id
            )));
        }
        if let Some(category_id) = category_id {
            self.assert_category_owner(user_id, category_id)?;
        }

        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE transactions SET category_id = ? WHERE id = ?",
            params![category_id, transaction_id],
        )?;
        Ok(affected)
    }

    /// Assign a category to many transactions at once. Rows outside the
    /// user's scope are silently unaffected by the ownership predicate in
    /// the UPDATE. Returns the number of rows updated.
    pub fn bulk_categorize(
        &self,
        user_id: i64,
        transaction_ids: &[i64],
        category_id: Option<i64>,
    ) -> Result<usize> {
        if let Some(category_id) = category_id {
            self.assert_category_owner(user_id, category_id)?;
        }

        let conn = self.conn()?;
        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            let mut stmt = conn.prepare(
                "UPDATE transactions SET category_id = ?
                 WHERE id = ? AND account_id IN (SELECT id FROM accounts WHERE user_id = ?)",
            )?;
            let mut affected = 0;
            for id in transaction_ids {
                affected += stmt.execute(params![category_id, id, user_id])?;
            }
            Ok(affected)
        })();

        match result {
            Ok(affected) => {
                conn.execute("COMMIT", [])?;
                Ok(affected)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}
