//! Account operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, AccountKind};

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    let kind_str: Option<String> = row.get(3)?;
    let created_at_str: String = row.get(5)?;
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: kind_str.and_then(|s| s.parse().ok()),
        institution: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create an account for a user
    pub fn create_account(
        &self,
        user_id: i64,
        name: &str,
        kind: Option<AccountKind>,
        institution: Option<&str>,
    ) -> Result<Account> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (user_id, name, kind, institution) VALUES (?, ?, ?, ?)",
            params![user_id, name, kind.map(|k| k.as_str()), institution],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))
    }

    /// List a user's accounts
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, kind, institution, created_at
             FROM accounts WHERE user_id = ? ORDER BY name",
        )?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID within a user's scope
    pub fn get_account(&self, user_id: i64, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, user_id, name, kind, institution, created_at
                 FROM accounts WHERE id = ? AND user_id = ?",
                params![id, user_id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Verify an account belongs to the user, failing with an access error
    /// otherwise. Mutating operations call this before touching data.
    pub(crate) fn assert_account_owner(&self, user_id: i64, account_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let owned: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE id = ? AND user_id = ?",
                params![account_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        if owned.is_none() {
            return Err(Error::AccessDenied(format!(
                "account {} not found for user {}",
                account_id, user_id
            )));
        }
        Ok(())
    }
}
