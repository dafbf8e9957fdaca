//! Categorization rule operations
//!
//! Rules are retrieved newest-first (`id DESC`). That ordering is a display
//! convenience carried through matching; precedence between rules comes from
//! match specificity, never from storage order.

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::CategorizationRule;

impl Database {
    /// Create a rule mapping a pattern to a category in the user's scope
    pub fn create_rule(
        &self,
        user_id: i64,
        pattern: &str,
        category_id: i64,
    ) -> Result<CategorizationRule> {
        self.assert_category_owner(user_id, category_id)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categorization_rules (user_id, pattern, category_id) VALUES (?, ?, ?)",
            params![user_id, pattern, category_id],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_rule(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("rule {}", id)))
    }

    /// Update a rule's pattern and target category
    pub fn update_rule(
        &self,
        user_id: i64,
        id: i64,
        pattern: &str,
        category_id: i64,
    ) -> Result<CategorizationRule> {
        self.assert_rule_owner(user_id, id)?;
        self.assert_category_owner(user_id, category_id)?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE categorization_rules SET pattern = ?, category_id = ?
             WHERE id = ? AND user_id = ?",
            params![pattern, category_id, id, user_id],
        )?;
        drop(conn);

        self.get_rule(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("rule {}", id)))
    }

    /// Delete a rule, returning the number of rows removed
    pub fn delete_rule(&self, user_id: i64, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM categorization_rules WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(affected)
    }

    /// Get a rule by ID within a user's scope
    pub fn get_rule(&self, user_id: i64, id: i64) -> Result<Option<CategorizationRule>> {
        let conn = self.conn()?;
        let rule = conn
            .query_row(
                "SELECT cr.id, cr.pattern, cr.category_id, c.name
                 FROM categorization_rules cr
                 JOIN categories c ON cr.category_id = c.id
                 WHERE cr.id = ? AND cr.user_id = ?",
                params![id, user_id],
                |row| {
                    Ok(CategorizationRule {
                        id: row.get(0)?,
                        pattern: row.get(1)?,
                        category_id: row.get(2)?,
                        category_name: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(rule)
    }

    /// List a user's rules, most recent first
    pub fn list_rules(&self, user_id: i64) -> Result<Vec<CategorizationRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT cr.id, cr.pattern, cr.category_id, c.name
             FROM categorization_rules cr
             JOIN categories c ON cr.category_id = c.id
             WHERE cr.user_id = ?
             ORDER BY cr.id DESC",
        )?;

        let rules = stmt
            .query_map(params![user_id], |row| {
                Ok(CategorizationRule {
                    id: row.get(0)?,
                    pattern: row.get(1)?,
                    category_id: row.get(2)?,
                    category_name: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    fn assert_rule_owner(&self, user_id: i64, rule_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let owned: Option<i64> = conn
            .query_row(
                "SELECT id FROM categorization_rules WHERE id = ? AND user_id = ?",
                params![rule_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        if owned.is_none() {
            return Err(Error::AccessDenied(format!(
                "rule {} not found for user {}",
                rule_id, user_id
            )));
        }
        Ok(())
    }
}
