//! Category tree operations
//!
//! Categories form a tree via `parent_id`. Deletion is guarded: a category
//! referenced by transactions, rules, or child categories cannot be removed.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Category;

/// Default category names seeded for a new user
const DEFAULT_CATEGORIES: [&str; 9] = [
    "Income",
    "Housing",
    "Food",
    "Transportation",
    "Utilities",
    "Healthcare",
    "Entertainment",
    "Personal Care",
    "Miscellaneous",
];

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    let created_at_str: String = row.get(4)?;
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        parent_id: row.get(3)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Seed the default categories for a user (idempotent)
    pub fn seed_default_categories(&self, user_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("INSERT OR IGNORE INTO categories (user_id, name) VALUES (?, ?)")?;
        for name in DEFAULT_CATEGORIES {
            stmt.execute(params![user_id, name])?;
        }
        Ok(())
    }

    /// Create a category, optionally under a parent in the same scope
    pub fn create_category(
        &self,
        user_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Category> {
        if let Some(parent) = parent_id {
            self.assert_category_owner(user_id, parent)?;
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (user_id, name, parent_id) VALUES (?, ?, ?)",
            params![user_id, name, parent_id],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    /// Rename a category and/or move it under a new parent
    pub fn update_category(
        &self,
        user_id: i64,
        id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Category> {
        self.assert_category_owner(user_id, id)?;
        if let Some(parent) = parent_id {
            self.assert_category_owner(user_id, parent)?;
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE categories SET name = ?, parent_id = ? WHERE id = ? AND user_id = ?",
            params![name, parent_id, id, user_id],
        )?;
        drop(conn);

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    /// List a user's categories ordered by name
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, parent_id, created_at
             FROM categories WHERE user_id = ? ORDER BY name",
        )?;

        let categories = stmt
            .query_map(params![user_id], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a category by ID within a user's scope
    pub fn get_category(&self, user_id: i64, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, user_id, name, parent_id, created_at
                 FROM categories WHERE id = ? AND user_id = ?",
                params![id, user_id],
                row_to_category,
            )
            .optional()?;

        Ok(category)
    }

    /// Find a category by name within a user's scope
    pub fn get_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, user_id, name, parent_id, created_at
                 FROM categories WHERE user_id = ? AND name = ?",
                params![user_id, name],
                row_to_category,
            )
            .optional()?;

        Ok(category)
    }

    /// Delete a category. Fails while any transaction, rule, or child
    /// category still references it.
    pub fn delete_category(&self, user_id: i64, id: i64) -> Result<()> {
        self.assert_category_owner(user_id, id)?;

        let conn = self.conn()?;

        let in_transactions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if in_transactions > 0 {
            return Err(Error::CategoryInUse(format!(
                "category {} is referenced by {} transactions",
                id, in_transactions
            )));
        }

        let in_rules: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categorization_rules WHERE category_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if in_rules > 0 {
            return Err(Error::CategoryInUse(format!(
                "category {} is referenced by {} rules",
                id, in_rules
            )));
        }

        let children: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE parent_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(Error::CategoryInUse(format!(
                "category {} has {} child categories",
                id, children
            )));
        }

        conn.execute(
            "DELETE FROM categories WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(())
    }

    /// Verify a category belongs to the user
    pub(crate) fn assert_category_owner(&self, user_id: i64, category_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let owned: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE id = ? AND user_id = ?",
                params![category_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        if owned.is_none() {
            return Err(Error::AccessDenied(format!(
                "category {} not found for user {}",
                category_id, user_id
            )));
        }
        Ok(())
    }
}
