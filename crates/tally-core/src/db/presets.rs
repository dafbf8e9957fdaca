//! Per-account CSV mapping presets
//!
//! An account's CSV export keeps the same shape across downloads, so the last
//! used column mapping, date format, and amount layout are remembered and
//! offered on the next import.

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;
use crate::import::{AmountLayout, ColumnMapping, MappingPreset};

impl Database {
    /// Save (or replace) the mapping preset for an account
    pub fn save_mapping_preset(
        &self,
        user_id: i64,
        account_id: i64,
        mapping: &ColumnMapping,
        date_format: Option<&str>,
        layout: Option<AmountLayout>,
    ) -> Result<()> {
        self.assert_account_owner(user_id, account_id)?;

        let mapping_json = serde_json::to_string(mapping)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO csv_mapping_presets (account_id, mapping_json, date_format, amount_layout, updated_at)
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(account_id) DO UPDATE SET
                 mapping_json = excluded.mapping_json,
                 date_format = excluded.date_format,
                 amount_layout = excluded.amount_layout,
                 updated_at = CURRENT_TIMESTAMP",
            params![
                account_id,
                mapping_json,
                date_format,
                layout.map(|l| l.as_str()),
            ],
        )?;
        Ok(())
    }

    /// Fetch the mapping preset for an account, if one was saved
    pub fn get_mapping_preset(
        &self,
        user_id: i64,
        account_id: i64,
    ) -> Result<Option<MappingPreset>> {
        self.assert_account_owner(user_id, account_id)?;

        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT mapping_json, date_format, amount_layout
                 FROM csv_mapping_presets WHERE account_id = ?",
                params![account_id],
                |row| {
                    let mapping_json: String = row.get(0)?;
                    let date_format: Option<String> = row.get(1)?;
                    let layout: Option<String> = row.get(2)?;
                    Ok((mapping_json, date_format, layout))
                },
            )
            .optional()?;

        match row {
            Some((mapping_json, date_format, layout)) => {
                let mapping: ColumnMapping = serde_json::from_str(&mapping_json)?;
                Ok(Some(MappingPreset {
                    account_id,
                    mapping,
                    date_format,
                    layout: layout.and_then(|s| s.parse().ok()),
                }))
            }
            None => Ok(None),
        }
    }
}
