//! Init command and shared utilities

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::Database;
use tally_core::models::Category;

/// Open the database at the given path
pub fn open_db(path: &Path) -> Result<Database> {
    Database::open(&path.to_string_lossy())
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

/// Initialize the database, create the initial user, and seed default
/// categories
pub fn cmd_init(path: &Path, user_name: &str) -> Result<()> {
    let db = open_db(path)?;
    let user = db.upsert_user(user_name)?;
    db.seed_default_categories(user.id)?;

    println!("✅ Initialized database at {}", path.display());
    println!("   User '{}' (id: {}) with default categories", user.name, user.id);
    Ok(())
}

/// Resolve a category argument that may be a name or a numeric ID
pub fn resolve_category(db: &Database, user_id: i64, arg: &str) -> Result<Category> {
    if let Ok(id) = arg.parse::<i64>() {
        if let Some(category) = db.get_category(user_id, id)? {
            return Ok(category);
        }
    }
    db.get_category_by_name(user_id, arg)?
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", arg))
}
