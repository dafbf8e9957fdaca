//! Category command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::Category;

use super::resolve_category;

pub fn cmd_categories_list(db: &Database, user_id: i64) -> Result<()> {
    let categories = db.list_categories(user_id)?;

    if categories.is_empty() {
        println!("No categories yet. Run 'tally init' to seed defaults.");
        return Ok(());
    }

    println!();
    println!("🏷️  Categories");
    println!("   ──────────────────────────────────────────────");

    fn print_children(categories: &[Category], parent_id: Option<i64>, indent: usize) {
        for category in categories.iter().filter(|c| c.parent_id == parent_id) {
            let prefix = "  ".repeat(indent);
            println!("   {}{:>4}  {}", prefix, category.id, category.name);
            print_children(categories, Some(category.id), indent + 1);
        }
    }

    print_children(&categories, None, 0);
    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    user_id: i64,
    name: &str,
    parent: Option<&str>,
) -> Result<()> {
    let parent_id = parent
        .map(|p| resolve_category(db, user_id, p).map(|c| c.id))
        .transpose()?;

    let category = db.create_category(user_id, name, parent_id)?;
    println!("✅ Created category '{}' (id: {})", category.name, category.id);
    Ok(())
}

pub fn cmd_categories_delete(db: &Database, user_id: i64, id: i64) -> Result<()> {
    db.delete_category(user_id, id)?;
    println!("✅ Deleted category {}", id);
    Ok(())
}
