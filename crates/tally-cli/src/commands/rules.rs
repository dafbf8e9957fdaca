//! Rule command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::matcher::matching_rules;

use super::{resolve_category, truncate};

pub fn cmd_rules_list(db: &Database, user_id: i64) -> Result<()> {
    let rules = db.list_rules(user_id)?;

    if rules.is_empty() {
        println!("No rules yet. Add one with 'tally rules add PATTERN CATEGORY'.");
        return Ok(());
    }

    println!();
    println!("📋 Rules (most recent first)");
    println!("   ──────────────────────────────────────────────");
    for rule in &rules {
        println!(
            "   {:>4}  {:<30} → {}",
            rule.id,
            truncate(&rule.pattern, 30),
            rule.category_name
        );
    }

    Ok(())
}

pub fn cmd_rules_add(db: &Database, user_id: i64, pattern: &str, category: &str) -> Result<()> {
    let category = resolve_category(db, user_id, category)?;
    let rule = db.create_rule(user_id, pattern, category.id)?;
    println!(
        "✅ Created rule '{}' → {} (id: {})",
        rule.pattern, rule.category_name, rule.id
    );
    Ok(())
}

pub fn cmd_rules_delete(db: &Database, user_id: i64, id: i64) -> Result<()> {
    let affected = db.delete_rule(user_id, id)?;
    if affected == 0 {
        anyhow::bail!("Rule {} not found", id);
    }
    println!("✅ Deleted rule {}", id);
    Ok(())
}

pub fn cmd_rules_test(db: &Database, user_id: i64, description: &str) -> Result<()> {
    let rules = db.list_rules(user_id)?;
    let matches = matching_rules(&rules, description)?;

    if matches.is_empty() {
        println!("No rules match '{}'", description);
        return Ok(());
    }

    println!();
    println!("Rules matching '{}':", description);
    for m in &matches {
        let rank = match m.match_type.rank() {
            0 => "exact",
            1 => "prefix",
            2 => "word",
            _ => "substring",
        };
        println!(
            "   {:>4}  {:<30} → {:<20} [{}]",
            m.rule_id,
            truncate(&m.pattern, 30),
            m.category_name,
            rank
        );
    }

    Ok(())
}
