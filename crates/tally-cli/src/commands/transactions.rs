//! Transaction command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::matcher::Categorizer;
use tally_core::models::{CategoryFilter, TransactionQuery};

use super::{resolve_category, truncate};

#[allow(clippy::too_many_arguments)]
pub fn cmd_transactions_list(
    db: &Database,
    user_id: i64,
    account_id: Option<i64>,
    search: Option<&str>,
    uncategorized: bool,
    limit: i64,
    offset: i64,
) -> Result<()> {
    let query = TransactionQuery {
        account_id,
        description: search.map(|s| s.to_string()),
        category: uncategorized.then_some(CategoryFilter::Uncategorized),
        limit,
        offset,
        ..Default::default()
    };
    let page = db.list_transactions(user_id, &query)?;

    if page.transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!();
    println!(
        "💳 Transactions ({} of {})",
        page.transactions.len(),
        page.total_items
    );
    println!("   ───────────────────────────────────────────────────────────");
    for tx in &page.transactions {
        let category = match tx.category_id {
            Some(id) => db
                .get_category(user_id, id)?
                .map(|c| c.name)
                .unwrap_or_else(|| format!("#{}", id)),
            None => "-".to_string(),
        };
        println!(
            "   {:>5}  {}  {:<40} {:>10.2}  {}",
            tx.id,
            tx.date,
            truncate(&tx.description, 40),
            tx.amount,
            category
        );
    }

    Ok(())
}

pub fn cmd_transactions_set_category(
    db: &Database,
    user_id: i64,
    transaction_id: i64,
    category: &str,
) -> Result<()> {
    let category_id = if category.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(resolve_category(db, user_id, category)?.id)
    };

    db.set_category(user_id, transaction_id, category_id)?;
    match category_id {
        Some(_) => println!(
            "✅ Set category of transaction {} to '{}'",
            transaction_id, category
        ),
        None => println!("✅ Cleared category of transaction {}", transaction_id),
    }
    Ok(())
}

pub fn cmd_transactions_bulk(
    db: &Database,
    user_id: i64,
    transaction_ids: &[i64],
    category: &str,
) -> Result<()> {
    let category_id = if category.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(resolve_category(db, user_id, category)?.id)
    };

    let affected = db.bulk_categorize(user_id, transaction_ids, category_id)?;
    println!(
        "✅ Updated {} of {} transactions",
        affected,
        transaction_ids.len()
    );
    Ok(())
}

pub fn cmd_transactions_matches(db: &Database, user_id: i64, transaction_id: i64) -> Result<()> {
    let matches =
        Categorizer::new(db).matching_rules_for_transaction(user_id, transaction_id)?;

    if matches.is_empty() {
        println!("No rules match transaction {}", transaction_id);
        return Ok(());
    }

    println!();
    println!("Rules matching transaction {}:", transaction_id);
    for m in &matches {
        println!(
            "   rule {:>4}  '{}' → {} (rank {})",
            m.rule_id,
            m.pattern,
            m.category_name,
            m.match_type.rank()
        );
    }
    Ok(())
}

pub fn cmd_apply_rules(db: &Database, user_id: i64) -> Result<()> {
    let summary = Categorizer::new(db).apply_rules_to_uncategorized(user_id)?;

    println!(
        "✅ Categorized {} transactions ({} conflicts left for review)",
        summary.categorized, summary.conflicts
    );
    if summary.conflicts > 0 {
        println!("   Run 'tally conflicts' to inspect them.");
    }
    Ok(())
}

pub fn cmd_conflicts(db: &Database, user_id: i64) -> Result<()> {
    let conflicts = Categorizer::new(db).find_conflicts(user_id)?;

    if conflicts.is_empty() {
        println!("No categorization conflicts. 🎉");
        return Ok(());
    }

    println!();
    println!("⚠️  {} conflicted transactions", conflicts.len());
    println!("   ───────────────────────────────────────────────────────────");
    for conflict in &conflicts {
        println!(
            "   {:>5}  {}",
            conflict.transaction_id,
            truncate(&conflict.description, 50)
        );
        for rule in &conflict.rules {
            println!(
                "          • rule {} '{}' → {}",
                rule.rule_id, rule.pattern, rule.category_name
            );
        }
    }
    println!();
    println!("   Resolve with 'tally transactions set-category ID CATEGORY'.");

    Ok(())
}
