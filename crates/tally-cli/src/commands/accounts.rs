//! Account command implementations

use anyhow::Result;
use tally_core::db::Database;

pub fn cmd_accounts_list(db: &Database, user_id: i64) -> Result<()> {
    let accounts = db.list_accounts(user_id)?;

    if accounts.is_empty() {
        println!("No accounts yet. Add one with 'tally accounts add NAME'.");
        return Ok(());
    }

    println!();
    println!("🏦 Accounts");
    println!("   ──────────────────────────────────────────────");
    for account in &accounts {
        let kind = account
            .kind
            .map(|k| format!(" [{}]", k))
            .unwrap_or_default();
        let institution = account
            .institution
            .as_deref()
            .map(|i| format!(" ({})", i))
            .unwrap_or_default();
        println!("   {:>4}  {}{}{}", account.id, account.name, kind, institution);
    }

    Ok(())
}

pub fn cmd_accounts_add(
    db: &Database,
    user_id: i64,
    name: &str,
    kind: Option<&str>,
    institution: Option<&str>,
) -> Result<()> {
    let kind = kind
        .map(|s| s.parse())
        .transpose()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let account = db.create_account(user_id, name, kind, institution)?;
    println!("✅ Created account '{}' (id: {})", account.name, account.id);
    Ok(())
}
