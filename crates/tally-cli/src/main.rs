//! Tally CLI - Personal finance tracker
//!
//! Usage:
//!   tally init                        Initialize database
//!   tally import FILE --account 1     Import transactions from CSV
//!   tally apply-rules                 Auto-categorize uncategorized rows
//!   tally conflicts                   Show unresolved categorization ties

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init { user_name } => commands::cmd_init(&cli.db, &user_name),
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db, cli.user),
                Some(AccountsAction::Add {
                    name,
                    kind,
                    institution,
                }) => commands::cmd_accounts_add(
                    &db,
                    cli.user,
                    &name,
                    kind.as_deref(),
                    institution.as_deref(),
                ),
            }
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(CategoriesAction::List) => {
                    commands::cmd_categories_list(&db, cli.user)
                }
                Some(CategoriesAction::Add { name, parent }) => {
                    commands::cmd_categories_add(&db, cli.user, &name, parent.as_deref())
                }
                Some(CategoriesAction::Delete { id }) => {
                    commands::cmd_categories_delete(&db, cli.user, id)
                }
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(RulesAction::List) => commands::cmd_rules_list(&db, cli.user),
                Some(RulesAction::Add { pattern, category }) => {
                    commands::cmd_rules_add(&db, cli.user, &pattern, &category)
                }
                Some(RulesAction::Delete { id }) => commands::cmd_rules_delete(&db, cli.user, id),
                Some(RulesAction::Test { description }) => {
                    commands::cmd_rules_test(&db, cli.user, &description)
                }
            }
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_transactions_list(&db, cli.user, None, None, false, 20, 0),
                Some(TransactionsAction::List {
                    account,
                    search,
                    uncategorized,
                    limit,
                    offset,
                }) => commands::cmd_transactions_list(
                    &db,
                    cli.user,
                    account,
                    search.as_deref(),
                    uncategorized,
                    limit,
                    offset,
                ),
                Some(TransactionsAction::SetCategory { id, category }) => {
                    commands::cmd_transactions_set_category(&db, cli.user, id, &category)
                }
                Some(TransactionsAction::Bulk { category, ids }) => {
                    commands::cmd_transactions_bulk(&db, cli.user, &ids, &category)
                }
                Some(TransactionsAction::Matches { id }) => {
                    commands::cmd_transactions_matches(&db, cli.user, id)
                }
            }
        }
        Commands::ApplyRules => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_apply_rules(&db, cli.user)
        }
        Commands::Conflicts => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_conflicts(&db, cli.user)
        }
        Commands::Import {
            files,
            account,
            map,
            layout,
            no_header,
            save_preset,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(
                &db,
                cli.user,
                account,
                &files,
                map.as_deref(),
                layout.as_deref(),
                !no_header,
                save_preset,
                json,
            )
        }
        Commands::ForceImport { file, account } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_force_import(&db, cli.user, account, &file)
        }
        Commands::DetectDateFormat {
            file,
            column,
            no_header,
        } => commands::cmd_detect_date_format(&file, column, !no_header),
    }
}
