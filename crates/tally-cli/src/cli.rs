//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Track accounts, import bank CSVs, auto-categorize spending
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted personal finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// User scope to operate in
    #[arg(short, long, default_value = "1", global = true)]
    pub user: i64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed default categories
    Init {
        /// Name for the initial user
        #[arg(long, default_value = "default")]
        user_name: String,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// List and categorize transactions
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Apply rules to every uncategorized transaction
    ApplyRules,

    /// Report unresolved categorization conflicts
    Conflicts,

    /// Import CSV files into an account
    Import {
        /// CSV files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target account ID
        #[arg(short, long)]
        account: i64,

        /// Column mapping, e.g. "date,description,amount" or
        /// "date,ignore,description,debit,credit" (defaults to the account's
        /// saved preset)
        #[arg(short, long)]
        map: Option<String>,

        /// Amount layout: "single" (one signed column) or "split" (separate
        /// debit/credit magnitudes)
        #[arg(short, long)]
        layout: Option<String>,

        /// Treat the first row as data, not a header
        #[arg(long)]
        no_header: bool,

        /// Save the mapping and layout as the account's preset
        #[arg(long)]
        save_preset: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Force-import duplicate candidates from a JSON file
    ForceImport {
        /// JSON file of candidates (the `duplicates` array of an import
        /// report)
        #[arg(short, long)]
        file: PathBuf,

        /// Target account ID
        #[arg(short, long)]
        account: i64,
    },

    /// Probe a CSV column and report the detected date format
    DetectDateFormat {
        /// CSV file to probe
        #[arg(short, long)]
        file: PathBuf,

        /// Zero-based column index containing dates
        #[arg(short, long, default_value = "0")]
        column: usize,

        /// Treat the first row as data, not a header
        #[arg(long)]
        no_header: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts
    List,
    /// Add an account
    Add {
        /// Account name
        name: String,
        /// Account kind: checking, savings, credit
        #[arg(long)]
        kind: Option<String>,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,
    /// Add a category
    Add {
        /// Category name
        name: String,
        /// Parent category name or ID
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a category (fails while transactions, rules, or children
    /// reference it)
    Delete {
        /// Category ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules, most recent first
    List,
    /// Add a rule mapping a pattern to a category
    Add {
        /// Pattern to match against transaction descriptions
        pattern: String,
        /// Target category name or ID
        category: String,
    },
    /// Delete a rule
    Delete {
        /// Rule ID
        id: i64,
    },
    /// Show which rules match a description, ranked by specificity
    Test {
        /// Description to test
        description: String,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List transactions
    List {
        /// Filter by account ID
        #[arg(long)]
        account: Option<i64>,
        /// Filter by description substring
        #[arg(long)]
        search: Option<String>,
        /// Only uncategorized transactions
        #[arg(long)]
        uncategorized: bool,
        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Assign a category to a transaction ("none" clears it)
    SetCategory {
        /// Transaction ID
        id: i64,
        /// Category name, ID, or "none"
        category: String,
    },
    /// Assign a category to many transactions at once
    Bulk {
        /// Category name, ID, or "none"
        category: String,
        /// Transaction IDs
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Show the rules matching a transaction's description
    Matches {
        /// Transaction ID
        id: i64,
    },
}
