//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init and shared utilities (open_db, category resolution)
//! - `accounts` - Account management commands
//! - `categories` - Category management commands
//! - `rules` - Rule management and testing commands
//! - `transactions` - Transaction listing and categorization commands
//! - `import` - CSV import, force-import, and date-format probing

pub mod accounts;
pub mod categories;
pub mod core;
pub mod import;
pub mod rules;
pub mod transactions;

// Re-export command functions for main.rs
pub use accounts::*;
pub use categories::*;
pub use core::*;
pub use import::*;
pub use rules::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
