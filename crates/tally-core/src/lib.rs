//! Tally Core Library
//!
//! Shared functionality for the Tally personal finance tracker:
//! - Database access and migrations
//! - Date format detection for user-supplied CSV data
//! - Rule matching and conflict resolution for auto-categorization
//! - Mapping-driven CSV import with deduplication

pub mod dates;
pub mod db;
pub mod error;
pub mod import;
pub mod matcher;
pub mod models;

/// Test fixtures (seed helpers for users, accounts, categories, rules)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use dates::{
    convert_date, detect_date_format, find_format, parse_date, DateFormat, FormatDetection,
    DATE_FORMATS,
};
pub use db::{Database, SchemaChange};
pub use error::{Error, Result};
pub use import::{
    AmountLayout, ColumnMapping, ColumnRole, CsvFile, CsvImporter, FileSummary,
    ForceImportSummary, ImportCandidate, ImportReport, MappingPreset, RowError, SplitSide,
};
pub use matcher::{
    best_matches, match_type, matching_rules, ApplyRulesSummary, BestMatches,
    CategorizationConflict, Categorizer, MatchResult, MatchType,
};
