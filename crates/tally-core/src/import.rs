//! Mapping-driven CSV import with reconciliation
//!
//! Uploaded files arrive as positional columns plus a user-supplied mapping
//! of each column to a field role. Per file, the pipeline detects the date
//! layout from a sample of date cells, rejects the file when detection is
//! not confident enough, derives signed amounts from either a single amount
//! column or a split debit/credit pair, and routes candidates that collide
//! with the `date|description|amount` dedup set to a duplicates list instead
//! of inserting them. A failing file never aborts the rest of the batch.

use std::collections::HashSet;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::{self, DATE_FORMATS};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::NewTransaction;

/// How many date cells are sampled for format detection
const DATE_SAMPLE_LIMIT: usize = 20;

/// Minimum detection confidence to proceed with a file. Importing with an
/// unreliable date format is rejected outright rather than guessed.
const MIN_DATE_CONFIDENCE: f64 = 0.8;

/// The field role a CSV column is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Ignore,
    Date,
    Description,
    Amount,
    Debit,
    Credit,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Date => "date",
            Self::Description => "description",
            Self::Amount => "amount",
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for ColumnRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "date" => Ok(Self::Date),
            "description" => Ok(Self::Description),
            "amount" => Ok(Self::Amount),
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown column role: {}", s)),
        }
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Debit/credit handling for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountLayout {
    /// One signed amount column (or a literal debit minus credit)
    Single,
    /// Distinct debit and credit columns, each an unsigned magnitude
    Split,
}

impl AmountLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Split => "split",
        }
    }
}

impl std::str::FromStr for AmountLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "split" => Ok(Self::Split),
            _ => Err(format!("Unknown amount layout: {}", s)),
        }
    }
}

impl std::fmt::Display for AmountLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which half of a split-layout row a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitSide {
    Debit,
    Credit,
}

/// Positional column-to-role mapping, one role per CSV column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(Vec<ColumnRole>);

impl ColumnMapping {
    pub fn new(roles: Vec<ColumnRole>) -> Self {
        Self(roles)
    }

    /// Parse a comma-separated role list, e.g. `date,description,amount` or
    /// `date,ignore,description,debit,credit`
    pub fn parse(spec: &str) -> Result<Self> {
        let roles = spec
            .split(',')
            .map(|part| part.parse::<ColumnRole>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::InvalidData)?;
        if roles.is_empty() {
            return Err(Error::InvalidData("empty column mapping".to_string()));
        }
        Ok(Self(roles))
    }

    pub fn roles(&self) -> &[ColumnRole] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First column mapped to the given role
    fn index_of(&self, role: ColumnRole) -> Option<usize> {
        self.0.iter().position(|r| *r == role)
    }
}

impl std::fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(|r| r.as_str()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// A saved per-account import configuration
#[derive(Debug, Clone, Serialize)]
pub struct MappingPreset {
    pub account_id: i64,
    pub mapping: ColumnMapping,
    pub date_format: Option<String>,
    pub layout: Option<AmountLayout>,
}

/// One uploaded file: a name for reporting plus its raw contents
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub name: String,
    pub contents: String,
}

/// A row- or file-scoped problem recorded during import. Never aborts the
/// batch.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub file: String,
    /// 1-based data row, or None for file-level problems
    pub row: Option<usize>,
    pub message: String,
}

/// A transaction candidate that collided with the dedup set, carrying enough
/// of its mapped data to be force-imported later
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCandidate {
    /// Raw date cell as it appeared in the file
    pub date: String,
    pub description: String,
    pub amount: Option<f64>,
    pub debit: Option<f64>,
    pub credit: Option<f64>,
    /// Which half of a split row this candidate is
    pub split: Option<SplitSide>,
    pub layout: AmountLayout,
    /// Label of the date format the file was imported under
    pub date_format: String,
}

/// Per-file import summary
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub file_name: String,
    pub row_count: usize,
    pub imported_count: usize,
    pub duplicate_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
}

/// Overall import result across all files in a request
#[derive(Debug, Clone, Serialize, Default)]
pub struct ImportReport {
    pub inserted_count: usize,
    pub duplicate_count: usize,
    pub duplicates: Vec<ImportCandidate>,
    pub errors: Vec<RowError>,
    pub detected_date_format: Option<String>,
    pub files: Vec<FileSummary>,
}

/// Result of force-importing previously flagged duplicates
#[derive(Debug, Clone, Serialize)]
pub struct ForceImportSummary {
    pub inserted_count: usize,
}

/// Composite dedup key. Uses the canonical date, the exact description
/// string, and the amount's shortest decimal rendering; the same helper keys
/// both stored rows and incoming candidates so the comparison stays
/// self-consistent.
fn dedup_key(date: &str, description: &str, amount: f64) -> String {
    format!("{}|{}|{}", date, description, amount)
}

/// Trimmed, non-empty value of the first column mapped to a role
fn mapped_cell<'r>(
    mapping: &ColumnMapping,
    row: &'r csv::StringRecord,
    role: ColumnRole,
) -> Option<&'r str> {
    mapping
        .index_of(role)
        .and_then(|idx| row.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parse an amount string, handling currency symbols, thousands separators,
/// and parenthesized negatives
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// CSV reconciliation engine
pub struct CsvImporter<'a> {
    db: &'a Database,
}

impl<'a> CsvImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Import one or more files into an account.
    ///
    /// The dedup set is seeded from the account's existing transactions and
    /// extended as rows insert, so duplicates within the batch are caught as
    /// well as pre-existing ones. A file that fails to parse or whose date
    /// format cannot be detected confidently is skipped with an error; the
    /// remaining files continue.
    pub fn import(
        &self,
        user_id: i64,
        account_id: i64,
        files: &[CsvFile],
        mapping: &ColumnMapping,
        has_header_row: bool,
        layout: AmountLayout,
    ) -> Result<ImportReport> {
        self.db.assert_account_owner(user_id, account_id)?;

        let mut seen: HashSet<String> = self
            .db
            .list_account_transactions(user_id, account_id)?
            .iter()
            .map(|tx| dedup_key(&tx.date.to_string(), &tx.description, tx.amount))
            .collect();

        let mut report = ImportReport::default();

        for file in files {
            let summary = self.import_file(
                user_id,
                account_id,
                file,
                mapping,
                has_header_row,
                layout,
                &mut seen,
                &mut report,
            );
            debug!(
                "Imported {}: {} rows, {} inserted, {} duplicates, {} errors",
                summary.file_name,
                summary.row_count,
                summary.imported_count,
                summary.duplicate_count,
                summary.error_count
            );
            report.files.push(summary);
        }

        report.duplicate_count = report.duplicates.len();
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn import_file(
        &self,
        user_id: i64,
        account_id: i64,
        file: &CsvFile,
        mapping: &ColumnMapping,
        has_header_row: bool,
        layout: AmountLayout,
        seen: &mut HashSet<String>,
        report: &mut ImportReport,
    ) -> FileSummary {
        let mut summary = FileSummary {
            file_name: file.name.clone(),
            row_count: 0,
            imported_count: 0,
            duplicate_count: 0,
            error_count: 0,
            errors: Vec::new(),
        };

        let record_error = |summary: &mut FileSummary,
                                report: &mut ImportReport,
                                row: Option<usize>,
                                message: String| {
            let error = RowError {
                file: file.name.clone(),
                row,
                message,
            };
            summary.error_count += 1;
            summary.errors.push(error.clone());
            report.errors.push(error);
        };

        let mut rdr = ReaderBuilder::new()
            .has_headers(has_header_row)
            .flexible(true)
            .from_reader(file.contents.as_bytes());

        let mut rows = Vec::new();
        for record in rdr.records() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) => {
                    record_error(
                        &mut summary,
                        report,
                        None,
                        format!("failed to parse CSV file: {}", e),
                    );
                    return summary;
                }
            }
        }
        summary.row_count = rows.len();
        if rows.is_empty() {
            return summary;
        }

        if mapping.len() != rows[0].len() {
            record_error(
                &mut summary,
                report,
                None,
                format!(
                    "column mapping has {} entries but the file has {} columns",
                    mapping.len(),
                    rows[0].len()
                ),
            );
            return summary;
        }

        // Sample date cells from the leading rows and detect the layout
        let mut date_samples = Vec::new();
        for row in rows.iter().take(DATE_SAMPLE_LIMIT) {
            for (idx, role) in mapping.roles().iter().enumerate() {
                if *role == ColumnRole::Date {
                    if let Some(value) = row.get(idx) {
                        if !value.trim().is_empty() {
                            date_samples.push(value.trim().to_string());
                        }
                    }
                }
            }
        }

        let detection = match dates::detect_date_format(&date_samples, DATE_SAMPLE_LIMIT) {
            Some(d) if d.confidence >= MIN_DATE_CONFIDENCE => d,
            _ => {
                record_error(
                    &mut summary,
                    report,
                    None,
                    "could not reliably detect date format; ensure all dates are consistent"
                        .to_string(),
                );
                return summary;
            }
        };
        if report.detected_date_format.is_none() {
            report.detected_date_format = Some(detection.format.label.to_string());
        }
        debug!(
            "{}: detected date format {} ({}/{} samples)",
            file.name, detection.format.label, detection.valid_samples, detection.total_samples
        );

        for (i, row) in rows.iter().enumerate() {
            let row_number = i + 1;

            let date_raw = mapped_cell(mapping, row, ColumnRole::Date);
            let description = mapped_cell(mapping, row, ColumnRole::Description);
            let amount_raw = mapped_cell(mapping, row, ColumnRole::Amount);
            let debit_raw = mapped_cell(mapping, row, ColumnRole::Debit);
            let credit_raw = mapped_cell(mapping, row, ColumnRole::Credit);

            let (date_raw, description) = match (date_raw, description) {
                (Some(date), Some(desc))
                    if amount_raw.is_some() || debit_raw.is_some() || credit_raw.is_some() =>
                {
                    (date, desc)
                }
                _ => {
                    record_error(
                        &mut summary,
                        report,
                        Some(row_number),
                        "missing required fields".to_string(),
                    );
                    continue;
                }
            };

            let date = match dates::parse_date(date_raw, detection.format) {
                Some(date) => date,
                None => {
                    record_error(
                        &mut summary,
                        report,
                        Some(row_number),
                        format!("invalid date: {}", date_raw),
                    );
                    continue;
                }
            };
            let iso_date = date.to_string();

            let debit = debit_raw.and_then(parse_amount);
            let credit = credit_raw.and_then(parse_amount);

            // A split row may yield zero, one, or two candidates
            let mut candidates: Vec<(f64, Option<SplitSide>)> = Vec::new();
            match layout {
                AmountLayout::Single => {
                    let amount = match amount_raw {
                        Some(raw) => match parse_amount(raw) {
                            Some(amount) => amount,
                            None => {
                                record_error(
                                    &mut summary,
                                    report,
                                    Some(row_number),
                                    format!("invalid amount: {}", raw),
                                );
                                continue;
                            }
                        },
                        // Absent or non-numeric debit/credit default to zero
                        None => debit.unwrap_or(0.0) - credit.unwrap_or(0.0),
                    };
                    candidates.push((amount, None));
                }
                AmountLayout::Split => {
                    if let Some(debit) = debit {
                        if debit != 0.0 {
                            candidates.push((-debit.abs(), Some(SplitSide::Debit)));
                        }
                    }
                    if let Some(credit) = credit {
                        if credit != 0.0 {
                            candidates.push((credit.abs(), Some(SplitSide::Credit)));
                        }
                    }
                }
            }

            for (amount, split) in candidates {
                let key = dedup_key(&iso_date, description, amount);
                if seen.contains(&key) {
                    report.duplicates.push(ImportCandidate {
                        date: date_raw.to_string(),
                        description: description.to_string(),
                        amount: amount_raw.and_then(parse_amount),
                        debit,
                        credit,
                        split,
                        layout,
                        date_format: detection.format.label.to_string(),
                    });
                    summary.duplicate_count += 1;
                    continue;
                }

                let new_tx = NewTransaction {
                    account_id,
                    date,
                    description: description.to_string(),
                    amount,
                    category_id: None,
                };
                match self.db.insert_transaction(user_id, &new_tx) {
                    Ok(_) => {
                        seen.insert(key);
                        summary.imported_count += 1;
                        report.inserted_count += 1;
                    }
                    Err(e) => {
                        record_error(&mut summary, report, Some(row_number), e.to_string());
                    }
                }
            }
        }

        summary
    }

    /// Insert previously flagged duplicate candidates unconditionally.
    ///
    /// This is the explicit user override of dedup. Candidates whose date no
    /// longer parses are skipped, as are rows that hit a storage-level
    /// uniqueness constraint; anything else propagates.
    pub fn force_import(
        &self,
        user_id: i64,
        account_id: i64,
        candidates: &[ImportCandidate],
    ) -> Result<ForceImportSummary> {
        self.db.assert_account_owner(user_id, account_id)?;

        let mut inserted = 0;
        for candidate in candidates {
            let format = dates::find_format(&candidate.date_format).unwrap_or(&DATE_FORMATS[0]);
            let date = match dates::parse_date(&candidate.date, format) {
                Some(date) => date,
                None => continue,
            };

            let amount = match candidate.layout {
                AmountLayout::Split => match candidate.split {
                    Some(SplitSide::Debit) => -candidate.debit.unwrap_or(0.0).abs(),
                    Some(SplitSide::Credit) => candidate.credit.unwrap_or(0.0).abs(),
                    None => continue,
                },
                AmountLayout::Single => match candidate.amount {
                    Some(amount) => amount,
                    None => candidate.debit.unwrap_or(0.0) - candidate.credit.unwrap_or(0.0),
                },
            };

            let new_tx = NewTransaction {
                account_id,
                date,
                description: candidate.description.clone(),
                amount,
                category_id: None,
            };
            match self.db.insert_transaction(user_id, &new_tx) {
                Ok(_) => inserted += 1,
                Err(Error::Database(rusqlite::Error::SqliteFailure(e, _)))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    debug!(
                        "Skipping candidate '{}' on uniqueness constraint",
                        candidate.description
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ForceImportSummary {
            inserted_count: inserted,
        })
    }
}
