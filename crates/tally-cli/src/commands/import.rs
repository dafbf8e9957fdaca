//! Import command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::dates;
use tracing::debug;
use tally_core::db::Database;
use tally_core::import::{
    AmountLayout, ColumnMapping, CsvFile, CsvImporter, ImportCandidate, ImportReport,
};

fn read_files(paths: &[PathBuf]) -> Result<Vec<CsvFile>> {
    paths
        .iter()
        .map(|path| {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok(CsvFile { name, contents })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_import(
    db: &Database,
    user_id: i64,
    account_id: i64,
    paths: &[PathBuf],
    map: Option<&str>,
    layout: Option<&str>,
    has_header_row: bool,
    save_preset: bool,
    json: bool,
) -> Result<()> {
    // Explicit flags win; the account's saved preset fills the gaps
    let preset = db.get_mapping_preset(user_id, account_id)?;

    let mapping = match map {
        Some(spec) => ColumnMapping::parse(spec)?,
        None => preset
            .as_ref()
            .map(|p| p.mapping.clone())
            .context("No --map given and no saved preset for this account")?,
    };
    let layout = match layout {
        Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => preset
            .as_ref()
            .and_then(|p| p.layout)
            .unwrap_or(AmountLayout::Single),
    };

    let files = read_files(paths)?;
    debug!("Importing {} files with mapping {}", files.len(), mapping);

    let importer = CsvImporter::new(db);
    let report = importer.import(user_id, account_id, &files, &mapping, has_header_row, layout)?;

    if save_preset {
        db.save_mapping_preset(
            user_id,
            account_id,
            &mapping,
            report.detected_date_format.as_deref(),
            Some(layout),
        )?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!();
    println!("📥 Import complete");
    if let Some(ref format) = report.detected_date_format {
        println!("   Date format: {}", format);
    }
    println!(
        "   {} inserted, {} duplicates, {} errors",
        report.inserted_count,
        report.duplicate_count,
        report.errors.len()
    );

    for file in &report.files {
        println!(
            "   • {}: {} rows → {} imported, {} duplicates, {} errors",
            file.file_name,
            file.row_count,
            file.imported_count,
            file.duplicate_count,
            file.error_count
        );
        for error in &file.errors {
            match error.row {
                Some(row) => println!("       row {}: {}", row, error.message),
                None => println!("       {}", error.message),
            }
        }
    }

    if report.duplicate_count > 0 {
        println!();
        println!(
            "   {} duplicates were skipped. Re-run with --json, save the",
            report.duplicate_count
        );
        println!("   'duplicates' array to a file, and use 'tally force-import'");
        println!("   to insert them anyway.");
    }
}

pub fn cmd_force_import(db: &Database, user_id: i64, account_id: i64, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let candidates: Vec<ImportCandidate> =
        serde_json::from_str(&contents).context("Candidate file is not a JSON candidate array")?;

    let summary = CsvImporter::new(db).force_import(user_id, account_id, &candidates)?;
    println!(
        "✅ Force-imported {} of {} candidates",
        summary.inserted_count,
        candidates.len()
    );
    Ok(())
}

pub fn cmd_detect_date_format(file: &Path, column: usize, has_header_row: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(has_header_row)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut samples = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(value) = record.get(column) {
            if !value.trim().is_empty() {
                samples.push(value.trim().to_string());
            }
        }
    }

    match dates::detect_date_format(&samples, 20) {
        Some(detection) => {
            println!(
                "Detected {} (e.g. {}) with {:.0}% confidence ({}/{} samples)",
                detection.format.label,
                detection.format.example(),
                detection.confidence * 100.0,
                detection.valid_samples,
                detection.total_samples
            );
        }
        None => {
            println!("Could not detect a date format from {} samples", samples.len());
        }
    }

    Ok(())
}
