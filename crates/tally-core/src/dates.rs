//! Date format detection for user-supplied tabular data
//!
//! Bank CSV exports disagree wildly on date layout, and numeric layouts are
//! genuinely ambiguous (`01/02/2023` is January 2nd or February 1st depending
//! on the bank). Detection counts how many samples each candidate layout
//! parses *strictly*, picks the highest hit rate, and lets the caller decide
//! whether the confidence is good enough to trust.

use chrono::NaiveDate;
use serde::Serialize;

/// Storage/dedup date layout
pub const CANONICAL_PATTERN: &str = "%Y-%m-%d";

/// A candidate date layout: the label shown to users and stored in presets,
/// and the chrono pattern that implements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateFormat {
    pub label: &'static str,
    pub pattern: &'static str,
}

/// Candidate layouts in priority order: ISO first, then US, then EU, then
/// short-year and month-name variants. When two layouts explain the samples
/// equally well, the earlier entry wins. That bias is deliberate; fully
/// unambiguous detection is not possible for numeric layouts.
pub static DATE_FORMATS: [DateFormat; 16] = [
    DateFormat { label: "YYYY-MM-DD", pattern: "%Y-%m-%d" },
    DateFormat { label: "MM/DD/YYYY", pattern: "%m/%d/%Y" },
    DateFormat { label: "DD/MM/YYYY", pattern: "%d/%m/%Y" },
    DateFormat { label: "M/D/YYYY", pattern: "%-m/%-d/%Y" },
    DateFormat { label: "D/M/YYYY", pattern: "%-d/%-m/%Y" },
    DateFormat { label: "MM-DD-YYYY", pattern: "%m-%d-%Y" },
    DateFormat { label: "DD-MM-YYYY", pattern: "%d-%m-%Y" },
    DateFormat { label: "YYYY/MM/DD", pattern: "%Y/%m/%d" },
    DateFormat { label: "MM/DD/YY", pattern: "%m/%d/%y" },
    DateFormat { label: "DD/MM/YY", pattern: "%d/%m/%y" },
    DateFormat { label: "M/D/YY", pattern: "%-m/%-d/%y" },
    DateFormat { label: "D/M/YY", pattern: "%-d/%-m/%y" },
    DateFormat { label: "MMM DD, YYYY", pattern: "%b %d, %Y" },
    DateFormat { label: "DD MMM YYYY", pattern: "%d %b %Y" },
    DateFormat { label: "MMMM DD, YYYY", pattern: "%B %d, %Y" },
    DateFormat { label: "DD MMMM YYYY", pattern: "%d %B %Y" },
];

impl DateFormat {
    /// Example rendering for CLI display
    pub fn example(&self) -> &'static str {
        match self.label {
            "YYYY-MM-DD" => "2023-12-25",
            "MM/DD/YYYY" => "12/25/2023",
            "DD/MM/YYYY" => "25/12/2023",
            "M/D/YYYY" => "12/5/2023",
            "D/M/YYYY" => "5/12/2023",
            "MM-DD-YYYY" => "12-25-2023",
            "DD-MM-YYYY" => "25-12-2023",
            "YYYY/MM/DD" => "2023/12/25",
            "MM/DD/YY" => "12/25/23",
            "DD/MM/YY" => "25/12/23",
            "M/D/YY" => "12/5/23",
            "D/M/YY" => "5/12/23",
            "MMM DD, YYYY" => "Dec 25, 2023",
            "DD MMM YYYY" => "25 Dec 2023",
            "MMMM DD, YYYY" => "December 25, 2023",
            "DD MMMM YYYY" => "25 December 2023",
            _ => "",
        }
    }
}

/// Result of running detection over a sample set
#[derive(Debug, Clone, Serialize)]
pub struct FormatDetection {
    pub format: &'static DateFormat,
    pub confidence: f64,
    pub valid_samples: usize,
    pub total_samples: usize,
}

/// Look up a layout by its label (e.g. from a stored mapping preset or a
/// force-import candidate).
pub fn find_format(label: &str) -> Option<&'static DateFormat> {
    DATE_FORMATS.iter().find(|f| f.label == label)
}

/// Strict parse: the string must fully match the layout, padding included.
///
/// chrono's numeric parsing accepts both `1` and `01` for `%m`, so parsing
/// alone cannot tell `MM/DD/YYYY` from `M/D/YYYY`. Re-formatting the parsed
/// date with the same pattern and comparing against the input restores the
/// exact-layout requirement.
fn parse_strict(raw: &str, format: &DateFormat) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, format.pattern).ok()?;
    if date.format(format.pattern).to_string() == raw {
        Some(date)
    } else {
        None
    }
}

/// Detect which layout best explains a set of raw date strings.
///
/// At most `max_samples` samples are tested. For each candidate layout the
/// confidence is the fraction of tested samples that parse strictly; the
/// highest confidence wins, ties preferring the earlier entry in
/// [`DATE_FORMATS`] (a later entry displaces an earlier one only on strictly
/// higher confidence, or equal confidence with strictly more valid samples).
/// Returns `None` when the sample list is empty or nothing parses.
pub fn detect_date_format(samples: &[String], max_samples: usize) -> Option<FormatDetection> {
    if samples.is_empty() {
        return None;
    }

    let probe = &samples[..samples.len().min(max_samples)];
    let mut best: Option<FormatDetection> = None;

    for format in &DATE_FORMATS {
        let valid = probe
            .iter()
            .filter(|s| parse_strict(s, format).is_some())
            .count();
        if valid == 0 {
            continue;
        }

        let confidence = valid as f64 / probe.len() as f64;
        let better = match &best {
            None => true,
            Some(b) => {
                confidence > b.confidence
                    || (confidence == b.confidence && valid > b.valid_samples)
            }
        };
        if better {
            best = Some(FormatDetection {
                format,
                confidence,
                valid_samples: valid,
                total_samples: probe.len(),
            });
        }
    }

    best
}

/// Parse a raw date string under the given layout. Returns `None` (never an
/// error) when the string does not strictly match.
pub fn parse_date(raw: &str, format: &DateFormat) -> Option<NaiveDate> {
    parse_strict(raw, format)
}

/// Convert a raw date string to the canonical `YYYY-MM-DD` form under the
/// given layout. Returns `None` (never an error) when the string does not
/// strictly match.
pub fn convert_date(raw: &str, format: &DateFormat) -> Option<String> {
    parse_strict(raw, format).map(|d| d.format(CANONICAL_PATTERN).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_iso() {
        let detection =
            detect_date_format(&samples(&["2024-01-05", "2024-02-10", "2024-03-15"]), 20)
                .expect("detection failed");
        assert_eq!(detection.format.label, "YYYY-MM-DD");
        assert_eq!(detection.confidence, 1.0);
        assert_eq!(detection.valid_samples, 3);
        assert_eq!(detection.total_samples, 3);
    }

    #[test]
    fn test_detect_unambiguous_eu() {
        // Day 13/14 rules out any MM/DD reading
        let detection = detect_date_format(&samples(&["13/01/2024", "14/01/2024"]), 20)
            .expect("detection failed");
        assert_eq!(detection.format.label, "DD/MM/YYYY");
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_ambiguous_prefers_earlier_format() {
        // Parses under both MM/DD and DD/MM; the priority order breaks the tie
        let detection = detect_date_format(&samples(&["01/02/2023"]), 20).unwrap();
        assert_eq!(detection.format.label, "MM/DD/YYYY");
    }

    #[test]
    fn test_strictness_rejects_unpadded_for_padded_layout() {
        let padded = find_format("MM/DD/YYYY").unwrap();
        let unpadded = find_format("M/D/YYYY").unwrap();
        assert!(convert_date("1/2/2023", padded).is_none());
        assert_eq!(convert_date("1/2/2023", unpadded).as_deref(), Some("2023-01-02"));
        // And the reverse: padded input fails the unpadded layout
        assert!(convert_date("01/02/2023", unpadded).is_none());
    }

    #[test]
    fn test_detect_month_names() {
        let detection = detect_date_format(&samples(&["Jan 05, 2024", "Feb 10, 2024"]), 20)
            .expect("detection failed");
        assert_eq!(detection.format.label, "MMM DD, YYYY");
        assert_eq!(
            convert_date("Jan 05, 2024", detection.format).as_deref(),
            Some("2024-01-05")
        );
    }

    #[test]
    fn test_detect_short_year() {
        let detection = detect_date_format(&samples(&["12/25/23", "11/30/23"]), 20)
            .expect("detection failed");
        assert_eq!(detection.format.label, "MM/DD/YY");
        assert_eq!(
            convert_date("12/25/23", detection.format).as_deref(),
            Some("2023-12-25")
        );
    }

    #[test]
    fn test_detect_mixed_samples_majority_wins() {
        // Three EU-only dates and one that parses either way: DD/MM explains 4/4
        let detection = detect_date_format(
            &samples(&["13/01/2024", "25/01/2024", "30/01/2024", "01/02/2024"]),
            20,
        )
        .unwrap();
        assert_eq!(detection.format.label, "DD/MM/YYYY");
        assert_eq!(detection.valid_samples, 4);
    }

    #[test]
    fn test_detect_respects_sample_cap() {
        let mut raw: Vec<String> = (1..=30).map(|d| format!("2024-01-{:02}", d)).collect();
        // Garbage beyond the cap must not affect the result
        raw.push("not a date".to_string());
        let detection = detect_date_format(&raw, 20).unwrap();
        assert_eq!(detection.total_samples, 20);
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn test_detect_nothing_parses() {
        assert!(detect_date_format(&samples(&["nope", "also nope"]), 20).is_none());
        assert!(detect_date_format(&[], 20).is_none());
    }

    #[test]
    fn test_convert_invalid_returns_none() {
        let iso = find_format("YYYY-MM-DD").unwrap();
        assert!(convert_date("2024-13-01", iso).is_none());
        assert!(convert_date("garbage", iso).is_none());
        assert!(convert_date("2024-02-30", iso).is_none());
    }

    #[test]
    fn test_round_trip_property() {
        // Every sample that contributed to the detected format's valid count
        // must convert successfully under that format.
        let cases = [
            vec!["2024-01-05", "2024-02-10"],
            vec!["12/25/2023", "01/15/2023"],
            vec!["25/12/2023", "13/01/2023"],
            vec!["5/1/23", "12/31/23"],
            vec!["25 Dec 2023", "01 Jan 2024"],
        ];
        for raw in cases {
            let list = samples(&raw);
            let detection = detect_date_format(&list, 20).expect("detection failed");
            for sample in &list {
                assert!(
                    convert_date(sample, detection.format).is_some(),
                    "sample {:?} did not round-trip under {}",
                    sample,
                    detection.format.label
                );
            }
        }
    }

    #[test]
    fn test_find_format() {
        assert!(find_format("YYYY-MM-DD").is_some());
        assert!(find_format("DD MMMM YYYY").is_some());
        assert!(find_format("QQ/WW/EEEE").is_none());
    }
}
