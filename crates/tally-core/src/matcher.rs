//! Rule matching and conflict resolution for transaction categorization
//!
//! Matching is purely deterministic string-pattern work: a rule pattern is
//! ranked against a description by how specifically it matches (exact, then
//! prefix, then whole word, then substring). When several rules tie at the
//! best rank for a transaction, that transaction is a conflict and is never
//! auto-categorized; ties are surfaced for manual review even when every tied
//! rule points at the same category.

use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::CategorizationRule;

/// How specifically a rule pattern matches a description. Lower rank is more
/// specific; the derived ordering follows variant order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchType {
    /// Pattern equals the description exactly
    Exact,
    /// Description starts with the pattern
    Prefix,
    /// Pattern occurs as a whole word in the description
    Word,
    /// Pattern occurs anywhere in the description
    Substring,
}

impl MatchType {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Prefix => 1,
            Self::Word => 2,
            Self::Substring => 3,
        }
    }
}

impl Serialize for MatchType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.rank())
    }
}

/// A rule that matched a description, with its specificity rank
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub rule_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub pattern: String,
    #[serde(rename = "matchType")]
    pub match_type: MatchType,
}

/// The subset of matches tied at the most specific rank
#[derive(Debug, Clone)]
pub struct BestMatches {
    pub best_type: MatchType,
    pub matches: Vec<MatchResult>,
}

/// Summary of a bulk rule application run
#[derive(Debug, Clone, Serialize)]
pub struct ApplyRulesSummary {
    pub categorized: i64,
    pub conflicts: i64,
}

/// A transaction whose best-ranked rule matches are tied across two or more
/// rules, blocking automatic categorization
#[derive(Debug, Clone, Serialize)]
pub struct CategorizationConflict {
    pub transaction_id: i64,
    pub description: String,
    pub rules: Vec<MatchResult>,
}

/// Rank how specifically `pattern` matches `description`.
///
/// Both sides are trimmed and lowercased. Evaluation order is strict: exact
/// equality, prefix, whole-word (the pattern is regex-escaped before the
/// boundary match, so user patterns containing regex metacharacters stay
/// literal), substring. `None` means the rule does not apply.
pub fn match_type(pattern: &str, description: &str) -> Result<Option<MatchType>> {
    let p = pattern.trim().to_lowercase();
    let d = description.trim().to_lowercase();

    if p == d {
        return Ok(Some(MatchType::Exact));
    }
    if d.starts_with(&p) {
        return Ok(Some(MatchType::Prefix));
    }
    let word = Regex::new(&format!(r"\b{}\b", regex::escape(&p)))?;
    if word.is_match(&d) {
        return Ok(Some(MatchType::Word));
    }
    if d.contains(&p) {
        return Ok(Some(MatchType::Substring));
    }

    Ok(None)
}

/// Evaluate every rule against a description, keeping only the ones that
/// match. `rules` is expected in retrieval order (`id` descending); the
/// output preserves it.
pub fn matching_rules(
    rules: &[CategorizationRule],
    description: &str,
) -> Result<Vec<MatchResult>> {
    let mut matches = Vec::new();

    for rule in rules {
        if let Some(match_type) = match_type(&rule.pattern, description)? {
            matches.push(MatchResult {
                rule_id: rule.id,
                category_id: rule.category_id,
                category_name: rule.category_name.clone(),
                pattern: rule.pattern.clone(),
                match_type,
            });
        }
    }

    Ok(matches)
}

/// Reduce a match list to the entries tied at the most specific rank.
/// Empty input yields `None`.
pub fn best_matches(matches: &[MatchResult]) -> Option<BestMatches> {
    let best_type = matches.iter().map(|m| m.match_type).min()?;
    Some(BestMatches {
        best_type,
        matches: matches
            .iter()
            .filter(|m| m.match_type == best_type)
            .cloned()
            .collect(),
    })
}

/// Categorization engine over a user's rules and transactions
pub struct Categorizer<'a> {
    db: &'a Database,
}

impl<'a> Categorizer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All rules matching a transaction's description, most recent rule
    /// first. Returns an empty list when the transaction does not exist in
    /// the user's scope or has a blank description.
    pub fn matching_rules_for_transaction(
        &self,
        user_id: i64,
        transaction_id: i64,
    ) -> Result<Vec<MatchResult>> {
        let transaction = match self.db.get_transaction(user_id, transaction_id)? {
            Some(tx) => tx,
            None => return Ok(Vec::new()),
        };
        if transaction.description.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rules = self.db.list_rules(user_id)?;
        matching_rules(&rules, &transaction.description)
    }

    /// Apply rules to every uncategorized transaction in the user's scope.
    ///
    /// Each transaction is decided independently: a single best match assigns
    /// its category; two or more matches tied at the best rank count as a
    /// conflict and leave the transaction untouched. Only `category_id IS
    /// NULL` rows are eligible, so re-running never recategorizes.
    pub fn apply_rules_to_uncategorized(&self, user_id: i64) -> Result<ApplyRulesSummary> {
        let rules = self.db.list_rules(user_id)?;
        let uncategorized = self.db.list_uncategorized(user_id)?;

        let mut summary = ApplyRulesSummary {
            categorized: 0,
            conflicts: 0,
        };

        for tx in &uncategorized {
            if tx.description.trim().is_empty() {
                continue;
            }
            let matches = matching_rules(&rules, &tx.description)?;
            let best = match best_matches(&matches) {
                Some(best) => best,
                None => continue,
            };
            if best.matches.len() == 1 {
                self.db
                    .set_category(user_id, tx.id, Some(best.matches[0].category_id))?;
                debug!(
                    "Categorized '{}' as {} (rule {})",
                    tx.description, best.matches[0].category_name, best.matches[0].rule_id
                );
                summary.categorized += 1;
            } else {
                // Tie count at the best rank is the conflict signal, even
                // when every tied rule names the same category.
                summary.conflicts += 1;
            }
        }

        debug!(
            "Rule application: {} categorized, {} conflicts",
            summary.categorized, summary.conflicts
        );
        Ok(summary)
    }

    /// Re-derive the tie logic for reporting, without mutating anything.
    /// Only transactions with more than one best-tied match are returned.
    pub fn find_conflicts(&self, user_id: i64) -> Result<Vec<CategorizationConflict>> {
        let rules = self.db.list_rules(user_id)?;
        let uncategorized = self.db.list_uncategorized(user_id)?;

        let mut conflicts = Vec::new();
        for tx in &uncategorized {
            if tx.description.trim().is_empty() {
                continue;
            }
            let matches = matching_rules(&rules, &tx.description)?;
            if matches.len() < 2 {
                continue;
            }
            if let Some(best) = best_matches(&matches) {
                if best.matches.len() > 1 {
                    conflicts.push(CategorizationConflict {
                        transaction_id: tx.id,
                        description: tx.description.clone(),
                        rules: best.matches,
                    });
                }
            }
        }

        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_account, seed_category, seed_rule, seed_transaction, seed_user};

    fn rule(id: i64, pattern: &str, category_id: i64) -> CategorizationRule {
        CategorizationRule {
            id,
            pattern: pattern.to_string(),
            category_id,
            category_name: format!("cat-{}", category_id),
        }
    }

    #[test]
    fn test_match_type_ordering() {
        assert_eq!(match_type("Netflix", "netflix").unwrap(), Some(MatchType::Exact));
        assert_eq!(
            match_type("Netflix", "NETFLIX PAYMENT").unwrap(),
            Some(MatchType::Prefix)
        );
        assert_eq!(
            match_type("Netflix", "PAID NETFLIX TODAY").unwrap(),
            Some(MatchType::Word)
        );
        assert_eq!(
            match_type("flix", "NETFLIX PAYMENT").unwrap(),
            Some(MatchType::Substring)
        );
        assert_eq!(match_type("Hulu", "NETFLIX PAYMENT").unwrap(), None);
    }

    #[test]
    fn test_match_is_case_insensitive_and_trimmed() {
        assert_eq!(
            match_type("  AMAZON  ", "amazon").unwrap(),
            Some(MatchType::Exact)
        );
        // Scenario: prefix vs word boundary
        assert_eq!(
            match_type("Amazon", "AMAZON MKTPLACE").unwrap(),
            Some(MatchType::Prefix)
        );
        assert_eq!(
            match_type("Amazon", "PAID AMAZON TODAY").unwrap(),
            Some(MatchType::Word)
        );
    }

    #[test]
    fn test_word_boundary_avoids_substring_false_positive() {
        // "GAS" inside "VEGAS" is only a substring hit, never a word hit
        assert_eq!(
            match_type("GAS", "LAS VEGAS HOTEL").unwrap(),
            Some(MatchType::Substring)
        );
        assert_eq!(
            match_type("GAS", "SHELL GAS STATION").unwrap(),
            Some(MatchType::Word)
        );
    }

    #[test]
    fn test_pattern_with_regex_metacharacters_is_literal() {
        assert_eq!(
            match_type("NETFLIX.COM", "bill netflix.com monthly").unwrap(),
            Some(MatchType::Word)
        );
        // The dot must not act as a wildcard
        assert_eq!(match_type("NETFLIX.COM", "bill netflixXcom monthly").unwrap(), None);
        // A pattern ending in a non-word character can never sit on a word
        // boundary, so it falls through to the substring rank
        assert_eq!(
            match_type("A+B (C)", "charge a+b (c) store").unwrap(),
            Some(MatchType::Substring)
        );
    }

    #[test]
    fn test_match_type_is_pure() {
        for _ in 0..3 {
            assert_eq!(
                match_type("Uber", "UBER TRIP HELP.UBER.COM").unwrap(),
                Some(MatchType::Prefix)
            );
        }
    }

    #[test]
    fn test_matching_rules_excludes_non_matches() {
        let rules = vec![
            rule(3, "Netflix", 1),
            rule(2, "flix", 2),
            rule(1, "Spotify", 3),
        ];
        let matches = matching_rules(&rules, "Netflix Payment").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].rule_id, 3);
        assert_eq!(matches[0].match_type, MatchType::Prefix);
        assert_eq!(matches[1].rule_id, 2);
        assert_eq!(matches[1].match_type, MatchType::Substring);
    }

    #[test]
    fn test_best_matches_empty_and_single() {
        assert!(best_matches(&[]).is_none());

        let matches = matching_rules(&[rule(1, "Uber", 1)], "UBER TRIP").unwrap();
        let best = best_matches(&matches).unwrap();
        assert_eq!(best.matches.len(), 1);
        assert_eq!(best.best_type, MatchType::Prefix);
    }

    #[test]
    fn test_best_matches_prefix_beats_substring() {
        // Scenario: Netflix (prefix) vs flix (substring) is not a conflict
        let rules = vec![rule(2, "Netflix", 1), rule(1, "flix", 2)];
        let matches = matching_rules(&rules, "Netflix Payment").unwrap();
        let best = best_matches(&matches).unwrap();
        assert_eq!(best.best_type, MatchType::Prefix);
        assert_eq!(best.matches.len(), 1);
        assert_eq!(best.matches[0].category_id, 1);
    }

    #[test]
    fn test_tied_exact_matches_are_both_best() {
        // Scenario: two exact matches to different categories
        let rules = vec![rule(2, "Uber", 1), rule(1, "Uber", 2)];
        let matches = matching_rules(&rules, "Uber").unwrap();
        let best = best_matches(&matches).unwrap();
        assert_eq!(best.best_type, MatchType::Exact);
        assert_eq!(best.matches.len(), 2);
    }

    #[test]
    fn test_apply_rules_single_best_categorizes() {
        let db = crate::db::Database::in_memory().unwrap();
        let user_id = seed_user(&db, "alice");
        let account_id = seed_account(&db, user_id, "Checking");
        let streaming = seed_category(&db, user_id, "Streaming", None);
        let shopping = seed_category(&db, user_id, "Shopping", None);
        seed_rule(&db, user_id, "Netflix", streaming);
        seed_rule(&db, user_id, "flix", shopping);
        let tx = seed_transaction(&db, user_id, account_id, "2024-01-05", "Netflix Payment", -15.49);

        let summary = Categorizer::new(&db)
            .apply_rules_to_uncategorized(user_id)
            .unwrap();
        assert_eq!(summary.categorized, 1);
        assert_eq!(summary.conflicts, 0);

        let stored = db.get_transaction(user_id, tx).unwrap().unwrap();
        assert_eq!(stored.category_id, Some(streaming));
    }

    #[test]
    fn test_apply_rules_tie_is_conflict_even_for_same_category() {
        let db = crate::db::Database::in_memory().unwrap();
        let user_id = seed_user(&db, "alice");
        let account_id = seed_account(&db, user_id, "Checking");
        let transport = seed_category(&db, user_id, "Transport", None);
        // Two identical patterns pointing at the same category still conflict
        seed_rule(&db, user_id, "Uber", transport);
        seed_rule(&db, user_id, "Uber", transport);
        let tx = seed_transaction(&db, user_id, account_id, "2024-01-05", "Uber", -25.0);

        let summary = Categorizer::new(&db)
            .apply_rules_to_uncategorized(user_id)
            .unwrap();
        assert_eq!(summary.categorized, 0);
        assert_eq!(summary.conflicts, 1);

        let stored = db.get_transaction(user_id, tx).unwrap().unwrap();
        assert_eq!(stored.category_id, None);
    }

    #[test]
    fn test_apply_rules_skips_unmatched_and_blank() {
        let db = crate::db::Database::in_memory().unwrap();
        let user_id = seed_user(&db, "alice");
        let account_id = seed_account(&db, user_id, "Checking");
        let streaming = seed_category(&db, user_id, "Streaming", None);
        seed_rule(&db, user_id, "Netflix", streaming);
        seed_transaction(&db, user_id, account_id, "2024-01-05", "SOMETHING ELSE", -10.0);
        seed_transaction(&db, user_id, account_id, "2024-01-06", "   ", -10.0);

        let summary = Categorizer::new(&db)
            .apply_rules_to_uncategorized(user_id)
            .unwrap();
        assert_eq!(summary.categorized, 0);
        assert_eq!(summary.conflicts, 0);
    }

    #[test]
    fn test_apply_rules_is_idempotent() {
        let db = crate::db::Database::in_memory().unwrap();
        let user_id = seed_user(&db, "alice");
        let account_id = seed_account(&db, user_id, "Checking");
        let streaming = seed_category(&db, user_id, "Streaming", None);
        seed_rule(&db, user_id, "Netflix", streaming);
        seed_transaction(&db, user_id, account_id, "2024-01-05", "NETFLIX.COM", -15.49);

        let first = Categorizer::new(&db)
            .apply_rules_to_uncategorized(user_id)
            .unwrap();
        assert_eq!(first.categorized, 1);

        // Already-categorized rows are no longer eligible
        let second = Categorizer::new(&db)
            .apply_rules_to_uncategorized(user_id)
            .unwrap();
        assert_eq!(second.categorized, 0);
        assert_eq!(second.conflicts, 0);
    }

    #[test]
    fn test_find_conflicts_reports_tied_rules() {
        let db = crate::db::Database::in_memory().unwrap();
        let user_id = seed_user(&db, "alice");
        let account_id = seed_account(&db, user_id, "Checking");
        let dining = seed_category(&db, user_id, "Dining", None);
        let transport = seed_category(&db, user_id, "Transport", None);
        seed_rule(&db, user_id, "Uber", transport);
        seed_rule(&db, user_id, "Uber", dining);
        let tx = seed_transaction(&db, user_id, account_id, "2024-01-05", "Uber", -25.0);

        let conflicts = Categorizer::new(&db).find_conflicts(user_id).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].transaction_id, tx);
        assert_eq!(conflicts[0].description, "Uber");
        assert_eq!(conflicts[0].rules.len(), 2);
        assert_eq!(conflicts[0].rules[0].match_type, MatchType::Exact);

        // Reporting must not mutate
        let stored = db.get_transaction(user_id, tx).unwrap().unwrap();
        assert_eq!(stored.category_id, None);
    }

    #[test]
    fn test_find_conflicts_ignores_resolvable_matches() {
        let db = crate::db::Database::in_memory().unwrap();
        let user_id = seed_user(&db, "alice");
        let account_id = seed_account(&db, user_id, "Checking");
        let streaming = seed_category(&db, user_id, "Streaming", None);
        let shopping = seed_category(&db, user_id, "Shopping", None);
        seed_rule(&db, user_id, "Netflix", streaming);
        seed_rule(&db, user_id, "flix", shopping);
        seed_transaction(&db, user_id, account_id, "2024-01-05", "Netflix Payment", -15.49);

        let conflicts = Categorizer::new(&db).find_conflicts(user_id).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_matching_rules_for_transaction_scope() {
        let db = crate::db::Database::in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let account_id = seed_account(&db, alice, "Checking");
        let streaming = seed_category(&db, alice, "Streaming", None);
        seed_rule(&db, alice, "Netflix", streaming);
        let tx = seed_transaction(&db, alice, account_id, "2024-01-05", "NETFLIX.COM", -15.49);

        let categorizer = Categorizer::new(&db);
        let matches = categorizer
            .matching_rules_for_transaction(alice, tx)
            .unwrap();
        assert_eq!(matches.len(), 1);

        // Another user's scope sees nothing
        let matches = categorizer.matching_rules_for_transaction(bob, tx).unwrap();
        assert!(matches.is_empty());
    }
}
