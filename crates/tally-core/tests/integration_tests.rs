//! Integration tests for tally-core
//!
//! These exercise the full import → categorize → conflict workflow through
//! the public API.

use tally_core::{
    db::Database,
    import::{AmountLayout, ColumnMapping, CsvFile, CsvImporter},
    matcher::Categorizer,
    models::{CategoryFilter, TransactionQuery},
};

fn checking_csv() -> &'static str {
    "Date,Description,Amount\n\
     15/01/2024,NETFLIX.COM,-15.49\n\
     16/01/2024,SHELL GAS STATION,-40.00\n\
     17/01/2024,LAS VEGAS HOTEL,-220.00\n\
     18/01/2024,PAYROLL ACME INC,2500.00\n\
     19/01/2024,UBER TRIP,-18.30\n"
}

fn import_checking(db: &Database, user_id: i64, account_id: i64) -> tally_core::ImportReport {
    let importer = CsvImporter::new(db);
    let mapping = ColumnMapping::parse("date,description,amount").unwrap();
    importer
        .import(
            user_id,
            account_id,
            &[CsvFile {
                name: "checking.csv".to_string(),
                contents: checking_csv().to_string(),
            }],
            &mapping,
            true,
            AmountLayout::Single,
        )
        .expect("import failed")
}

#[test]
fn test_full_import_workflow() {
    let db = Database::in_memory().expect("failed to create database");
    let user = db.upsert_user("alice").unwrap();
    let account = db.create_account(user.id, "Checking", None, None).unwrap();

    let report = import_checking(&db, user.id, account.id);
    assert_eq!(report.inserted_count, 5);
    assert_eq!(report.duplicate_count, 0);
    assert!(report.errors.is_empty());
    // Day values above 12 force the EU reading
    assert_eq!(report.detected_date_format.as_deref(), Some("DD/MM/YYYY"));

    // Dates were normalized to canonical form
    let stored = db
        .list_account_transactions(user.id, account.id)
        .unwrap();
    assert_eq!(stored.len(), 5);
    assert!(stored.iter().any(|tx| tx.date.to_string() == "2024-01-15"));

    // Re-importing the same file finds nothing new
    let again = import_checking(&db, user.id, account.id);
    assert_eq!(again.inserted_count, 0);
    assert_eq!(again.duplicate_count, 5);

    let stored = db
        .list_account_transactions(user.id, account.id)
        .unwrap();
    assert_eq!(stored.len(), 5);
}

#[test]
fn test_import_then_categorize_with_conflicts() {
    let db = Database::in_memory().expect("failed to create database");
    let user = db.upsert_user("alice").unwrap();
    let account = db.create_account(user.id, "Checking", None, None).unwrap();

    let streaming = db.create_category(user.id, "Streaming", None).unwrap();
    let transport = db.create_category(user.id, "Transport", None).unwrap();
    let travel = db.create_category(user.id, "Travel", None).unwrap();

    // NETFLIX resolves by prefix; GAS matches SHELL as a word and VEGAS only
    // as a substring; the two UBER rules tie at prefix rank on UBER TRIP
    db.create_rule(user.id, "NETFLIX", streaming.id).unwrap();
    db.create_rule(user.id, "GAS", transport.id).unwrap();
    db.create_rule(user.id, "UBER", transport.id).unwrap();
    db.create_rule(user.id, "UBER", travel.id).unwrap();

    import_checking(&db, user.id, account.id);

    let categorizer = Categorizer::new(&db);
    let conflicts = categorizer.find_conflicts(user.id).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].description, "UBER TRIP");
    assert_eq!(conflicts[0].rules.len(), 2);

    let summary = categorizer.apply_rules_to_uncategorized(user.id).unwrap();
    // NETFLIX.COM, SHELL GAS STATION, and LAS VEGAS HOTEL categorize;
    // UBER TRIP conflicts; PAYROLL matches nothing
    assert_eq!(summary.categorized, 3);
    assert_eq!(summary.conflicts, 1);

    let uncategorized = db
        .list_transactions(
            user.id,
            &TransactionQuery {
                category: Some(CategoryFilter::Uncategorized),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(uncategorized.total_items, 2);

    // Manual override resolves the conflict and survives a re-run
    let uber = uncategorized
        .transactions
        .iter()
        .find(|tx| tx.description == "UBER TRIP")
        .unwrap();
    db.set_category(user.id, uber.id, Some(travel.id)).unwrap();

    let rerun = categorizer.apply_rules_to_uncategorized(user.id).unwrap();
    assert_eq!(rerun.categorized, 0);
    assert_eq!(rerun.conflicts, 0);

    let conflicts = categorizer.find_conflicts(user.id).unwrap();
    assert!(conflicts.is_empty());
}

#[test]
fn test_split_import_and_force_import() {
    let db = Database::in_memory().expect("failed to create database");
    let user = db.upsert_user("alice").unwrap();
    let account = db.create_account(user.id, "Card", None, None).unwrap();

    let importer = CsvImporter::new(&db);
    let mapping = ColumnMapping::parse("date,description,debit,credit").unwrap();
    let csv = "Date,Description,Debit,Credit\n\
               2024-01-05,POS PURCHASE,50.00,0\n\
               2024-01-06,REFUND POSTED,0,25.00\n";
    let files = [CsvFile {
        name: "card.csv".to_string(),
        contents: csv.to_string(),
    }];

    let report = importer
        .import(user.id, account.id, &files, &mapping, true, AmountLayout::Split)
        .unwrap();
    assert_eq!(report.inserted_count, 2);

    // The second run flags both halves as duplicates; forcing them through
    // inserts them anyway
    let rerun = importer
        .import(user.id, account.id, &files, &mapping, true, AmountLayout::Split)
        .unwrap();
    assert_eq!(rerun.inserted_count, 0);
    assert_eq!(rerun.duplicates.len(), 2);

    let forced = importer
        .force_import(user.id, account.id, &rerun.duplicates)
        .unwrap();
    assert_eq!(forced.inserted_count, 2);

    let stored = db
        .list_account_transactions(user.id, account.id)
        .unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored.iter().filter(|tx| tx.amount == -50.0).count(), 2);
}

#[test]
fn test_users_are_isolated_end_to_end() {
    let db = Database::in_memory().expect("failed to create database");
    let alice = db.upsert_user("alice").unwrap();
    let bob = db.upsert_user("bob").unwrap();

    let alice_account = db.create_account(alice.id, "Checking", None, None).unwrap();
    db.create_account(bob.id, "Checking", None, None).unwrap();

    let cat = db.create_category(alice.id, "Streaming", None).unwrap();
    db.create_rule(alice.id, "NETFLIX", cat.id).unwrap();

    import_checking(&db, alice.id, alice_account.id);

    // Bob sees none of it
    assert_eq!(
        db.list_transactions(bob.id, &TransactionQuery::default())
            .unwrap()
            .total_items,
        0
    );
    assert!(db.list_rules(bob.id).unwrap().is_empty());

    // Bob's rule application touches nothing
    let summary = Categorizer::new(&db)
        .apply_rules_to_uncategorized(bob.id)
        .unwrap();
    assert_eq!(summary.categorized, 0);

    // Alice's still works
    let summary = Categorizer::new(&db)
        .apply_rules_to_uncategorized(alice.id)
        .unwrap();
    assert_eq!(summary.categorized, 1);
}
