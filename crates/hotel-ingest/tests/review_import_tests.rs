//! Review import pipeline tests against the in-memory store

mod common;

use common::{append_bytes, hotel_file, hotel_line, review_file, review_line};
use hotel_common::ImportError;
use hotel_ingest::config::ImportConfig;
use hotel_ingest::hotels::HotelImporter;
use hotel_ingest::ledger::HOTEL_NOT_FOUND;
use hotel_ingest::report::ImportPhase;
use hotel_ingest::reviews::ReviewImporter;
use hotel_ingest::source::CsvSource;
use hotel_ingest::store::MemoryStore;
use hotel_ingest::ImportKind;
use std::sync::Arc;

async fn store_with_hotels() -> Arc<MemoryStore> {
    let file = hotel_file(&[
        hotel_line("1001", "Hotel Lutetia", "Paris", "FR", "Ile-de-France"),
        hotel_line("1002", "Hotel de Russie", "Rome", "IT", "Lazio"),
    ]);
    let store = Arc::new(MemoryStore::new());
    HotelImporter::new(Arc::clone(&store), CsvSource::tsv(file.path()), ImportConfig::default())
        .run()
        .await
        .expect("hotel import succeeds");
    store
}

#[tokio::test]
async fn test_reviews_resolve_hotels_by_name() {
    let store = store_with_hotels().await;
    let file = review_file(&[
        review_line("Hotel Lutetia", "Ana", "Lovely", "4.5"),
        review_line(" Hotel de Russie ", "Marco", "Quiet garden", "5"),
        review_line("Hotel Nowhere", "Kim", "Lost", "3"),
    ]);

    let report = ReviewImporter::new(Arc::clone(&store), CsvSource::csv(file.path()), ImportConfig::default())
        .run()
        .await
        .expect("review import succeeds");

    assert_eq!(report.kind, ImportKind::Reviews);
    assert_eq!(report.parents.hotels, 2);
    assert_eq!(report.rows_inserted, 2);
    assert_eq!(report.skipped.count(HOTEL_NOT_FOUND), 1);

    let mut ids: Vec<i32> = store
        .reviews()
        .await
        .iter()
        .map(|r| r.global_property_id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1001, 1002]);
}

#[tokio::test]
async fn test_out_of_range_rating_is_skipped() {
    let store = store_with_hotels().await;
    let file = review_file(&[
        review_line("Hotel Lutetia", "Ana", "Lovely", "6.2"),
        review_line("Hotel Lutetia", "Ben", "Fine", "0.9"),
        review_line("Hotel Lutetia", "Cid", "Good", "abc"),
    ]);

    let report = ReviewImporter::new(store, CsvSource::csv(file.path()), ImportConfig::default())
        .run()
        .await
        .expect("review import succeeds");

    assert_eq!(
        report.skipped.count("Invalid ValueRating (must be between 1.0 and 5.0)"),
        3
    );
    assert_eq!(report.rows_queued, 0);
}

#[tokio::test]
async fn test_same_reviewer_and_title_with_different_content_both_kept() {
    let store = store_with_hotels().await;
    let file = review_file(&[
        "Hotel Lutetia,Anonymous,Great hotel,Loved the bar,5,5,5,5,5,5".to_string(),
        "Hotel Lutetia,Anonymous,Great hotel,Quiet rooms,4,4,4,4,4,4".to_string(),
    ]);

    let report = ReviewImporter::new(Arc::clone(&store), CsvSource::csv(file.path()), ImportConfig::default())
        .run()
        .await
        .expect("review import succeeds");

    assert_eq!(report.rows_inserted, 2);
    assert_eq!(report.rows_already_present(), 0);
    let mut contents: Vec<String> = store.reviews().await.into_iter().map(|r| r.content).collect();
    contents.sort();
    assert_eq!(contents, vec!["Loved the bar", "Quiet rooms"]);
}

#[tokio::test]
async fn test_identical_reviews_ignored_on_rerun() {
    let store = store_with_hotels().await;
    let file = review_file(&[
        review_line("Hotel Lutetia", "Ana", "Lovely", "4"),
        review_line("Hotel Lutetia", "Ana", "Lovely", "4"),
    ]);

    for _ in 0..2 {
        ReviewImporter::new(
            Arc::clone(&store),
            CsvSource::csv(file.path()),
            ImportConfig::default().with_batch_size(1),
        )
        .run()
        .await
        .expect("duplicates never fail a batch");
    }

    assert_eq!(store.reviews().await.len(), 1);
}

#[tokio::test]
async fn test_undecodable_row_fails_after_submitted_batches_settle() {
    let store = store_with_hotels().await;
    let lines: Vec<String> = (1..=5)
        .map(|i| review_line("Hotel Lutetia", &format!("Guest {}", i), "Stay", "4"))
        .collect();
    let mut file = review_file(&lines);
    append_bytes(&mut file, b"Hotel Lutetia,G\xffst,Stay,Body,4,4,4,4,4,4\n");
    append_bytes(&mut file, review_line("Hotel Lutetia", "Late", "Stay", "4").as_bytes());

    let mut importer = ReviewImporter::new(
        Arc::clone(&store),
        CsvSource::csv(file.path()),
        ImportConfig::default().with_batch_size(2),
    );
    let result = importer.run().await;

    assert!(matches!(result, Err(ImportError::Csv(_))));
    assert_eq!(importer.phase(), ImportPhase::Failed);
    // two full batches were submitted before the bad row; the fifth row was
    // still buffered and is dropped
    assert_eq!(store.submissions().await[1..], [2, 2]);
    assert_eq!(store.reviews().await.len(), 4);
}

#[tokio::test]
async fn test_long_reviewer_name_is_skipped() {
    let store = store_with_hotels().await;
    let long_name = "R".repeat(101);
    let file = review_file(&[
        review_line("Hotel Lutetia", &long_name, "Lovely", "4"),
        review_line("Hotel Lutetia", "Ana", "Lovely", "4"),
    ]);

    let report = ReviewImporter::new(store, CsvSource::csv(file.path()), ImportConfig::default())
        .run()
        .await
        .expect("review import succeeds");

    assert_eq!(report.skipped.count("Invalid ReviewerName (too long)"), 1);
    assert_eq!(report.rows_inserted, 1);
}

#[tokio::test]
async fn test_no_hotels_skips_everything() {
    let file = review_file(&[review_line("Hotel Lutetia", "Ana", "Lovely", "4")]);

    let report = ReviewImporter::new(
        Arc::new(MemoryStore::new()),
        CsvSource::csv(file.path()),
        ImportConfig::default(),
    )
    .run()
    .await
    .expect("review import succeeds");

    assert_eq!(report.parents.hotels, 0);
    assert_eq!(report.skipped.total(), 1);
    assert_eq!(report.batches_committed, 0);
}

#[tokio::test]
async fn test_missing_column_reported_by_name() {
    let store = store_with_hotels().await;
    let file = review_file(&["Hotel Lutetia,Ana,,Body,4,4,4,4,4,4".to_string()]);

    let report = ReviewImporter::new(store, CsvSource::csv(file.path()), ImportConfig::default())
        .run()
        .await
        .expect("review import succeeds");

    assert_eq!(report.skipped.count("Missing required field: ReviewTitle"), 1);
}
