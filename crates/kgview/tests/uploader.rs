mod common;

use std::sync::Arc;
use std::time::Duration;

use kgview::jobs::batch_count;
use kgview::pipeline::{BatchUploader, PipelineConfig, ProgressEvent, UploadError};
use kgview::rdf::serialize_triples;
use kgview::store::StoreError;

use common::{literal_triples, test_config, MockStore, RecordingProgress};

const GRAPH: &str = "http://localhost:8080/graph/test";

fn uploader(store: Arc<MockStore>, batch_size: usize) -> BatchUploader {
    let config = PipelineConfig::from_config(&test_config(batch_size));
    BatchUploader::new(store, &config)
}

fn batch_events(progress: &RecordingProgress) -> Vec<(usize, usize)> {
    progress
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ProgressEvent::Batch(b) => Some((b.batch_number, b.processed_triples)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_small_dataset_uses_single_write() {
    let store = MockStore::new();
    let progress = RecordingProgress::default();
    let triples = literal_triples(5);

    let summary = uploader(store.clone(), 2000)
        .upload(GRAPH, triples.as_slice(), &progress)
        .await
        .unwrap();

    assert_eq!(summary.batches, 1);
    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].graph_uri, GRAPH);
    assert_eq!(writes[0].triple_count(), 5);
    assert_eq!(writes[0].timeout, Duration::from_secs(300));
    assert_eq!(batch_events(&progress), vec![(1, 5)]);
}

#[tokio::test]
async fn test_exactly_one_batch_is_single_write() {
    let store = MockStore::new();
    let triples = literal_triples(100);
    uploader(store.clone(), 100)
        .upload(GRAPH, triples.as_slice(), &RecordingProgress::default())
        .await
        .unwrap();
    assert_eq!(store.writes().len(), 1);
}

#[tokio::test]
async fn test_large_dataset_is_batched() {
    let store = MockStore::new();
    let progress = RecordingProgress::default();
    let triples = literal_triples(4500);

    let summary = uploader(store.clone(), 2000)
        .upload(GRAPH, triples.as_slice(), &progress)
        .await
        .unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.triples, 4500);

    let sizes: Vec<usize> = store.writes().iter().map(|w| w.triple_count()).collect();
    assert_eq!(sizes, vec![2000, 2000, 500]);
    assert!(store
        .writes()
        .iter()
        .all(|w| w.timeout == Duration::from_secs(10)));
    assert_eq!(batch_events(&progress), vec![(1, 2000), (2, 4000), (3, 4500)]);
}

#[tokio::test]
async fn test_batches_preserve_source_order() {
    let store = MockStore::new();
    let triples = literal_triples(25);

    uploader(store.clone(), 10)
        .upload(GRAPH, triples.as_slice(), &RecordingProgress::default())
        .await
        .unwrap();

    let concatenated: String = store.writes().into_iter().map(|w| w.payload).collect();
    assert_eq!(concatenated, serialize_triples(triples.as_slice()));
}

#[tokio::test]
async fn test_write_count_matches_job_batch_count() {
    for (n, b) in [(1, 7), (7, 7), (8, 7), (50, 7), (49, 7), (1000, 3)] {
        let store = MockStore::new();
        let triples = literal_triples(n);
        let progress = RecordingProgress::default();
        uploader(store.clone(), b)
            .upload(GRAPH, triples.as_slice(), &progress)
            .await
            .unwrap();

        assert_eq!(store.writes().len(), batch_count(n, b), "n={} b={}", n, b);
        let written: usize = store.writes().iter().map(|w| w.triple_count()).sum();
        assert_eq!(written, n);
        assert_eq!(batch_events(&progress).last().map(|e| e.1), Some(n));
    }
}

#[tokio::test]
async fn test_failed_batch_aborts_upload() {
    let store = MockStore::new();
    store.fail_write(2);
    let progress = RecordingProgress::default();
    let triples = literal_triples(4500);

    let err = uploader(store.clone(), 2000)
        .upload(GRAPH, triples.as_slice(), &progress)
        .await
        .unwrap_err();

    match err {
        UploadError::Batch {
            batch,
            total_batches,
            processed,
            source,
        } => {
            assert_eq!(batch, 2);
            assert_eq!(total_batches, 3);
            assert_eq!(processed, 2000);
            assert!(matches!(source, StoreError::RetriesExhausted { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // No third batch attempted, first batch left in place.
    assert_eq!(store.writes().len(), 2);
    assert_eq!(batch_events(&progress), vec![(1, 2000)]);
}

#[tokio::test]
async fn test_failed_single_write() {
    let store = MockStore::new();
    store.fail_write(1);
    let triples = literal_triples(3);

    let err = uploader(store.clone(), 2000)
        .upload(GRAPH, triples.as_slice(), &RecordingProgress::default())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Single { triples: 3, .. }));
}

#[tokio::test]
async fn test_empty_upload_writes_nothing() {
    let store = MockStore::new();
    let summary = uploader(store.clone(), 10)
        .upload(GRAPH, &[], &RecordingProgress::default())
        .await
        .unwrap();
    assert_eq!(summary.batches, 0);
    assert!(store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_inter_batch_delay_between_batches_only() {
    let store = MockStore::new();
    let mut config = test_config(10);
    config.upload.inter_batch_delay_ms = 1000;
    let uploader = BatchUploader::new(store.clone(), &PipelineConfig::from_config(&config));
    let triples = literal_triples(30);

    let started = tokio::time::Instant::now();
    uploader
        .upload(GRAPH, triples.as_slice(), &RecordingProgress::default())
        .await
        .unwrap();

    // Three batches, two pauses.
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}
