use super::*;
use crate::catalog::Catalog;
use crate::fragments::{AudioCodec, SliceFormat};
use crate::test_helpers::{FakeFetcher, FakeSlicer, file_stems};
use crate::types::{AssetRecord, CatalogRow, Interval};
use std::path::Path;
use tempfile::TempDir;

fn ids(raw: &[&str]) -> Vec<AssetId> {
    raw.iter().map(|s| AssetId::from(*s)).collect()
}

fn numbered(n: usize) -> Vec<AssetId> {
    (0..n).map(|i| AssetId::new(format!("id{i:03}"))).collect()
}

fn row(id: &str, row_id: &str, start: f64, end: f64) -> CatalogRow {
    CatalogRow {
        asset_id: id.into(),
        group_id: format!("g-{id}"),
        fragment_id: "0".to_string(),
        row_id: row_id.to_string(),
        interval: Interval::new(start, end).unwrap(),
    }
}

fn extractor(slicer: Arc<FakeSlicer>, keep_source: bool) -> Arc<FragmentExtractor> {
    let format = SliceFormat {
        codec: AudioCodec::Mp3,
        sample_rate: 16_000,
        channels: 1,
    };
    Arc::new(FragmentExtractor::new(slicer, format, keep_source))
}

fn download(dir: &Path) -> FetchMode {
    FetchMode::Download {
        asset_dir: dir.to_path_buf(),
    }
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn one_record_per_distinct_identifier() {
    let (tx, _rx) = broadcast::channel(64);
    let fetcher = Arc::new(FakeFetcher::default());
    let scheduler = BatchScheduler::new(fetcher.clone(), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    let summary = scheduler
        .run(&ids(&["a", "b", "a", "c", "b", "d"]), 2, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.assets, 4);
    assert_eq!(summary.batches, 2);
    assert_eq!(sink.len(), 4);
    assert_eq!(fetcher.call_count(), 4);
    let recorded: Vec<&str> = sink.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(recorded, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn failed_fetch_degrades_only_that_identifier() {
    let (tx, _rx) = broadcast::channel(64);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::failing(&["bad"])), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    let summary = scheduler
        .run(&ids(&["ok1", "bad", "ok2"]), 3, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(sink.degraded(), 1);
    let bad = sink.records().iter().find(|r| r.id == "bad").unwrap();
    assert_eq!(*bad, AssetRecord::degraded(&"bad".into()));
    let ok = sink.records().iter().find(|r| r.id == "ok1").unwrap();
    assert_eq!(ok.title.as_deref(), Some("title of ok1"));
}

#[tokio::test]
async fn fetch_without_known_fields_is_not_a_failure() {
    let (tx, mut rx) = broadcast::channel(64);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::sparse(&["bare"])), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    let summary = scheduler
        .run(&ids(&["bare", "full"]), 2, &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.fetch_failures, 0);
    assert_eq!(sink.degraded(), 1);
    let fetched: Vec<Event> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::BatchFetched { .. }))
        .collect();
    assert_eq!(fetched.len(), 1);
    assert!(matches!(
        fetched[0],
        Event::BatchFetched {
            batch: 0,
            succeeded: 2,
            failed: 0
        }
    ));
}

#[tokio::test]
async fn panicking_fetch_is_isolated() {
    let (tx, _rx) = broadcast::channel(64);
    let scheduler =
        BatchScheduler::new(Arc::new(FakeFetcher::panicking(&["boom"])), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    let summary = scheduler
        .run(&ids(&["a", "boom", "b"]), 2, &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.len(), 3);
    assert_eq!(summary.fetch_failures, 1);
    assert!(sink.records().iter().find(|r| r.id == "boom").unwrap().is_degraded());
    assert!(!sink.records().iter().find(|r| r.id == "b").unwrap().is_degraded());
}

#[tokio::test]
async fn zero_batch_size_is_fatal() {
    let (tx, _rx) = broadcast::channel(4);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::default()), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    let result = scheduler.run(&ids(&["a"]), 0, &mut sink).await;
    assert!(matches!(result, Err(crate::Error::WorkerPool(_))));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn probe_mode_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let (tx, _rx) = broadcast::channel(64);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::default()), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    scheduler.run(&numbered(5), 2, &mut sink).await.unwrap();
    assert_eq!(sink.len(), 5);
    assert!(file_stems(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn earlier_batches_are_gone_before_the_next_fetch() {
    let assets = TempDir::new().unwrap();
    let fragments = TempDir::new().unwrap();
    let identifiers = numbered(9);

    let rows: Vec<CatalogRow> = identifiers
        .iter()
        .map(|id| row(id.as_str(), "1", 0.0, 5.0))
        .collect();
    let index = Arc::new(Catalog::from_rows(rows).fragment_index(fragments.path(), ".mp3"));

    let (tx, _rx) = broadcast::channel(64);
    let fetcher = Arc::new(FakeFetcher::default());
    let slicer = Arc::new(FakeSlicer::default());
    let scheduler = BatchScheduler::new(fetcher.clone(), download(assets.path()), tx)
        .with_extraction(extractor(slicer.clone(), false), index);
    let mut sink = MetadataSink::new();

    let summary = scheduler.run(&identifiers, 3, &mut sink).await.unwrap();

    assert_eq!(summary.fragments_written, 9);
    assert_eq!(summary.assets_extracted, 9);
    assert_eq!(slicer.jobs.lock().unwrap().len(), 9);

    // every fetch only ever saw files belonging to its own batch
    let batch_of = |id: &str| identifiers.iter().position(|x| x == &id).unwrap() / 3;
    for (id, seen) in fetcher.snapshots.lock().unwrap().iter() {
        let own = batch_of(id.as_str());
        for other in seen {
            assert_eq!(batch_of(other.as_str()), own, "{id} saw {other} on disk");
        }
    }
    assert!(file_stems(assets.path()).is_empty());
    assert!(fragments.path().join("g-id004").join("0").join("1.mp3").exists());
}

#[tokio::test]
async fn retention_keeps_every_source_asset() {
    let assets = TempDir::new().unwrap();
    let fragments = TempDir::new().unwrap();
    let index = Arc::new(
        Catalog::from_rows(vec![row("a", "1", 0.0, 2.0), row("b", "2", 1.0, 3.0)])
            .fragment_index(fragments.path(), ".mp3"),
    );

    let (tx, _rx) = broadcast::channel(64);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::default()), download(assets.path()), tx)
        .with_extraction(extractor(Arc::new(FakeSlicer::default()), true), index);
    let mut sink = MetadataSink::new();

    scheduler.run(&ids(&["a", "b"]), 1, &mut sink).await.unwrap();
    assert_eq!(file_stems(assets.path()), vec!["a", "b"]);
}

#[tokio::test]
async fn failed_slices_are_counted_and_source_still_released() {
    let assets = TempDir::new().unwrap();
    let fragments = TempDir::new().unwrap();
    let index = Arc::new(
        Catalog::from_rows(vec![row("a", "1", 0.0, 2.0), row("a", "2", 2.0, 4.0)])
            .fragment_index(fragments.path(), ".mp3"),
    );
    let bad = index.specs_for(&"a".into())[0].output_path.clone();
    let slicer = Arc::new(FakeSlicer {
        failing_outputs: [bad.clone()].into_iter().collect(),
        ..Default::default()
    });

    let (tx, _rx) = broadcast::channel(64);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::default()), download(assets.path()), tx)
        .with_extraction(extractor(slicer, false), index);
    let mut sink = MetadataSink::new();

    let summary = scheduler.run(&ids(&["a"]), 2, &mut sink).await.unwrap();
    assert_eq!(summary.fragments_written, 1);
    assert_eq!(summary.fragments_failed, 1);
    assert!(!bad.exists());
    assert!(file_stems(assets.path()).is_empty());
}

#[tokio::test]
async fn failed_fetch_is_not_extracted() {
    let assets = TempDir::new().unwrap();
    let fragments = TempDir::new().unwrap();
    let index = Arc::new(
        Catalog::from_rows(vec![row("gone", "1", 0.0, 2.0), row("here", "2", 0.0, 2.0)])
            .fragment_index(fragments.path(), ".mp3"),
    );
    let slicer = Arc::new(FakeSlicer::default());

    let (tx, _rx) = broadcast::channel(64);
    let scheduler =
        BatchScheduler::new(Arc::new(FakeFetcher::failing(&["gone"])), download(assets.path()), tx)
            .with_extraction(extractor(slicer.clone(), false), index);
    let mut sink = MetadataSink::new();

    let summary = scheduler.run(&ids(&["gone", "here"]), 2, &mut sink).await.unwrap();
    assert_eq!(summary.assets_extracted, 1);
    let jobs = slicer.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].input, assets.path().join("here.mp3"));
}

#[tokio::test]
async fn forty_batches_report_progress_twenty_times() {
    let (tx, mut rx) = broadcast::channel(256);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::default()), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    scheduler.run(&numbered(40), 1, &mut sink).await.unwrap();

    let progress: Vec<usize> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            Event::Progress { completed, .. } => Some(completed),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 20);
    assert_eq!(progress.first(), Some(&2));
    assert_eq!(progress.last(), Some(&40));
}

#[tokio::test]
async fn short_runs_report_every_batch() {
    let (tx, mut rx) = broadcast::channel(64);
    let scheduler = BatchScheduler::new(Arc::new(FakeFetcher::default()), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    scheduler.run(&numbered(3), 1, &mut sink).await.unwrap();

    let events = drain(&mut rx);
    assert!(matches!(
        events[0],
        Event::RunStarted {
            total_assets: 3,
            total_batches: 3
        }
    ));
    let progress = events
        .iter()
        .filter(|e| matches!(e, Event::Progress { .. }))
        .count();
    assert_eq!(progress, 3);
}

#[tokio::test]
async fn empty_identifier_list_is_a_no_op() {
    let (tx, _rx) = broadcast::channel(8);
    let fetcher = Arc::new(FakeFetcher::default());
    let scheduler = BatchScheduler::new(fetcher.clone(), FetchMode::Probe, tx);
    let mut sink = MetadataSink::new();

    let summary = scheduler.run(&[], 4, &mut sink).await.unwrap();
    assert_eq!(summary, ScheduleSummary::default());
    assert_eq!(fetcher.call_count(), 0);
}
