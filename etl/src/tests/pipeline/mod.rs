use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use rstest::rstest;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::checkpoint::CheckpointStore;
use crate::config::SourceStrategy;
use crate::geometry::polygon_to_wkt;
use crate::tests::common::*;
use crate::types::RangeFilter;
use crate::worker::Orchestrator;
use crate::writer::BuilderKind;

const SQUARE_WKT: &str = "POLYGON ((0.00 0.00, 100.00 0.00, 100.00 100.00, 0.00 100.00, 0.00 0.00))";
const TRIANGLE_WKT: &str = "POLYGON ((0.00 0.00, 100.00 0.00, 100.00 100.00, 0.00 0.00))";

fn three_images() -> InMemoryStore {
    let mut marks = Vec::new();
    for image in ["img-1", "img-2", "img-3"] {
        marks.push(mark("seg-v1", image, square()));
        marks.push(mark("seg-v1", image, closed_triangle()));
        marks.push(mark("seg-v1", image, polygon(&[(0.1, 0.1), (0.2, 0.1), (0.2, 0.2)])));
    }
    InMemoryStore::new(
        vec![analysis("a-1", "seg-v1", "img-1"), analysis("a-2", "seg-v1", "img-2"), analysis("a-3", "seg-v1", "img-3")],
        marks,
    )
}

#[rstest]
#[tokio::test]
async fn square_point_and_triangle_become_one_batch(workspace: TempDir) {
    let store = InMemoryStore::new(
        vec![analysis("a-1", "seg-v1", "TCGA-01")],
        vec![
            mark("seg-v1", "TCGA-01", square()),
            mark("seg-v1", "TCGA-01", point()),
            mark("seg-v1", "TCGA-01", closed_triangle()),
        ],
    );
    let config = test_config(workspace.path());

    let summary = run_pipeline(&config, Arc::new(store), CancellationToken::new()).await;

    assert!(!summary.interrupted);
    assert_eq!(summary.snapshot.completed, 1);
    assert_eq!(summary.snapshot.failed, 0);
    assert_eq!(summary.snapshot.records, 2);
    assert_eq!(summary.snapshot.batches, 1);

    let files = batch_files(&workspace.path().join("out/seg-v1/TCGA-01"));
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("batch_000001.ttl.gz"));
    assert_eq!(wkt_literals(&read_batch(&files[0])), vec![SQUARE_WKT, TRIANGLE_WKT]);

    assert_eq!(completed_keys(&config.checkpoint.dir), vec!["seg-v1::TCGA-01"]);
}

#[rstest]
#[case(6)]
#[case(10)]
#[tokio::test]
async fn batches_fill_in_stream_order(workspace: TempDir, #[case] batch_size: usize) {
    let geometries: Vec<Document> =
        (1..=2 * batch_size + 5).map(|i| polygon(&[(0.0, 0.0), (i as f64 / 100.0, 0.0), (0.0, 0.5)])).collect();
    let store = InMemoryStore::new(
        vec![analysis("a-1", "seg-v1", "img-1")],
        geometries.iter().map(|g| mark("seg-v1", "img-1", g.clone())).collect(),
    );
    let mut config = test_config(workspace.path());
    config.storage.batch_size = batch_size;

    let summary = run_pipeline(&config, Arc::new(store), CancellationToken::new()).await;
    assert_eq!(summary.snapshot.batches, 3);

    let files = batch_files(&workspace.path().join("out/seg-v1/img-1"));
    let per_file: Vec<Vec<String>> = files.iter().map(|f| wkt_literals(&read_batch(f))).collect();
    assert_eq!(per_file.iter().map(Vec::len).collect::<Vec<_>>(), vec![batch_size, batch_size, 5]);

    let expected: Vec<String> = geometries.iter().map(|g| polygon_to_wkt(g, 100, 100).unwrap()).collect();
    assert_eq!(per_file.concat(), expected);
}

#[rstest]
#[tokio::test]
async fn interrupted_then_resumed_run_matches_a_clean_run(workspace: TempDir) {
    let clean_root = workspace.path().join("clean");
    let clean = test_config(&clean_root);
    let clean_summary = run_pipeline(&clean, Arc::new(three_images()), CancellationToken::new()).await;
    assert_eq!(clean_summary.snapshot.completed, 3);

    let resumed_root = workspace.path().join("resumed");
    let mut resumed = test_config(&resumed_root);
    resumed.service.worker_count = 1;

    // connection 1 is the orchestrator's, connection 2 the first worker's
    let token = CancellationToken::new();
    let connector =
        CancelOnConnect { inner: three_images(), token: token.clone(), after: 2, connects: AtomicUsize::new(0) };
    let first = run_pipeline(&resumed, Arc::new(connector), token).await;
    assert!(first.interrupted);
    assert_eq!(first.snapshot.completed, 1);
    assert_eq!(completed_keys(&resumed.checkpoint.dir).len(), 1);

    let second = run_pipeline(&resumed, Arc::new(three_images()), CancellationToken::new()).await;
    assert!(!second.interrupted);
    assert_eq!(second.snapshot.total, 2);
    assert_eq!(second.snapshot.completed, 2);

    assert_eq!(completed_keys(&resumed.checkpoint.dir), completed_keys(&clean.checkpoint.dir));
    for image in ["img-1", "img-2", "img-3"] {
        let literals = |root: &std::path::Path| -> Vec<String> {
            batch_files(&root.join("out/seg-v1").join(image)).iter().flat_map(|f| wkt_literals(&read_batch(f))).collect()
        };
        assert_eq!(literals(&resumed_root), literals(&clean_root), "output of {} differs", image);
    }
}

#[rstest]
#[tokio::test]
async fn failed_unit_is_recorded_and_never_retried(workspace: TempDir) {
    let mut broken = analysis("a-2", "seg-v1", "img-2");
    broken.insert("analysis", doc! { "execution_id": "seg-v1", "algorithm_params": { "image_width": -5 } });
    let store = InMemoryStore::new(
        vec![analysis("a-1", "seg-v1", "img-1"), broken],
        vec![mark("seg-v1", "img-1", square()), mark("seg-v1", "img-2", square())],
    );
    let config = test_config(workspace.path());

    let summary = run_pipeline(&config, Arc::new(store.clone()), CancellationToken::new()).await;
    assert_eq!(summary.snapshot.completed, 1);
    assert_eq!(summary.snapshot.failed, 1);

    let checkpoint = CheckpointStore::inspect(config.checkpoint.dir.clone()).unwrap();
    let failed = checkpoint.failed_entries();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "seg-v1::img-2");
    assert!(failed[0].1.contains("image_width"), "unexpected reason: {}", failed[0].1);
    assert!(batch_files(&workspace.path().join("out/seg-v1/img-2")).is_empty());

    let rerun = run_pipeline(&config, Arc::new(store), CancellationToken::new()).await;
    assert_eq!(rerun.snapshot.total, 0);
    assert_eq!(rerun.snapshot.processed, 0);
}

#[rstest]
#[tokio::test]
async fn requeued_failures_are_processed_again(workspace: TempDir) {
    let config = test_config(workspace.path());
    {
        let checkpoint = CheckpointStore::open(config.checkpoint.dir.clone(), None).unwrap();
        checkpoint.mark_failed("seg-v1::img-1", "connection reset").unwrap();
        assert_eq!(checkpoint.requeue_failed().unwrap(), 1);
    }

    let summary = run_pipeline(&config, Arc::new(three_images()), CancellationToken::new()).await;
    assert_eq!(summary.snapshot.total, 3);
    assert_eq!(summary.snapshot.completed, 3);
}

#[rstest]
#[tokio::test]
async fn worker_panic_fails_only_its_unit(workspace: TempDir) {
    let config = test_config(workspace.path());
    let connector = PanicOnConnect { inner: three_images(), healthy: 1, connects: AtomicUsize::new(0) };

    let summary = run_pipeline(&config, Arc::new(connector), CancellationToken::new()).await;

    assert!(!summary.interrupted);
    assert_eq!(summary.snapshot.failed, 3);
    let failed = CheckpointStore::inspect(config.checkpoint.dir.clone()).unwrap().failed_entries();
    assert_eq!(failed.len(), 3);
    assert!(failed.iter().all(|(_, reason)| reason == "worker panicked: mark cursor exploded"));
}

#[rstest]
#[tokio::test]
async fn nothing_to_do_completes_cleanly(workspace: TempDir) {
    let config = test_config(workspace.path());
    let summary = run_pipeline(&config, Arc::new(InMemoryStore::default()), CancellationToken::new()).await;

    assert!(!summary.interrupted);
    assert_eq!(summary.snapshot.total, 0);
    assert!(!workspace.path().join("out").exists());
}

#[rstest]
#[tokio::test]
async fn shutdown_before_dispatch_processes_nothing(workspace: TempDir) {
    let config = test_config(workspace.path());
    let token = CancellationToken::new();
    token.cancel();

    let summary = run_pipeline(&config, Arc::new(three_images()), token).await;

    assert!(summary.interrupted);
    assert_eq!(summary.snapshot.processed, 0);
    assert!(completed_keys(&config.checkpoint.dir).is_empty());
}

#[rstest]
#[tokio::test]
async fn shutdown_during_chunk_fetch_spawns_no_worker(workspace: TempDir) {
    let config = test_config(workspace.path());
    let token = CancellationToken::new();
    let store = CancelOnFetch { inner: three_images(), token: token.clone() };

    let summary = run_pipeline(&config, Arc::new(store), token).await;

    assert!(summary.interrupted);
    assert_eq!(summary.snapshot.processed, 0);
    assert!(!workspace.path().join("out").exists());
    assert!(!config.checkpoint.dir.join("in_progress.txt").exists());
}

#[rstest]
#[tokio::test]
async fn unwritable_in_progress_file_never_fails_units(workspace: TempDir) {
    let config = test_config(workspace.path());
    let checkpoint = Arc::new(CheckpointStore::open(config.checkpoint.dir.clone(), None).unwrap());
    std::fs::create_dir(config.checkpoint.dir.join("in_progress.txt")).unwrap();

    let summary = Orchestrator::new(config.clone(), Arc::new(three_images()), checkpoint, CancellationToken::new())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.snapshot.completed, 3);
    assert_eq!(summary.snapshot.failed, 0);
    assert_eq!(completed_keys(&config.checkpoint.dir).len(), 3);
}

#[rstest]
#[case(("a::b", "c"), ("a", "b::c"))]
#[case(("a|b", "c"), ("a_b", "c"))]
#[case(("seg:v1", "img"), ("seg_v1", "img"))]
#[tokio::test]
async fn lookalike_units_stay_separate(
    workspace: TempDir,
    #[case] first: (&str, &str),
    #[case] second: (&str, &str),
) {
    let store = InMemoryStore::new(
        vec![analysis("a-1", first.0, first.1), analysis("a-2", second.0, second.1)],
        vec![mark(first.0, first.1, square()), mark(second.0, second.1, closed_triangle())],
    );
    let config = test_config(workspace.path());

    let summary = run_pipeline(&config, Arc::new(store), CancellationToken::new()).await;

    assert_eq!(summary.snapshot.total, 2);
    assert_eq!(summary.snapshot.completed, 2);
    assert_eq!(completed_keys(&config.checkpoint.dir).len(), 2);

    let mut literals: Vec<String> = std::fs::read_dir(workspace.path().join("out"))
        .unwrap()
        .flat_map(|execution| std::fs::read_dir(execution.unwrap().path()).unwrap())
        .flat_map(|image| batch_files(&image.unwrap().path()))
        .flat_map(|file| wkt_literals(&read_batch(&file)))
        .collect();
    literals.sort();
    assert_eq!(literals, vec![SQUARE_WKT, TRIANGLE_WKT]);
}

#[rstest]
#[tokio::test]
async fn range_shards_sweep_unlinked_marks(workspace: TempDir) {
    let oid = |first: u8| ObjectId::from_bytes([first, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    let marks = vec![
        doc! { "_id": oid(0x10), "geometry": square() },
        doc! { "_id": oid(0x90), "analysis_id": Bson::Null, "geometry": square() },
        doc! { "_id": oid(0x20), "analysis_id": "a-1", "geometry": square() },
    ];
    let mut config = test_config(workspace.path());
    config.source.strategy = SourceStrategy::RangeShard;
    config.source.shard_count = 2;
    config.source.range_filter = RangeFilter::Null;
    config.source.default_width = 100;
    config.source.default_height = 100;
    config.storage.builder = BuilderKind::Minimal;

    let summary = run_pipeline(&config, Arc::new(InMemoryStore::new(Vec::new(), marks)), CancellationToken::new()).await;

    assert_eq!(summary.snapshot.completed, 2);
    assert_eq!(summary.snapshot.records, 2);
    for shard in ["shard_00", "shard_01"] {
        let files = batch_files(&workspace.path().join("out/null").join(shard));
        assert_eq!(files.len(), 1, "{}", shard);
        assert_eq!(wkt_literals(&read_batch(&files[0])), vec![SQUARE_WKT]);
    }
}
