//! Integration tests for the filesystem artifact store backed by a fake
//! benchmark server.

use medbench_core::domain::digest::file_digest;
use medbench_core::fakes::MemoryComms;
use medbench_core::{
    check_cube_validity, ArtifactStore, Benchmark, CubeMetadata, FsArtifactStore, MedbenchConfig,
    MedbenchError,
};
use std::sync::Arc;

const EVALUATOR_MANIFEST: &[u8] = b"name: evaluator\ntasks:\n  evaluate:\n    parameters: {}\n";

fn store_with(comms: Arc<MemoryComms>) -> (tempfile::TempDir, FsArtifactStore) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = MedbenchConfig::default().with_storage_root(dir.path());
    let store = FsArtifactStore::new(cfg).unwrap().with_comms(comms);
    (dir, store)
}

#[tokio::test]
async fn test_benchmark_models_always_include_reference() {
    let comms = Arc::new(MemoryComms::new());
    comms.add_benchmark(Benchmark::new(1, "b", "10", "100", "200"), &["101"]);
    let (_dir, store) = store_with(comms);

    let benchmark = store.get_benchmark(1).await.expect("get_benchmark failed");
    assert!(benchmark.contains_model("100"));
    assert!(benchmark.contains_model("101"));
    assert_eq!(benchmark.models.len(), 2);
}

#[tokio::test]
async fn test_pinned_manifest_hash_is_verified() {
    let comms = Arc::new(MemoryComms::new());
    let dir = tempfile::tempdir().unwrap();
    let manifest_file = dir.path().join("mlcube.yaml");
    std::fs::write(&manifest_file, EVALUATOR_MANIFEST).unwrap();

    let mut metadata = CubeMetadata::new("200", &["evaluate"]);
    metadata.manifest_hash = Some(file_digest(&manifest_file).unwrap());
    comms.add_cube(metadata, EVALUATOR_MANIFEST);

    let mut tampered = CubeMetadata::new("201", &["evaluate"]);
    tampered.manifest_hash = Some("f".repeat(64));
    comms.add_cube(tampered, EVALUATOR_MANIFEST);

    let (_dir, store) = store_with(comms);

    let cube = store.fetch_cube("200").await.expect("fetch failed");
    check_cube_validity(&cube, &["evaluate"]).expect("valid cube rejected");

    let cube = store.fetch_cube("201").await.expect("fetch failed");
    match check_cube_validity(&cube, &["evaluate"]) {
        Err(MedbenchError::InvalidCube { uid, reason }) => {
            assert_eq!(uid, "201");
            assert!(reason.contains("hash mismatch"));
        }
        other => panic!("expected InvalidCube, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_cube_is_not_found() {
    let (_dir, store) = store_with(Arc::new(MemoryComms::new()));
    let err = store.fetch_cube("404").await.unwrap_err();
    assert!(matches!(err, MedbenchError::NotFound { kind: "cube", .. }));
    assert!(!store.cubes_root().join("404").exists());
}
