use appcache_compiler::{
    AggregateFingerprint, AppcacheCompiler, AppcacheConfig, BatchOutcome, CompilerError,
    ContentDigest, SkipReason,
};
use std::path::Path;

fn default_compiler(dir: &Path) -> AppcacheCompiler {
    init_tracing();
    AppcacheCompiler::new(dir, AppcacheConfig::default()).unwrap()
}

// Routes the compiler's lifecycle debug events through the test writer;
// filtered by RUST_LOG, quiet by default.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

#[test]
fn first_batch_commits_the_aggregate_fingerprint() {
    let tmp = tempfile::tempdir().unwrap();
    let compiler = default_compiler(tmp.path());

    let outcome = compiler
        .run_batch(&[
            ("path/to/file_1.js", "const foo = bar"),
            ("path/to/file_2.css", "const bar = baz"),
        ])
        .unwrap();

    let BatchOutcome::Committed(fingerprint) = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(
        fingerprint.as_str(),
        "92e8f0ebfc29c1b0c272d615c0c1786347bf5d7b"
    );
    assert_eq!(compiler.committed_fingerprint(), Some(fingerprint));

    let manifest = std::fs::read_to_string(compiler.manifest_path()).unwrap();
    assert!(manifest.contains("# 92e8f0ebfc29c1b0c272d615c0c1786347bf5d7b"));
    assert!(manifest.contains("./path/to/file_1.js\n./path/to/file_2.css"));
}

#[test]
fn identical_batch_skips_without_touching_the_filesystem() {
    let tmp = tempfile::tempdir().unwrap();
    let compiler = default_compiler(tmp.path());
    let files = [("app.js", "const foo = bar")];

    compiler.run_batch(&files).unwrap();

    // Remove the manifest behind the compiler's back: if the second batch
    // is skipped purely on the committed fingerprint, nothing reappears.
    std::fs::remove_file(compiler.manifest_path()).unwrap();

    assert_eq!(
        compiler.run_batch(&files).unwrap(),
        BatchOutcome::Skipped(SkipReason::FingerprintUnchanged)
    );
    assert!(!compiler.manifest_path().exists());
}

#[test]
fn changed_content_rewrites_the_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let compiler = default_compiler(tmp.path());

    compiler.run_batch(&[("app.js", "v1")]).unwrap();
    let before = std::fs::read_to_string(compiler.manifest_path()).unwrap();

    let outcome = compiler.run_batch(&[("app.js", "v2")]).unwrap();
    assert!(matches!(outcome, BatchOutcome::Committed(_)));

    let after = std::fs::read_to_string(compiler.manifest_path()).unwrap();
    assert_ne!(before, after);
    // Same path, same single CACHE entry, new fingerprint line.
    assert_eq!(after.matches("./app.js").count(), 1);
}

#[test]
fn registry_accumulates_paths_across_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let compiler = default_compiler(tmp.path());

    compiler.run_batch(&[("b.js", "b")]).unwrap();
    compiler.run_batch(&[("a.css", "a")]).unwrap();

    let manifest = std::fs::read_to_string(compiler.manifest_path()).unwrap();
    // Both batches' paths are listed, sorted, even though the second batch
    // digested only one file.
    assert!(manifest.contains("CACHE:\n./a.css\n./b.js\n"));
}

#[test]
fn excluded_paths_feed_the_fingerprint_but_not_the_cache_list() {
    let tmp = tempfile::tempdir().unwrap();
    let compiler = default_compiler(tmp.path());

    compiler.begin_batch(3);
    let hidden = compiler.process_file(".env", "secret=1").unwrap();
    let manifest_file = compiler
        .process_file("appcache.appcache", "CACHE MANIFEST")
        .unwrap();
    let listed = compiler.process_file("app.js", "code").unwrap();

    assert!(!hidden.cache_listed);
    assert!(!manifest_file.cache_listed);
    assert!(listed.cache_listed);

    let BatchOutcome::Committed(fingerprint) = compiler.complete_batch().unwrap() else {
        panic!("expected a commit");
    };
    // All three digests aggregate, listed or not.
    let expected = AggregateFingerprint::combine(&[
        ContentDigest::from_bytes("secret=1"),
        ContentDigest::from_bytes("CACHE MANIFEST"),
        ContentDigest::from_bytes("code"),
    ]);
    assert_eq!(fingerprint, expected);

    let manifest = std::fs::read_to_string(compiler.manifest_path()).unwrap();
    assert!(manifest.contains("CACHE:\n./app.js\n"));
    assert!(!manifest.contains(".env"));
    assert!(!manifest.contains("appcache.appcache\n"));
}

#[test]
fn failed_write_leaves_the_gate_open_for_retry() {
    let tmp = tempfile::tempdir().unwrap();
    // Occupy the manifest destination with a directory so the write fails.
    let dest = tmp.path().join("appcache.appcache");
    std::fs::create_dir(&dest).unwrap();

    let compiler = default_compiler(tmp.path());
    let files = [("app.js", "const foo = bar")];

    let err = compiler.run_batch(&files).unwrap_err();
    assert!(matches!(err, CompilerError::Write { .. }), "got {err:?}");
    assert_eq!(compiler.committed_fingerprint(), None);

    // Unblock the destination; the identical batch retries the write
    // because nothing was committed.
    std::fs::remove_dir(&dest).unwrap();
    let outcome = compiler.run_batch(&files).unwrap();
    assert!(matches!(outcome, BatchOutcome::Committed(_)));
    assert!(compiler.manifest_path().is_file());
}

#[test]
fn duplicate_paths_list_once_but_digest_twice() {
    let tmp = tempfile::tempdir().unwrap();
    let compiler = default_compiler(tmp.path());

    let outcome = compiler
        .run_batch(&[("app.js", "same"), ("app.js", "same")])
        .unwrap();
    let BatchOutcome::Committed(fingerprint) = outcome else {
        panic!("expected a commit");
    };

    let digest = ContentDigest::from_bytes("same");
    assert_eq!(
        fingerprint,
        AggregateFingerprint::combine(&[digest.clone(), digest])
    );

    let manifest = std::fs::read_to_string(compiler.manifest_path()).unwrap();
    assert_eq!(manifest.matches("./app.js").count(), 1);
}
