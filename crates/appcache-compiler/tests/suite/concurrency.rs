use appcache_compiler::{AppcacheCompiler, AppcacheConfig, BatchOutcome, SkipReason};
use std::sync::{Arc, Barrier};
use std::thread;

fn batch_files(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| (format!("js/file_{i}.js"), format!("const value_{i} = {i};")))
        .collect()
}

#[test]
fn racing_per_file_hooks_match_the_sequential_manifest() {
    const THREADS: usize = 8;
    let files = batch_files(THREADS);

    let sequential_dir = tempfile::tempdir().unwrap();
    let sequential =
        AppcacheCompiler::new(sequential_dir.path(), AppcacheConfig::default()).unwrap();
    sequential.run_batch(&files).unwrap();
    let expected = std::fs::read_to_string(sequential.manifest_path()).unwrap();

    let racing_dir = tempfile::tempdir().unwrap();
    let racing =
        Arc::new(AppcacheCompiler::new(racing_dir.path(), AppcacheConfig::default()).unwrap());
    racing.begin_batch(THREADS);

    let start = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = files
        .iter()
        .cloned()
        .map(|(path, content)| {
            let compiler = Arc::clone(&racing);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                compiler.process_file(&path, &content).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let outcome = racing.complete_batch().unwrap();
    assert!(matches!(outcome, BatchOutcome::Committed(_)));
    let written = std::fs::read_to_string(racing.manifest_path()).unwrap();
    assert_eq!(written, expected);
}

#[test]
fn reversed_arrival_order_produces_the_forward_fingerprint() {
    let files = batch_files(5);

    let forward_dir = tempfile::tempdir().unwrap();
    let forward = AppcacheCompiler::new(forward_dir.path(), AppcacheConfig::default()).unwrap();
    forward.begin_batch(files.len());
    for (path, content) in &files {
        forward.process_file(path, content).unwrap();
    }
    let BatchOutcome::Committed(forward_fingerprint) = forward.complete_batch().unwrap() else {
        panic!("expected a commit");
    };

    let reversed_dir = tempfile::tempdir().unwrap();
    let reversed = AppcacheCompiler::new(reversed_dir.path(), AppcacheConfig::default()).unwrap();
    reversed.begin_batch(files.len());
    for (path, content) in files.iter().rev() {
        reversed.process_file(path, content).unwrap();
    }
    let BatchOutcome::Committed(reversed_fingerprint) = reversed.complete_batch().unwrap() else {
        panic!("expected a commit");
    };

    assert_eq!(forward_fingerprint, reversed_fingerprint);
    assert_eq!(
        std::fs::read_to_string(forward.manifest_path()).unwrap(),
        std::fs::read_to_string(reversed.manifest_path()).unwrap()
    );
}

#[test]
fn repeated_racing_batches_settle_into_skips() {
    const THREADS: usize = 4;
    const BATCHES: usize = 16;
    let files = batch_files(THREADS);

    let tmp = tempfile::tempdir().unwrap();
    let compiler = Arc::new(AppcacheCompiler::new(tmp.path(), AppcacheConfig::default()).unwrap());

    let mut first_manifest = None;
    for round in 0..BATCHES {
        compiler.begin_batch(THREADS);
        let start = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = files
            .iter()
            .cloned()
            .map(|(path, content)| {
                let compiler = Arc::clone(&compiler);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    compiler.process_file(&path, &content).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let outcome = compiler.complete_batch().unwrap();
        if round == 0 {
            assert!(matches!(outcome, BatchOutcome::Committed(_)));
            first_manifest = Some(std::fs::read_to_string(compiler.manifest_path()).unwrap());
        } else {
            assert_eq!(
                outcome,
                BatchOutcome::Skipped(SkipReason::FingerprintUnchanged),
                "round {round} should have been an identical skip"
            );
        }
    }

    let final_manifest = std::fs::read_to_string(compiler.manifest_path()).unwrap();
    assert_eq!(Some(final_manifest), first_manifest);
}
