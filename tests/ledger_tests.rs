use deidflow::pipeline::OutcomeLedger;
use deidflow::{LedgerEntry, SourceFile, Stage, Status};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn source(name: &str) -> SourceFile {
    SourceFile {
        directory_prefix: "A".to_string(),
        base_name: name.to_string(),
        full_path: PathBuf::from(format!("/in/A/{name}")),
    }
}

#[test]
fn test_ledger_record_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ledger.jsonl");
    let ledger = OutcomeLedger::open(&path).unwrap();

    let ok = LedgerEntry::success(
        &source("a.svs"),
        "s3://b/A_DI_a.svs".to_string(),
        Duration::from_millis(1500),
    );
    let bad = LedgerEntry::failure(
        &source("b.svs"),
        Stage::Transformed,
        "transform exited with exit code 1: boom".to_string(),
        Duration::from_secs(2),
    );
    ledger.record(&ok).unwrap();
    ledger.record(&bad).unwrap();

    let entries = ledger.entries().unwrap();
    assert_eq!(entries, vec![ok, bad]);
    assert_eq!(entries[0].stage_reached, Stage::CleanedUp);
    assert_eq!(entries[1].status, Status::Failure);
}

#[test]
fn test_ledger_one_line_per_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let ledger = OutcomeLedger::open(&path).unwrap();
    for i in 0..3 {
        ledger
            .record(&LedgerEntry::success(
                &source(&format!("{i}.svs")),
                format!("s3://b/{i}"),
                Duration::ZERO,
            ))
            .unwrap();
    }
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|l| l.starts_with('{') && l.contains("\"source_path\"")));
}

#[test]
fn test_ledger_appends_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let e = LedgerEntry::success(&source("a.svs"), "s3://b/x".to_string(), Duration::ZERO);
    OutcomeLedger::open(&path).unwrap().record(&e).unwrap();
    OutcomeLedger::open(&path).unwrap().record(&e).unwrap();
    assert_eq!(OutcomeLedger::open(&path).unwrap().entries().unwrap().len(), 2);
}

#[test]
fn test_ledger_concurrent_appends_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let ledger = Arc::new(OutcomeLedger::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..25 {
                    let e = LedgerEntry::failure(
                        &source(&format!("t{t}_{i}.svs")),
                        Stage::Uploaded,
                        "x".repeat(512),
                        Duration::ZERO,
                    );
                    ledger.record(&e).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(ledger.entries().unwrap().len(), 200);
}

#[test]
fn test_ledger_skips_foreign_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let ledger = OutcomeLedger::open(&path).unwrap();
    ledger
        .record(&LedgerEntry::success(&source("a.svs"), "s3://b/a".to_string(), Duration::ZERO))
        .unwrap();
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "Original_file_name,Deidentified_file_name,Status").unwrap();
    }
    assert_eq!(ledger.entries().unwrap().len(), 1);
}

#[test]
fn test_ledger_skips_non_utf8_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let ledger = OutcomeLedger::open(&path).unwrap();
    ledger
        .record(&LedgerEntry::success(&source("a.svs"), "s3://b/a".to_string(), Duration::ZERO))
        .unwrap();
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(&[0xff, 0xfe, b'l', b'o', b'g', b'\n']).unwrap();
    }
    ledger
        .record(&LedgerEntry::success(&source("b.svs"), "s3://b/b".to_string(), Duration::ZERO))
        .unwrap();

    assert_eq!(ledger.entries().unwrap().len(), 2);
    let done = ledger.succeeded_sources().unwrap();
    assert!(done.contains("/in/A/a.svs"));
    assert!(done.contains("/in/A/b.svs"));
}

#[test]
fn test_succeeded_sources_uses_latest_entry() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = OutcomeLedger::open(&dir.path().join("ledger.jsonl")).unwrap();
    let a = source("a.svs");
    let b = source("b.svs");
    ledger
        .record(&LedgerEntry::failure(&a, Stage::Uploaded, "x".into(), Duration::ZERO))
        .unwrap();
    ledger
        .record(&LedgerEntry::success(&a, "s3://b/a".into(), Duration::ZERO))
        .unwrap();
    ledger
        .record(&LedgerEntry::success(&b, "s3://b/b".into(), Duration::ZERO))
        .unwrap();
    ledger
        .record(&LedgerEntry::failure(&b, Stage::Staged, "y".into(), Duration::ZERO))
        .unwrap();

    let done = ledger.succeeded_sources().unwrap();
    assert!(done.contains("/in/A/a.svs"));
    assert!(!done.contains("/in/A/b.svs"));
}

#[test]
fn test_ledger_open_fails_on_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(OutcomeLedger::open(dir.path()).is_err());
}
