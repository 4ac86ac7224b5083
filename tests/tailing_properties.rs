use filetail::checkpoint::{CheckpointRecord, CheckpointStore};
use filetail::config::{MonitorDefinition, StartPosition};
use filetail::events::Record;
use filetail::monitor::{Monitor, MonitorRegistry};
use filetail::tail::{FileIdentity, LineExtractor};
use filetail::{MonitorError, RegistryError};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn append(path: &Path, bytes: &[u8]) {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
}

fn new_monitor(dir: &Path) -> Monitor {
    Monitor::new(
        MonitorDefinition::new(dir.join("app.log")).with_tag("app:"),
        dir.join("state").join("app.state"),
        StartPosition::Beginning,
    )
}

fn poll_all(monitor: &mut Monitor) -> Vec<Record> {
    monitor.poll().expect("poll should succeed")
}

#[test]
fn test_resume_after_restart_has_no_gaps_or_duplicates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let stage_a = b"alpha\nbravo\ncharl";
    let stage_b = b"ie\ndelta\n";

    append(&path, stage_a);
    let mut first = new_monitor(dir.path());
    first.initialize(true);
    let mut records = poll_all(&mut first);
    first.persist().unwrap();
    first.close();
    drop(first);

    append(&path, stage_b);
    let mut second = new_monitor(dir.path());
    second.initialize(true);
    records.extend(poll_all(&mut second));

    let expected: Vec<Record> = ["alpha", "bravo", "charlie", "delta"]
        .into_iter()
        .map(Record::from)
        .collect();
    assert_eq!(records, expected);
}

#[test]
fn test_partial_line_withholding() {
    let mut extractor = LineExtractor::default();

    extractor.feed(b"hello");
    assert_eq!(extractor.drain().count(), 0);

    extractor.feed(b" world\n");
    let records: Vec<Record> = extractor.drain().collect();
    assert_eq!(records, vec![Record::from("hello world")]);
}

#[test]
#[cfg(unix)]
fn test_rotation_resets_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let original = b"a fairly long line in the original file\n";
    append(&path, original);

    let mut monitor = new_monitor(dir.path());
    monitor.initialize(true);
    poll_all(&mut monitor);
    let old_identity = monitor.identity().unwrap();
    assert_eq!(monitor.offset(), original.len() as u64);

    std::fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    append(&path, b"new\n");

    assert_eq!(poll_all(&mut monitor), vec![Record::from("new")]);
    assert_ne!(monitor.identity().unwrap(), old_identity);
    assert_eq!(monitor.offset(), 4);
}

#[test]
#[cfg(unix)]
fn test_rotation_while_stopped_reads_new_file_from_start() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"0123456789\n");

    let mut first = new_monitor(dir.path());
    first.initialize(true);
    poll_all(&mut first);
    first.persist().unwrap();
    first.close();

    std::fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    // Longer than the saved offset, so only the identity can tell them apart
    append(&path, b"replacement file content\n");

    let mut second = new_monitor(dir.path());
    second.initialize(true);
    assert_eq!(
        poll_all(&mut second),
        vec![Record::from("replacement file content")]
    );
}

#[test]
fn test_capacity_enforcement() {
    let max_monitors = 4;
    let mut registry = MonitorRegistry::new(max_monitors);

    let results: Vec<Result<(), RegistryError>> = (0..=max_monitors)
        .map(|n| {
            registry.register(Monitor::new(
                MonitorDefinition::new(format!("/var/log/{}.log", n)),
                PathBuf::from(format!("/tmp/{}.state", n)),
                StartPosition::Beginning,
            ))
        })
        .collect();

    assert!(results[..max_monitors].iter().all(Result::is_ok));
    assert_eq!(
        results[max_monitors],
        Err(RegistryError::CapacityExceeded {
            capacity: max_monitors
        })
    );
    assert_eq!(registry.len(), max_monitors);
}

#[test]
fn test_checkpoint_round_trip() {
    let dir = TempDir::new().unwrap();
    let checkpoint = dir.path().join("app.state");

    for offset in [0, 1, 5_000_000_000u64] {
        let record = CheckpointRecord {
            path: PathBuf::from("/var/log/app.log"),
            identity: Some(FileIdentity::new(66306, 9_876_543)),
            offset,
        };
        CheckpointStore::save(&checkpoint, &record).unwrap();
        assert_eq!(CheckpointStore::load(&checkpoint).unwrap(), record);
    }
}

#[test]
fn test_missing_file_tolerance() {
    let dir = TempDir::new().unwrap();
    let mut monitor = new_monitor(dir.path());
    monitor.initialize(true);

    for _ in 0..3 {
        match monitor.poll() {
            Err(MonitorError::Transient { .. }) => {}
            other => panic!("Expected a transient error, got {:?}", other),
        }
    }

    append(&dir.path().join("app.log"), b"finally\n");
    assert_eq!(poll_all(&mut monitor), vec![Record::from("finally")]);
}

/// File content in two stages, with a restart in between
#[derive(Debug, Clone)]
struct TwoStageContent {
    stage_a: Vec<u8>,
    stage_b: Vec<u8>,
}

impl Arbitrary for TwoStageContent {
    fn arbitrary(g: &mut Gen) -> Self {
        let alphabet = [b'x', b'y', b' ', b'\n'];
        let gen_bytes = |g: &mut Gen| -> Vec<u8> {
            let len = usize::arbitrary(g) % 64;
            (0..len)
                .map(|_| *g.choose(&alphabet).unwrap_or(&b'\n'))
                .collect()
        };
        let stage_a = gen_bytes(g);
        let stage_b = gen_bytes(g);
        TwoStageContent { stage_a, stage_b }
    }
}

// Records read across a persist/restart equal those of a single uninterrupted read
#[quickcheck]
fn prop_resume_equals_single_pass(content: TwoStageContent) -> bool {
    let restarted = {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, &content.stage_a);

        let mut first = new_monitor(dir.path());
        first.initialize(true);
        let mut records = first.poll().unwrap_or_default();
        first.persist().unwrap();
        first.close();
        drop(first);

        append(&path, &content.stage_b);
        let mut second = new_monitor(dir.path());
        second.initialize(true);
        records.extend(second.poll().unwrap_or_default());
        records
    };

    let single = {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, &content.stage_a);
        append(&path, &content.stage_b);

        let mut monitor = new_monitor(dir.path());
        monitor.initialize(true);
        monitor.poll().unwrap_or_default()
    };

    restarted == single
}
