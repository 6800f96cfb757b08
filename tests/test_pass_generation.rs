//! End-to-end pass generation over JSON granules written to a scratch directory

use altipass::epoch::SEC85_AT_2000;
use altipass::pass_core::{CoreError, CycleRange, RunError, Selection};
use altipass::writer::{PassHandle, PassMetadata, PassWriterBackend, WriterError};
use altipass::{BackendType, MissionSpec, NominalOrbit, PassGenerator, PassWriter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::tempdir;

/// Start of phase A in granule time (seconds since 2000)
const PHASE_A: f64 = 979_603_200.0 - SEC85_AT_2000;

fn pass_duration() -> f64 {
    MissionSpec::reference().phases[0].pass_duration()
}

fn write_granule(dir: &Path, name: &str, product: &str, times: &[f64]) -> PathBuf {
    let n = times.len();
    let doc = json!({
        "dimensions": {"time_01": n},
        "attributes": {"product_name": product, "processing_baseline": "F"},
        "variables": {
            "time_01": {"shape": [n], "data": times},
            "lat_01": {"shape": [n], "data": vec![12_500_000; n]},
            "lon_01": {"shape": [n], "data": vec![200_000_000; n]},
            "alt_01": {"shape": [n], "data": vec![1_336_000_000; n]},
            "range_ocean_20_ku": {"shape": [n, 20], "data": vec![1_335_990_000.0; n * 20]},
            "flag_meas_20_ku": {"shape": [n, 20], "data": vec![0; n * 20]},
            "flag_cor_applied_01": {"shape": [n], "data": vec![1; n]},
            "flag_cor_err_01": {"shape": [n], "data": vec![0; n]},
            "mod_dry_tropo_cor_01": {"shape": [n], "data": vec![-2300; n]}
        }
    });
    let path = dir.join(name);
    fs::write(&path, doc.to_string()).unwrap();
    path
}

fn series(start: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + i as f64).collect()
}

fn orbit() -> NominalOrbit {
    NominalOrbit::new(MissionSpec::reference()).unwrap()
}

fn read_jsonl(path: &Path) -> (Value, Vec<Value>) {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines().map(|l| serde_json::from_str::<Value>(l).unwrap());
    let header = lines.next().unwrap();
    (header, lines.collect())
}

fn column(lines: &[Value], name: &str) -> Vec<f64> {
    let line = lines.iter().find(|l| l["name"] == name).unwrap();
    line["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

/// Two files around the pass 1 / pass 2 boundary; file 2 starts 0.2 s
/// before the last record of file 1.
fn overlapping_pair(dir: &Path) -> Vec<PathBuf> {
    let first = series(PHASE_A + 3000.0, 300);
    let last = *first.last().unwrap();
    let second = series(last - 0.2, 200);
    vec![
        write_granule(dir, "RA_GDR_0001.json", "PRODUCT_1", &first),
        write_granule(dir, "RA_GDR_0002.json", "PRODUCT_2", &second),
    ]
}

#[derive(Default)]
struct Recorded {
    passes: Vec<PassMetadata>,
    shutdown: bool,
}

/// Writer that only remembers what it was asked to write
struct RecordingWriter(Rc<RefCell<Recorded>>);

impl PassWriterBackend for RecordingWriter {
    fn init_mission(&mut self, _mission: &str, _tag: &str) -> Result<(), WriterError> {
        Ok(())
    }

    fn phase(&mut self, _name: &str) -> Result<(), WriterError> {
        Ok(())
    }

    fn begin_pass(&mut self, meta: &PassMetadata) -> Result<PassHandle, WriterError> {
        let mut log = self.0.borrow_mut();
        log.passes.push(meta.clone());
        Ok(PassHandle(log.passes.len() as u64))
    }

    fn define_variable(&mut self, _pass: PassHandle, _name: &str) -> Result<(), WriterError> {
        Ok(())
    }

    fn put_values(&mut self, _pass: PassHandle, _name: &str, _values: &[f64]) -> Result<(), WriterError> {
        Ok(())
    }

    fn close_pass(&mut self, pass: PassHandle) -> Result<String, WriterError> {
        Ok(format!("memory:{}", pass.0))
    }

    fn shutdown(&mut self) -> Result<(), WriterError> {
        self.0.borrow_mut().shutdown = true;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[test]
fn test_overlapping_files_keep_one_duplicate() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    let paths = overlapping_pair(input.path());

    let writer = PassWriter::new(BackendType::Jsonl, output.path()).unwrap();
    let generator = PassGenerator::new(orbit(), writer, 30_000, Selection::default(), "a").unwrap();
    let summary = generator.run(&paths).unwrap();

    assert_eq!(summary.files_read, 2);
    assert_eq!(summary.records_trimmed, 1);
    assert_eq!(summary.records_dropped, 0);
    assert_eq!(summary.passes_written, 2);

    let pass_dir = output.path().join("ra/a/c001");
    let (header1, lines1) = read_jsonl(&pass_dir.join("raap0001c001.jsonl"));
    let (header2, lines2) = read_jsonl(&pass_dir.join("raap0002c001.jsonl"));

    let mut time = column(&lines1, "time");
    time.extend(column(&lines2, "time"));
    assert_eq!(time.len(), 499);
    assert!(time.windows(2).all(|w| w[1] > w[0]));

    // Of the two records 0.2 s apart only the one from file 2 survives
    let file1_last = PHASE_A + 3299.0 + SEC85_AT_2000;
    let near = |target: f64| time.iter().any(|&t| (t - target).abs() < 1e-3);
    assert!(!near(file1_last));
    assert!(near(file1_last - 0.2));

    // Pass 2 starts at the first record after the second equator crossing
    let boundary = PHASE_A + pass_duration() + SEC85_AT_2000;
    assert!(column(&lines1, "time").iter().all(|&t| t < boundary));
    assert!(column(&lines2, "time").iter().all(|&t| t >= boundary));

    assert_eq!(header1["records"], 374);
    assert_eq!(header2["records"], 125);
    assert_eq!(header1["source"], "PRODUCT_1 PRODUCT_2");
    assert_eq!(header2["source"], "PRODUCT_2");
    assert_eq!(header1["phase"], "a");
}

#[test]
fn test_trimmed_records_do_not_credit_their_granule() {
    let input = tempdir().unwrap();
    let boundary = PHASE_A + pass_duration();
    // The last record of file A lies in pass 2 and is replaced by file B
    let first = write_granule(input.path(), "RA_GDR_A.json", "A", &series(boundary - 100.3, 101));
    let second = write_granule(input.path(), "RA_GDR_B.json", "B", &series(boundary + 0.5, 50));

    let log = Rc::new(RefCell::new(Recorded::default()));
    let generator =
        PassGenerator::new(orbit(), RecordingWriter(log.clone()), 1_000, Selection::default(), "a")
            .unwrap();
    let summary = generator.run([first, second]).unwrap();

    assert_eq!(summary.records_trimmed, 1);
    let passes = &log.borrow().passes;
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0].source, "A");
    assert_eq!(passes[1].source, "B");
    assert_eq!(passes[1].records, 50);
}

#[test]
fn test_range_is_corrected_for_applied_terms() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    let path = write_granule(input.path(), "RA_GDR_0003.json", "P3", &series(PHASE_A + 10.0, 5));

    let writer = PassWriter::new(BackendType::Jsonl, output.path()).unwrap();
    let generator = PassGenerator::new(orbit(), writer, 100, Selection::default(), "a").unwrap();
    generator.run([&path]).unwrap();

    let (_, lines) = read_jsonl(&output.path().join("ra/a/c001/raap0001c001.jsonl"));
    for r in column(&lines, "range_ku") {
        assert!((r - (1_335_990.0 + 2.3)).abs() < 1e-6);
    }
    for n in column(&lines, "range_numval_ku") {
        assert_eq!(n, 20.0);
    }
}

#[test]
fn test_cycle_outside_selection_is_not_written() {
    let input = tempdir().unwrap();
    let paths = overlapping_pair(input.path());

    let log = Rc::new(RefCell::new(Recorded::default()));
    let selection = Selection {
        cycles: Some(CycleRange { first: 5, last: 6 }),
        equator_times: None,
    };
    let generator =
        PassGenerator::new(orbit(), RecordingWriter(log.clone()), 30_000, selection, "a").unwrap();
    let summary = generator.run(&paths).unwrap();

    assert!(log.borrow().passes.is_empty());
    assert!(log.borrow().shutdown);
    assert_eq!(summary.passes_written, 0);
    assert_eq!(summary.passes_skipped, 2);
}

#[test]
fn test_bad_inputs_are_skipped() {
    let input = tempdir().unwrap();
    let misnamed = write_granule(input.path(), "notes.json", "N", &series(PHASE_A, 3));
    let broken = input.path().join("RA_GDR_broken.json");
    fs::write(&broken, "{ not json").unwrap();
    let missing = input.path().join("RA_GDR_missing.json");
    let empty = write_granule(input.path(), "RA_GDR_empty.json", "E", &[]);

    let log = Rc::new(RefCell::new(Recorded::default()));
    let generator =
        PassGenerator::new(orbit(), RecordingWriter(log.clone()), 100, Selection::default(), "a")
            .unwrap();
    let summary = generator.run([misnamed, broken, missing, empty]).unwrap();

    assert_eq!(summary.files_skipped, 4);
    assert_eq!(summary.files_read, 0);
    assert!(log.borrow().passes.is_empty());
}

#[test]
fn test_capacity_exceeded_aborts_run() {
    let input = tempdir().unwrap();
    let path = write_granule(input.path(), "RA_GDR_big.json", "B", &series(PHASE_A, 300));

    let log = Rc::new(RefCell::new(Recorded::default()));
    let generator =
        PassGenerator::new(orbit(), RecordingWriter(log), 100, Selection::default(), "a").unwrap();
    let err = generator.run([path]).unwrap_err();
    assert!(matches!(
        err,
        RunError::Core(CoreError::CapacityExceeded { capacity: 100, required: 300 })
    ));
}

#[test]
fn test_sqlite_backend_end_to_end() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    let paths = overlapping_pair(input.path());
    let db_path = output.path().join("passes.db");

    let writer = PassWriter::new(BackendType::Sqlite, &db_path).unwrap();
    let generator = PassGenerator::new(orbit(), writer, 30_000, Selection::default(), "a").unwrap();
    generator.run(&paths).unwrap();

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let passes: i64 = conn
        .query_row("SELECT COUNT(*) FROM passes", [], |row| row.get(0))
        .unwrap();
    assert_eq!(passes, 2);
    let records: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pass_values v JOIN passes p ON p.id = v.pass_id
             WHERE p.pass = 1 AND v.variable = 'time'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(records, 374);
}

#[test]
fn test_random_chunking_preserves_every_record_once() {
    let input = tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    // 1 Hz series crossing two pass boundaries, cut into files that repeat
    // a few records of their predecessor
    let duration = pass_duration();
    let all = series(PHASE_A + duration - 400.5, 4000);
    let mut paths = Vec::new();
    let mut start = 0;
    while start < all.len() {
        let len = rng.gen_range(50..250).min(all.len() - start);
        let overlap = if start == 0 { 0 } else { rng.gen_range(0..4).min(start) };
        let chunk = &all[start - overlap..start + len];
        let name = format!("RA_GDR_{:03}.json", paths.len());
        paths.push(write_granule(input.path(), &name, &name, chunk));
        start += len;
    }

    let log = Rc::new(RefCell::new(Recorded::default()));
    let generator =
        PassGenerator::new(orbit(), RecordingWriter(log.clone()), 30_000, Selection::default(), "a")
            .unwrap();
    let summary = generator.run(&paths).unwrap();

    let passes = &log.borrow().passes;
    assert_eq!(passes.len(), 3);
    assert_eq!(passes[0].records, 401);
    assert_eq!(passes.iter().map(|p| p.records).sum::<usize>(), all.len());
    assert!(passes.windows(2).all(|w| w[1].start_time > w[0].end_time));
    assert_eq!(summary.records_dropped, 0);
}
