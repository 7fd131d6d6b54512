// End-to-end checks of directory merging on scratch run directories
use ardusipm_decoder::{
    export, quality_report, AcquisitionTime, Decoder, DecoderConfig, DecoderError, MergeConfig,
    ParseMode,
};
use std::fs;
use std::path::Path;

fn write_run(dir: &Path, name: &str, frames: &[&str]) {
    let mut content = String::new();
    for frame in frames {
        content.push_str(frame);
        content.push(',');
    }
    fs::write(dir.join(name), content).unwrap();
}

fn run_directory() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_run(
        dir.path(),
        "bg1.csv",
        &[
            "u200101120000.000000t0av14$1",
            "u200101120001.000000t05v20t06v1f1$2",
            "u200101120010.000000$0",
        ],
    );
    write_run(
        dir.path(),
        "bg2.csv",
        &["u200102080000.500000t01v02$1", "garbage", "u200102080003.000000t03v04$1"],
    );
    write_run(dir.path(), "thermal1.csv", &["u200103090000.000000t07v30$1"]);
    dir
}

#[test]
fn test_include_filter_selects_matching_runs() {
    let dir = run_directory();
    let config = MergeConfig::new().with_include("bg");
    let corpus = Decoder::new().merge_directory(dir.path(), &config).unwrap();

    let names: Vec<_> = corpus.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["bg1.csv", "bg2.csv"]);
    assert_eq!(corpus.skipped_files, 1);
    assert_eq!(corpus.len(), 7);
}

#[test]
fn test_total_duration_is_sum_of_file_durations() {
    let dir = run_directory();
    let decoder = Decoder::new();
    let corpus = decoder.merge_directory(dir.path(), &MergeConfig::new()).unwrap();

    let mut expected = 0.0;
    for name in ["bg1.csv", "bg2.csv", "thermal1.csv"] {
        let table = decoder.parse_file(&dir.path().join(name), ParseMode::Full).unwrap();
        expected += table.duration.seconds();
    }
    assert_eq!(corpus.total_seconds(), expected);
    assert_eq!(corpus.total_seconds(), 12.5);
    assert_eq!(corpus.duration_errors, 0);
    assert!(corpus.failed_files.is_empty());
}

#[test]
fn test_parallel_merge_matches_sequential() {
    let dir = run_directory();
    let decoder = Decoder::new();
    let sequential = decoder.merge_directory(dir.path(), &MergeConfig::new()).unwrap();
    let parallel = decoder
        .merge_directory(dir.path(), &MergeConfig::new().with_parallel(true))
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_corrupted_rows_are_kept_and_flagged() {
    let dir = run_directory();
    let corpus = Decoder::new()
        .merge_directory(dir.path(), &MergeConfig::new().with_include("bg"))
        .unwrap();

    // bg1: 1f1 ADC signature on the second frame, bg2: one unusable frame
    let corrupted: Vec<_> = corpus.records.iter().filter(|r| r.is_corrupted()).collect();
    assert_eq!(corrupted.len(), 3);
    assert_eq!(corpus.files[0].corrupted_rows, 2);
    assert_eq!(corpus.records[2].adc, -4);

    let rates = quality_report(&corpus.records);
    assert_eq!(rates[&2], 1.0);
    assert_eq!(rates[&-3], 1.0);
    assert_eq!(rates[&0], 0.0);
}

#[test]
fn test_counts_only_merge() {
    let dir = run_directory();
    let config = MergeConfig::new().with_include("bg").with_mode(ParseMode::Counts);
    let corpus = Decoder::new().merge_directory(dir.path(), &config).unwrap();

    // one row per frame
    assert_eq!(corpus.len(), 6);
    assert_eq!(corpus.total_seconds(), 12.5);
}

#[test]
fn test_invalid_utf8_only_degrades_its_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = b"u200101120000.000000t0av14$1,u200101120001.000000t01v02$1,".to_vec();
    content.extend_from_slice(b"u200101120002.000000t03v1\xff4$1,");
    content.extend_from_slice(b"u200101120003.000000t05v06$1,");
    fs::write(dir.path().join("bg3.csv"), content).unwrap();

    let decoder = Decoder::new();
    let table = decoder.parse_file(&dir.path().join("bg3.csv"), ParseMode::Full).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.corrupted_frames, 1);
    assert_eq!(table.records[2].adc, -5);
    assert_eq!(table.records[2].quality_flag, 1);
    assert!(table.records.iter().enumerate().all(|(i, r)| i == 2 || r.quality_flag == 0));
    assert_eq!(table.duration.seconds(), 3.0);

    let corpus = decoder.merge_directory(dir.path(), &MergeConfig::new()).unwrap();
    assert_eq!(corpus.len(), 4);
    assert!(corpus.failed_files.is_empty());
}

#[test]
fn test_run_without_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "raw.csv", &["t0av14$1", "t01v02$1"]);
    write_run(dir.path(), "timed.csv", &["u200101120000.000000$0", "u200101120002.000000$0"]);

    let decoder = Decoder::new();
    let table = decoder.parse_file(&dir.path().join("raw.csv"), ParseMode::Full).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.duration, AcquisitionTime::Unavailable);

    let corpus = decoder.merge_directory(dir.path(), &MergeConfig::new()).unwrap();
    assert_eq!(corpus.duration_errors, 1);
    assert_eq!(corpus.total_seconds(), 2.0);
}

#[test]
fn test_custom_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_run(dir.path(), "run.txt", &["u200101120000.000000t0av14$1"]);
    write_run(dir.path(), "run.csv", &["u200101120000.000000t0av14$1"]);

    let decoder = Decoder::with_config(DecoderConfig::new().with_extension("txt"));
    let corpus = decoder.merge_directory(dir.path(), &MergeConfig::new()).unwrap();
    assert_eq!(corpus.files_merged(), 1);
    assert_eq!(corpus.files[0].name, "run.txt");
}

#[test]
fn test_merge_errors() {
    let decoder = Decoder::new();
    let config = MergeConfig::new();

    let missing = decoder.merge_directory(Path::new("/nonexistent/ardusipm"), &config);
    assert!(matches!(missing, Err(DecoderError::DirectoryMissing(_))));

    let dir = run_directory();
    let unmatched = decoder.merge_directory(dir.path(), &config.with_include("Co60"));
    assert!(matches!(unmatched, Err(DecoderError::NoFilesMatched { .. })));
}

#[test]
fn test_export_round_trip_of_merged_table() {
    let dir = run_directory();
    let corpus = Decoder::new().merge_directory(dir.path(), &MergeConfig::new()).unwrap();

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("corpus.csv");
    export::write_table_file(&path, &corpus.records).unwrap();
    assert_eq!(export::read_table_file(&path).unwrap(), corpus.records);
}
