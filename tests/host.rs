use std::fs;

use clap::Parser;
use tempfile::tempdir;

use jonquil::{
    cli::{Args, Config, Mode, MAX_INPUT_FILES},
    error::HostError,
    report::scan_position,
    source::{SourceBuffer, SOURCE_BUFFER_CAPACITY},
    SnapshotTarget,
};

fn config_from(argv: &[&str]) -> Result<Config, jonquil::cli::UsageError> {
    let mut full = vec!["jonquil"];
    full.extend_from_slice(argv);
    let args = Args::try_parse_from(full).expect("arguments should tokenize");
    Config::from_args(args)
}

#[test]
fn no_arguments_selects_the_repl() {
    let config = config_from(&[]).expect("valid configuration");
    assert!(matches!(config.mode, Mode::Repl));
    assert!(config.files.is_empty());
    assert!(config.exec_snapshots.is_empty());
}

#[test]
fn script_files_select_run_mode() {
    let config = config_from(&["a.js", "b.js"]).expect("valid configuration");
    assert!(matches!(config.mode, Mode::Run));
    assert_eq!(config.files, vec!["a.js".to_string(), "b.js".to_string()]);
}

#[test]
fn exec_snapshots_alone_select_snapshot_mode() {
    let config =
        config_from(&["--exec-snapshot", "a.snapshot"]).expect("valid configuration");
    assert!(matches!(config.mode, Mode::ExecSnapshot));
    assert_eq!(config.exec_snapshots.len(), 1);
}

#[test]
fn snapshot_save_mode_captures_target_and_output() {
    let config = config_from(&["--save-snapshot-for-eval", "out.bin", "in.js"])
        .expect("valid configuration");
    match &config.mode {
        Mode::SaveSnapshot { target, output } => {
            assert_eq!(*target, SnapshotTarget::Eval);
            assert_eq!(output.to_str(), Some("out.bin"));
        }
        other => panic!("expected snapshot save mode, got {other:?}"),
    }
}

#[test]
fn snapshot_save_conflicts_are_rejected() {
    let err = config_from(&[
        "--save-snapshot-for-global",
        "a.bin",
        "--save-snapshot-for-eval",
        "b.bin",
        "in.js",
    ])
    .expect_err("conflicting save options");
    assert!(err.to_string().contains("already specified"));

    let err = config_from(&[
        "--save-snapshot-for-global",
        "a.bin",
        "--exec-snapshot",
        "b.bin",
        "in.js",
    ])
    .expect_err("save and exec conflict");
    assert!(err.to_string().contains("can't be passed simultaneously"));

    let err = config_from(&["--save-snapshot-for-global", "a.bin"])
        .expect_err("save requires a script");
    assert!(err.to_string().contains("exactly one script"));
}

#[test]
fn literal_save_requires_exactly_one_script() {
    let err = config_from(&["--save-literals-list-format", "out.txt", "a.js", "b.js"])
        .expect_err("two scripts are too many");
    assert!(err.to_string().contains("exactly one script"));
}

#[test]
fn input_file_count_is_bounded() {
    let names: Vec<String> = (0..MAX_INPUT_FILES + 1)
        .map(|idx| format!("script{idx}.js"))
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let err = config_from(&refs).expect_err("too many files");
    assert!(err.to_string().contains("too many input files"));
}

#[test]
fn scan_position_reads_the_engine_marker() {
    assert_eq!(
        scan_position("SyntaxError: unexpected token `;` [line: 1, column: 9]"),
        Some((1, 9))
    );
    assert_eq!(
        scan_position("prefix text [line: 12, column: 34] suffix"),
        Some((12, 34))
    );
}

#[test]
fn scan_position_rejects_malformed_markers() {
    assert_eq!(scan_position("no marker here"), None);
    assert_eq!(scan_position("[line: x, column: 3]"), None);
    assert_eq!(scan_position("[line: 3]"), None);
    assert_eq!(scan_position("[line: 3, column: ]"), None);
}

#[test]
fn buffer_loads_script_files() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("script.js");
    fs::write(&path, "print('loaded');").expect("write script");

    let mut buffer = SourceBuffer::new();
    let text = buffer
        .load_script(path.to_str().expect("utf-8 path"))
        .expect("load should succeed");
    assert_eq!(text, "print('loaded');");
    assert_eq!(buffer.bytes(), b"print('loaded');");
}

#[test]
fn buffer_rejects_missing_and_empty_files() {
    let dir = tempdir().expect("create temp dir");

    let mut buffer = SourceBuffer::new();
    let missing = dir.path().join("nope.js");
    let err = buffer
        .load_script(missing.to_str().expect("utf-8 path"))
        .expect_err("missing file");
    assert!(matches!(err, HostError::Open { .. }));

    let empty = dir.path().join("empty.js");
    fs::write(&empty, "").expect("write empty file");
    let err = buffer
        .load_script(empty.to_str().expect("utf-8 path"))
        .expect_err("empty file");
    assert!(matches!(err, HostError::Read { .. }));
}

#[test]
fn buffer_rejects_invalid_encodings_and_oversized_input() {
    let dir = tempdir().expect("create temp dir");

    let binary = dir.path().join("blob.bin");
    fs::write(&binary, [0xff, 0xfe, 0x00, 0x01]).expect("write blob");
    let mut buffer = SourceBuffer::new();
    let err = buffer
        .load_script(binary.to_str().expect("utf-8 path"))
        .expect_err("invalid utf-8");
    assert!(matches!(err, HostError::Encoding { .. }));

    // the same bytes are fine as an opaque blob
    let bytes = buffer.load_blob(&binary).expect("blob load");
    assert_eq!(bytes.len(), 4);

    let huge = dir.path().join("huge.js");
    fs::write(&huge, vec![b' '; SOURCE_BUFFER_CAPACITY + 1]).expect("write huge file");
    let err = buffer
        .load_script(huge.to_str().expect("utf-8 path"))
        .expect_err("oversized file");
    assert!(matches!(err, HostError::TooLarge { .. }));
}

#[test]
fn buffer_holds_repl_lines() {
    let mut buffer = SourceBuffer::new();
    let text = buffer.load_line("1 + 1").expect("line load");
    assert_eq!(text, "1 + 1");
    assert_eq!(buffer.bytes(), b"1 + 1");
}
