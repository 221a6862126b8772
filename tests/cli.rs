use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn jonquil() -> Command {
    Command::cargo_bin("jonquil").expect("binary exists")
}

#[test]
fn runs_a_script_file() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("hello.js");
    fs::write(&script, "print('Hello from Jonquil!');\n").expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello from Jonquil!"));
}

#[test]
fn reads_a_script_from_stdin() {
    jonquil()
        .arg("-")
        .write_stdin("print(6 * 7);")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn script_errors_produce_failure_exit_code() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("boom.js");
    fs::write(&script, "missing();\n").expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Script Error: ReferenceError"));
}

#[test]
fn syntax_error_renders_context_and_caret() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("bad.js");
    fs::write(&script, "var x = ;\n").expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("var x = ;"))
        .stderr(predicate::str::contains("~~~~~~~~^"))
        .stderr(predicate::str::contains("Script Error: SyntaxError"));
}

#[test]
fn batch_stops_at_the_first_failing_file() {
    let dir = tempdir().expect("create temp dir");
    let bad = dir.path().join("bad.js");
    let good = dir.path().join("good.js");
    fs::write(&bad, "missing();\n").expect("write script");
    fs::write(&good, "print('never reached');\n").expect("write script");

    jonquil()
        .arg(&bad)
        .arg(&good)
        .assert()
        .failure()
        .stdout(predicate::str::contains("never reached").not());
}

#[test]
fn deferred_reactions_flush_before_exit() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("defer.js");
    fs::write(
        &script,
        "Promise.resolve('deferred').then(function (v) { print(v); });\nprint('sync');\n",
    )
    .expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .success()
        .stdout("sync\ndeferred\n");
}

#[test]
fn parse_only_skips_execution() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("quiet.js");
    fs::write(&script, "print('should not run');\n").expect("write script");

    jonquil()
        .arg("--parse-only")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn assertion_failure_terminates_with_failure() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("assert.js");
    fs::write(&script, "assert(1 === 2);\nprint('unreachable');\n").expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Script Error: assertion failed"))
        .stdout(predicate::str::contains("unreachable").not());
}

#[test]
fn holding_assertion_exits_cleanly() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("assert.js");
    fs::write(&script, "assert(true);\nprint('ok');\n").expect("write script");

    jonquil().arg(&script).assert().success().stdout("ok\n");
}

#[test]
fn empty_files_are_read_errors() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("empty.js");
    fs::write(&script, "").expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read file"));
}

#[test]
fn unknown_options_are_usage_errors() {
    jonquil().arg("--frobnicate").assert().failure().code(1);
}

#[test]
fn missing_option_values_are_usage_errors() {
    jonquil().arg("--exec-snapshot").assert().failure().code(1);
}

#[test]
fn doubled_snapshot_save_options_conflict() {
    jonquil()
        .args(["--save-snapshot-for-global", "a.bin"])
        .args(["--save-snapshot-for-eval", "b.bin"])
        .arg("script.js")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already specified"));
}

#[test]
fn snapshot_save_and_exec_conflict() {
    jonquil()
        .args(["--save-snapshot-for-global", "a.bin"])
        .args(["--exec-snapshot", "b.bin"])
        .arg("script.js")
        .assert()
        .failure()
        .stderr(predicate::str::contains("can't be passed simultaneously"));
}

#[test]
fn snapshot_save_requires_exactly_one_script() {
    jonquil()
        .args(["--save-snapshot-for-global", "a.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly one script"));
}

#[test]
fn rejects_more_input_files_than_the_configured_maximum() {
    let mut cmd = jonquil();
    for idx in 0..65 {
        cmd.arg(format!("script{idx}.js"));
    }
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("too many input files"));
}

#[test]
fn snapshot_round_trip_matches_direct_run() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("trip.js");
    let blob = dir.path().join("trip.snapshot");
    fs::write(&script, "print('round trip');\n").expect("write script");

    jonquil()
        .arg(&script)
        .assert()
        .success()
        .stdout("round trip\n");

    jonquil()
        .arg("--save-snapshot-for-global")
        .arg(&blob)
        .arg(&script)
        .assert()
        .success();
    assert!(blob.exists(), "snapshot file should be written");

    jonquil()
        .arg("--exec-snapshot")
        .arg(&blob)
        .assert()
        .success()
        .stdout("round trip\n");
}

#[test]
fn corrupt_snapshots_fail_to_execute() {
    let dir = tempdir().expect("create temp dir");
    let blob = dir.path().join("bad.snapshot");
    fs::write(&blob, "not a snapshot").expect("write blob");

    jonquil()
        .arg("--exec-snapshot")
        .arg(&blob)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Script Error"));
}

#[test]
fn literal_dump_lists_each_literal_once() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("lits.js");
    let out = dir.path().join("lits.txt");
    fs::write(
        &script,
        "var greeting = \"alpha\";\nprint(\"alpha\", \"beta\", 42);\n",
    )
    .expect("write script");

    jonquil()
        .arg("--save-literals-list-format")
        .arg(&out)
        .arg(&script)
        .assert()
        .success();

    let listing = fs::read_to_string(&out).expect("read literal dump");
    assert_eq!(listing, "alpha\nbeta\n42\n");
}

#[test]
fn literal_dump_c_format_is_source_shaped() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("lits.js");
    let out = dir.path().join("lits.h");
    fs::write(&script, "print(\"only\");\n").expect("write script");

    jonquil()
        .arg("--save-literals-c-format")
        .arg(&out)
        .arg(&script)
        .assert()
        .success();

    let listing = fs::read_to_string(&out).expect("read literal dump");
    assert!(listing.contains("const char *literals["));
    assert!(listing.contains("\"only\""));
}

#[test]
fn repl_evaluates_lines_until_end_of_input() {
    jonquil()
        .arg("--no-prompt")
        .write_stdin("1+1\n1+1\n")
        .assert()
        .success()
        .stdout("2\n2\n");
}

#[test]
fn repl_errors_do_not_end_the_session() {
    jonquil()
        .arg("--no-prompt")
        .write_stdin("missing\n1+1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2"))
        .stderr(predicate::str::contains("Script Error: ReferenceError"));
}

#[test]
fn repl_drains_reactions_after_each_line() {
    jonquil()
        .arg("--no-prompt")
        .write_stdin("Promise.resolve('later').then(function (v) { print(v); })\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("later"));
}

#[test]
fn disabled_features_warn_but_do_not_fail() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("ok.js");
    fs::write(&script, "print('still ran');\n").expect("write script");

    jonquil()
        .arg("--mem-stats")
        .arg(&script)
        .assert()
        .success()
        .stdout("still ran\n")
        .stderr(predicate::str::contains("Ignoring '--mem-stats' option"));
}

#[test]
fn log_level_zero_silences_warnings() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("ok.js");
    fs::write(&script, "print('quiet');\n").expect("write script");

    jonquil()
        .args(["--log-level", "0", "--mem-stats"])
        .arg(&script)
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring").not());
}

#[test]
fn show_opcodes_dumps_the_parsed_program() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("dump.js");
    fs::write(&script, "print('dump me');\n").expect("write script");

    jonquil()
        .arg("--show-opcodes")
        .arg(&script)
        .assert()
        .success()
        .stdout("dump me\n")
        .stderr(predicate::str::contains("parsed program"));
}
