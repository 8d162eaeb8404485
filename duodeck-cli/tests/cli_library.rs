use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn duodeck() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("duodeck"))
}

/// Two seconds of a quiet stereo tone.
fn write_wav(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for n in 0..88_200 {
        let sample = ((n as f32 * 0.05).sin() * 1_000.0) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn library_cmd(library: &Path) -> Command {
    let mut cmd = duodeck();
    cmd.env("RUST_LOG", "off").arg("--library").arg(library);
    cmd
}

#[test]
fn import_list_search_and_remove() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("library.csv");
    let intro = write_wav(dir.path(), "Warm Intro.wav");
    let peak = write_wav(dir.path(), "Peak Time.wav");

    library_cmd(&library)
        .args(["library", "import"])
        .arg(&intro)
        .arg(&peak)
        .assert()
        .success()
        .stdout(predicate::str::contains("added Warm Intro"))
        .stdout(predicate::str::contains("added Peak Time"));

    library_cmd(&library)
        .args(["library", "import"])
        .arg(&intro)
        .assert()
        .success()
        .stdout(predicate::str::contains("Warm Intro already in library"));

    let saved = std::fs::read_to_string(&library).unwrap();
    assert_eq!(saved.lines().count(), 2);
    assert!(saved.lines().all(|line| line.ends_with(",0:02")));

    library_cmd(&library)
        .args(["library", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0\tWarm Intro\t0:02"))
        .stdout(predicate::str::contains("1\tPeak Time\t0:02"));

    library_cmd(&library)
        .args(["library", "search", "PEAK"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1\tPeak Time"));

    library_cmd(&library)
        .args(["library", "search", "ambient"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("no match"));

    library_cmd(&library)
        .args(["library", "remove", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed Warm Intro"));

    library_cmd(&library)
        .args(["library", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0\tPeak Time"))
        .stdout(predicate::str::contains("Warm Intro").not());
}

#[test]
fn unreadable_files_are_reported_and_skipped() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("library.csv");
    let bogus = dir.path().join("notes.wav");
    std::fs::write(&bogus, b"not audio").unwrap();

    library_cmd(&library)
        .args(["library", "import"])
        .arg(&bogus)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to import"));

    library_cmd(&library)
        .args(["library", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("library is empty"));
}

#[test]
fn removing_past_the_end_fails() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("library.csv");
    library_cmd(&library)
        .args(["library", "remove", "3"])
        .assert()
        .failure();
}

#[test]
fn info_prints_length_and_rate() {
    let dir = TempDir::new().unwrap();
    let wav = write_wav(dir.path(), "tone.wav");
    duodeck()
        .env("RUST_LOG", "off")
        .arg("info")
        .arg(&wav)
        .assert()
        .success()
        .stdout(predicate::str::contains("length: 2.00s (0:02)"))
        .stdout(predicate::str::contains("sample rate: 44100 Hz"))
        .stdout(predicate::str::contains("frames: 88200"));
}

#[test]
fn info_on_a_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    duodeck()
        .env("RUST_LOG", "off")
        .arg("info")
        .arg(dir.path().join("missing.wav"))
        .assert()
        .failure();
}

#[test]
fn create_settings_json_outputs_defaults() {
    duodeck()
        .args(["create", "settings-json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"gain\": 0.5"))
        .stdout(predicate::str::contains("\"speed\": 1.0"))
        .stdout(predicate::str::contains("\"dry_level\": 1.0"))
        .stdout(predicate::str::contains("\"looping\": false"));
}
