//! Tests for the chordscribe command line
//!
//! Each test works in its own temp directory with MIDI files built byte by
//! byte. HOME and XDG_CONFIG_HOME point at that directory too, so neither a
//! local chordscribe.toml nor the user's config file leaks in.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn smf(tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&480u16.to_be_bytes());
    for track in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track.len() as u32).to_be_bytes());
        buf.extend_from_slice(track);
    }
    buf
}

/// C major, then D minor 200 ticks later.
fn song() -> Vec<u8> {
    let mut t = Vec::new();
    for p in [60u8, 64, 67] {
        t.extend_from_slice(&[0x00, 0x90, p, 100]);
    }
    t.extend_from_slice(&[0x83, 0x60, 0x80, 60, 0, 0x00, 0x80, 64, 0, 0x00, 0x80, 67, 0]);
    t.extend_from_slice(&[0x81, 0x48, 0x90, 62, 100, 0x00, 0x90, 65, 100, 0x00, 0x90, 69, 100]);
    t.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    smf(&[t])
}

fn chord_track(name: &str, pitches: &[u8]) -> Vec<u8> {
    let mut t = vec![0x00, 0xFF, 0x03, name.len() as u8];
    t.extend_from_slice(name.as_bytes());
    for &p in pitches {
        t.extend_from_slice(&[0x00, 0x90, p, 90]);
    }
    t.extend_from_slice(&[0x83, 0x60, 0x80, pitches[0], 0]);
    t.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    t
}

const EXEMPLARS: &str = r#"[
  {"label": "C", "pitches": [60, 64, 67]},
  {"label": "Dm", "pitches": [62, 65, 69]}
]"#;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("song.mid"), song()).unwrap();
    std::fs::write(dir.path().join("exemplars.json"), EXEMPLARS).unwrap();
    dir
}

fn chordscribe(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chordscribe").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("CHORDSCRIBE_CLASSIFIER")
        .env_remove("CHORDSCRIBE_OUTPUT_DIR")
        .env_remove("CHORDSCRIBE_CHORD_GAP_TICKS")
        .env_remove("CHORDSCRIBE_MERGE_GAP_TICKS")
        .env_remove("CHORDSCRIBE_SIMILARITY_THRESHOLD")
        .env("CHORDSCRIBE_LOG_LEVEL", "warn");
    cmd
}

#[test]
fn chords_writes_tables_and_midi() {
    let dir = workspace();

    chordscribe(dir.path())
        .args(["chords", "song.mid", "--classifier", "exemplars.json", "--out-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("song.mid: 2 chords, 6 notes"));

    let out = dir.path().join("out");
    let chords = std::fs::read_to_string(out.join("song_chords.csv")).unwrap();
    assert_eq!(
        chords,
        "Notes,Predicted Chord\n\"[60, 64, 67]\",C\n\"[62, 65, 69]\",Dm\n"
    );

    let notes = std::fs::read_to_string(out.join("song_notes.csv")).unwrap();
    assert_eq!(notes, "Note\n60\n64\n67\n62\n65\n69\n");

    let midi = std::fs::read(out.join("song_chronological.mid")).unwrap();
    assert!(midi.starts_with(b"MThd"));
}

#[test]
fn chords_without_classifier_fails() {
    let dir = workspace();

    chordscribe(dir.path())
        .args(["chords", "song.mid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No chord classifier configured"));
}

#[test]
fn classifier_can_come_from_config_file() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("chordscribe.toml"),
        "[paths]\nclassifier = \"exemplars.json\"\noutput_dir = \"tables\"\n",
    )
    .unwrap();

    chordscribe(dir.path())
        .args(["chords", "song.mid"])
        .assert()
        .success();

    assert!(dir.path().join("tables/song_chords.csv").exists());
}

#[test]
fn chord_gap_flag_changes_segmentation() {
    let dir = workspace();

    // With a wide gap every note lands in one window, labelled by its nearest exemplar.
    chordscribe(dir.path())
        .args([
            "chords",
            "song.mid",
            "--classifier",
            "exemplars.json",
            "--out-dir",
            "out",
            "--chord-gap",
            "1000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 chords"));
}

#[test]
fn notes_prints_the_note_table() {
    let dir = workspace();

    chordscribe(dir.path())
        .args(["notes", "song.mid"])
        .assert()
        .success()
        .stdout("Note\n60\n64\n67\n62\n65\n69\n")
        .stderr(predicate::str::contains(
            "song.mid: 6 notes (0 dropped notes, 0 orphan stops)",
        ));
}

#[test]
fn notes_reports_folded_and_orphaned_notes() {
    let dir = workspace();
    // A stray stop for 50, then 60 struck twice within the merge gap.
    let mut t = vec![0x00, 0x80, 50, 0];
    t.extend_from_slice(&[0x00, 0x90, 60, 100, 0x82, 0x2C, 0x90, 60, 100]);
    t.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    std::fs::write(dir.path().join("messy.mid"), smf(&[t])).unwrap();

    chordscribe(dir.path())
        .args(["notes", "messy.mid"])
        .assert()
        .success()
        .stdout("Note\n60\n")
        .stderr(predicate::str::contains("1 dropped notes, 1 orphan stops"));
}

#[test]
fn chords_json_prints_one_summary_per_input() {
    let dir = workspace();

    let output = chordscribe(dir.path())
        .args(["chords", "song.mid", "--classifier", "exemplars.json", "--out-dir", "out", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let line = String::from_utf8(output).unwrap();
    let summary: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(summary["input"], "song.mid");
    assert_eq!(summary["chords"], 2);
    assert_eq!(summary["notes"], 6);
    assert_eq!(summary["diagnostics"]["chords_segmented"], 2);
    assert_eq!(summary["diagnostics"]["dropped_notes"], 0);
    assert!(dir.path().join("out/song_chords.csv").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn user_config_comes_from_the_isolated_home() {
    let dir = workspace();
    let user_dir = dir.path().join(".config").join("chordscribe");
    std::fs::create_dir_all(&user_dir).unwrap();
    std::fs::write(user_dir.join("config.toml"), "[pipeline]\nchord_gap_ticks = 33\n").unwrap();

    chordscribe(dir.path())
        .args(["config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chord_gap_ticks = 33"))
        .stdout(predicate::str::contains(".config/chordscribe/config.toml"));
}

#[test]
fn render_rejects_tempo_beyond_24_bits() {
    let dir = workspace();
    std::fs::write(dir.path().join("table.csv"), "Notes,Predicted Chord\n\"[60]\",C\n").unwrap();

    for tempo in ["17277216", "0"] {
        chordscribe(dir.path())
            .args(["render", "table.csv", "too-slow.mid", "--tempo", tempo])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--tempo"));
    }
    assert!(!dir.path().join("too-slow.mid").exists());

    chordscribe(dir.path())
        .args(["render", "table.csv", "slowest.mid", "--tempo", "16777215"])
        .assert()
        .success();
}

fn evaluation_corpus(dir: &Path) {
    let corpus = dir.join("corpus");
    std::fs::create_dir(&corpus).unwrap();
    std::fs::write(
        corpus.join("c major.mid"),
        smf(&[chord_track("I - C", &[60, 64, 67]), chord_track("vi - Am", &[57, 60, 64])]),
    )
    .unwrap();
    std::fs::write(corpus.join("d minor.mid"), smf(&[chord_track("ii - Dm", &[62, 65, 69])])).unwrap();
}

#[test]
fn evaluate_scores_a_classifier_and_writes_predictions() {
    let dir = workspace();
    evaluation_corpus(dir.path());

    // Am is not among the exemplars, so it comes out as the nearest: C.
    chordscribe(dir.path())
        .args([
            "evaluate",
            "corpus",
            "--classifier",
            "exemplars.json",
            "--output",
            "results.csv",
            "--precision-below",
            "0.6",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("accuracy: 0.67 (2/3)"))
        .stdout(predicate::str::contains("Am\t0.00\t0.00\t0.00\t1"))
        .stdout(predicate::str::contains("C\t0.50\t1.00\t0.67\t1"))
        .stdout(predicate::str::contains("Dm\t1.00\t1.00\t1.00\t1"))
        .stdout(predicate::str::contains("precision below 0.6: Am C"));

    let results = std::fs::read_to_string(dir.path().join("results.csv")).unwrap();
    assert_eq!(
        results,
        "filename,chord,notes,predicted_chord\n\
         c major.mid,C,\"[60, 64, 67]\",C\n\
         c major.mid,Am,\"[57, 60, 64]\",C\n\
         d minor.mid,Dm,\"[62, 65, 69]\",Dm\n"
    );
}

#[test]
fn evaluate_defaults_to_the_output_dir() {
    let dir = workspace();
    evaluation_corpus(dir.path());
    std::fs::write(
        dir.path().join("chordscribe.toml"),
        "[paths]\nclassifier = \"exemplars.json\"\noutput_dir = \"reports\"\n",
    )
    .unwrap();

    chordscribe(dir.path()).args(["evaluate", "corpus"]).assert().success();
    assert!(dir.path().join("reports/evaluation.csv").exists());
}

#[test]
fn evaluate_without_classifier_fails() {
    let dir = workspace();
    evaluation_corpus(dir.path());

    chordscribe(dir.path())
        .args(["evaluate", "corpus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No chord classifier configured"));
}

#[test]
fn config_shows_effective_values() {
    let dir = workspace();
    std::fs::write(dir.path().join("custom.toml"), "[pipeline]\nchord_gap_ticks = 75\n").unwrap();

    chordscribe(dir.path())
        .args(["--config", "custom.toml", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chord_gap_ticks = 75"))
        .stdout(predicate::str::contains("# loaded: custom.toml"))
        .stdout(predicate::str::contains("# env: CHORDSCRIBE_LOG_LEVEL"));
}
