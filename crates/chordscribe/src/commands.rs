//! CLI command implementations

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chordconf::{ChordConfig, ConfigSources};
use midi_chords::{
    chords_to_midi, chronological_stream, evaluate_corpus_dir, read_chord_table, read_midi,
    tracks_to_midi, write_chord_table, write_note_table, write_predictions, ChordPipeline,
    ExemplarClassifier, RenderOptions,
};
use tracing::{debug, info};

/// Per-run values given on the command line, taking precedence over config.
pub struct ChordsOverrides {
    pub classifier: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub merge_gap: Option<u32>,
    pub chord_gap: Option<u32>,
    pub similarity: Option<usize>,
    pub json: bool,
}

fn create_file(path: &Path) -> Result<BufWriter<fs::File>> {
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// The classifier named on the command line, else the configured one
fn load_classifier(path: Option<PathBuf>, config: &ChordConfig) -> Result<ExemplarClassifier> {
    let Some(classifier_path) = path.or_else(|| config.paths.classifier.clone()) else {
        bail!(
            "No chord classifier configured.\n\n\
             Pass --classifier <exemplars.json|corpus dir>, set paths.classifier\n\
             in chordscribe.toml, or set CHORDSCRIBE_CLASSIFIER."
        );
    };
    let classifier = ExemplarClassifier::load(&classifier_path)
        .with_context(|| format!("Failed to load classifier from {}", classifier_path.display()))?;
    if classifier.is_empty() {
        bail!("Classifier at {} has no exemplars", classifier_path.display());
    }
    debug!(exemplars = classifier.len(), "classifier ready");
    Ok(classifier)
}

fn file_stem(path: &Path) -> Result<String> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => bail!("Cannot derive an output name from {}", path.display()),
    }
}

/// Run the full pipeline over each input and write its tables
pub fn chords(config: &ChordConfig, inputs: &[PathBuf], overrides: ChordsOverrides) -> Result<()> {
    let mut pipeline_config = config.pipeline.clone();
    if let Some(v) = overrides.merge_gap {
        pipeline_config.merge_gap_ticks = v;
    }
    if let Some(v) = overrides.chord_gap {
        pipeline_config.chord_gap_ticks = v;
    }
    if let Some(v) = overrides.similarity {
        pipeline_config.similarity_threshold = v;
    }

    let classifier = load_classifier(overrides.classifier, config)?;

    let out_dir = overrides.out_dir.unwrap_or_else(|| config.paths.output_dir.clone());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let pipeline = ChordPipeline::new(Arc::new(classifier)).with_config(pipeline_config);

    for input in inputs {
        let source = read_midi(input).with_context(|| format!("Failed to read {}", input.display()))?;
        let report = pipeline
            .run(&source.tracks)
            .with_context(|| format!("Chord pipeline failed for {}", input.display()))?;

        let stem = file_stem(input)?;
        let chords_path = out_dir.join(format!("{stem}_chords.csv"));
        let notes_path = out_dir.join(format!("{stem}_notes.csv"));
        let midi_path = out_dir.join(format!("{stem}_chronological.mid"));

        let mut writer = create_file(&chords_path)?;
        write_chord_table(&mut writer, &report.chords)
            .with_context(|| format!("Failed to write {}", chords_path.display()))?;
        writer.flush()?;

        let mut writer = create_file(&notes_path)?;
        write_note_table(&mut writer, &report.notes)
            .with_context(|| format!("Failed to write {}", notes_path.display()))?;
        writer.flush()?;

        let midi = tracks_to_midi(std::slice::from_ref(&report.chronological), source.ppq);
        fs::write(&midi_path, midi).with_context(|| format!("Failed to write {}", midi_path.display()))?;

        if overrides.json {
            let summary = serde_json::json!({
                "input": input.display().to_string(),
                "chords": report.chords.len(),
                "notes": report.notes.len(),
                "output": chords_path.display().to_string(),
                "diagnostics": &report.diagnostics,
            });
            println!("{summary}");
            continue;
        }

        let d = &report.diagnostics;
        println!(
            "{}: {} chords, {} notes ({} segmented, {} repeated, {} similar, {} dropped notes, {} orphan stops) -> {}",
            input.display(),
            report.chords.len(),
            report.notes.len(),
            d.chords_segmented,
            d.repeated,
            d.similar,
            d.dropped_notes,
            d.orphan_stops,
            chords_path.display()
        );
    }

    Ok(())
}

/// Print the chronological note table; no classifier involved
pub fn notes(config: &ChordConfig, input: &Path) -> Result<()> {
    let source = read_midi(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let chronology = chronological_stream(&source.tracks, &config.pipeline);
    let d = &chronology.diagnostics;
    // stderr, so the table on stdout can be piped
    eprintln!(
        "{}: {} notes ({} dropped notes, {} orphan stops)",
        input.display(),
        chronology.notes.len(),
        d.dropped_notes,
        d.orphan_stops
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_note_table(&mut out, &chronology.notes)?;
    out.flush()?;
    Ok(())
}

/// Build an exemplar file from a labelled chord corpus and print a census
pub fn exemplars(corpus: &Path, output: &Path) -> Result<()> {
    let classifier = ExemplarClassifier::from_corpus_dir(corpus)
        .with_context(|| format!("Failed to read chord corpus {}", corpus.display()))?;
    if classifier.is_empty() {
        bail!("No labelled chords found in {}", corpus.display());
    }

    let mut writer = create_file(output)?;
    classifier
        .to_json(&mut writer)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    writer.flush()?;

    for (label, count) in classifier.label_counts() {
        println!("{label}\t{count}");
    }
    info!(
        exemplars = classifier.len(),
        output = %output.display(),
        "wrote exemplar file"
    );
    Ok(())
}

/// Score a classifier on a labelled corpus and write every prediction
pub fn evaluate(
    config: &ChordConfig,
    corpus: &Path,
    classifier: Option<PathBuf>,
    output: Option<PathBuf>,
    precision_below: Option<f64>,
) -> Result<()> {
    let classifier = load_classifier(classifier, config)?;
    let evaluation = evaluate_corpus_dir(&classifier, corpus)
        .with_context(|| format!("Failed to evaluate against {}", corpus.display()))?;
    if evaluation.predictions.is_empty() {
        bail!("No labelled chords found in {}", corpus.display());
    }

    let output = match output {
        Some(path) => path,
        None => {
            let dir = &config.paths.output_dir;
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            dir.join("evaluation.csv")
        }
    };
    let mut writer = create_file(&output)?;
    write_predictions(&mut writer, &evaluation.predictions)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    writer.flush()?;

    println!(
        "accuracy: {:.2} ({}/{})",
        evaluation.accuracy,
        evaluation.correct(),
        evaluation.predictions.len()
    );
    println!("label\tprecision\trecall\tf1\tsupport");
    for s in &evaluation.labels {
        println!(
            "{}\t{:.2}\t{:.2}\t{:.2}\t{}",
            s.label, s.precision, s.recall, s.f1, s.support
        );
    }
    if let Some(threshold) = precision_below {
        let low: Vec<&str> = evaluation
            .labels_below(threshold)
            .map(|s| s.label.as_str())
            .collect();
        println!("precision below {threshold}: {}", low.join(" "));
    }

    info!(output = %output.display(), "wrote predictions");
    Ok(())
}

/// Recreate a MIDI file from a chord table
pub fn render(table: &Path, output: &Path, chord_ticks: u32, tempo: u32) -> Result<()> {
    let file = fs::File::open(table).with_context(|| format!("Failed to open {}", table.display()))?;
    let chords = read_chord_table(io::BufReader::new(file))
        .with_context(|| format!("Failed to read chord table {}", table.display()))?;

    let options = RenderOptions {
        chord_ticks,
        tempo_usec: tempo,
        ..RenderOptions::default()
    };
    let midi = chords_to_midi(&chords, &options)?;
    fs::write(output, midi).with_context(|| format!("Failed to write {}", output.display()))?;

    info!(chords = chords.len(), output = %output.display(), "rendered chord table");
    Ok(())
}

/// Print the effective configuration and where it came from
pub fn show_config(config: &ChordConfig, sources: &ConfigSources) {
    for file in &sources.files {
        println!("# loaded: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env: {var}");
    }
    print!("{}", config.to_toml());
}
