//! Генератор таблицы таймингов слов
//!
//! Читает манифест секций, определяет длительность аудио через ffprobe и
//! записывает JSON таблицу `{ "<sectionId>": [ {word, startMs, endMs}, ... ] }`.

use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use siddur_karaoke::config::KaraokeConfig;
use siddur_karaoke::timing::{build_timing_table, TimingManifest};
use siddur_karaoke::utils::ffmpeg::check_ffprobe_installed;
use siddur_karaoke::utils::{init_logger, FfprobeDuration};

#[derive(Parser, Debug)]
#[command(
    name = "word-timings",
    about = "Generate per-word timings for prayer sections from audio durations"
)]
struct Args {
    /// Manifest with sections: [{ id, text, audio?, durationMs? }]
    #[arg(long, short = 'm')]
    manifest: PathBuf,

    /// Output JSON table path
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Library config (JSON); timing constants are read from it
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory audio paths are relative to; defaults to the manifest directory
    #[arg(long)]
    audio_root: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => KaraokeConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => KaraokeConfig::default(),
    };
    let manifest = TimingManifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;

    let base_dir = args.audio_root.clone().unwrap_or_else(|| {
        args.manifest
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let needs_probe = manifest
        .sections
        .iter()
        .any(|s| s.duration_ms.is_none() && s.audio.is_some());
    if needs_probe && !check_ffprobe_installed() {
        warn!("ffprobe not found; sections without durationMs will be skipped");
    }

    let (table, report) = build_timing_table(&manifest, &base_dir, &config.timing, &FfprobeDuration);

    table
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        "Matched: {}, unmatched: {}, degenerate words: {}",
        report.matched.len(),
        report.unmatched.len(),
        report.warnings
    );
    if !report.unmatched.is_empty() {
        warn!("Sections without timings: {}", report.unmatched.join(", "));
    }
    info!("Timings written to {}", args.output.display());

    Ok(())
}
