use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use crate::ui::prelude::{Level, emit};

use super::cli::RenderArgs;
use super::config::VideoConfig;
use super::ffmpeg::{FfmpegCompiler, SystemFfmpegRunner, probe_duration_seconds};
use super::input::read_qa_file;
use super::layout::{SlideRenderer, load_font};
use super::pipeline::{CancelFlag, Pipeline, RunSummary};
use super::speech::{EspeakEngine, SpeechEngine, SpeechSynthesizer};
use super::utils::{canonicalize_existing, format_duration};

pub fn handle_render(args: RenderArgs, cancel: CancelFlag) -> Result<()> {
    let config = VideoConfig::load(args.config.as_deref())?;
    let csv_path = canonicalize_existing(&args.csv)?;
    let output_path = resolve_output_path(&args)?;

    let table = read_qa_file(&csv_path)
        .with_context(|| format!("Failed to read Q&A pairs from {}", csv_path.display()))?;
    emit(
        Level::Info,
        "video.render.input",
        &format!(
            "Loaded {} Q&A pair(s) from {}",
            table.pairs.len(),
            csv_path.display()
        ),
        Some(json!({ "pairs": table.pairs.len(), "encoding": table.encoding.to_string() })),
    );
    emit(
        Level::Debug,
        "video.render.encoding",
        &format!("Decoded input as {}", table.encoding),
        None,
    );

    // Preflight external tools before any work starts
    let engine = EspeakEngine::locate(config.speech_engine.as_deref())?;
    which::which("ffmpeg").context("ffmpeg is required to assemble the video but was not found")?;
    let font = load_font(config.font_path.as_deref())?;
    emit(
        Level::Debug,
        "video.render.engine",
        &format!(
            "Speech engine {} ({})",
            engine.name(),
            engine.binary().display()
        ),
        None,
    );

    let pipeline = Pipeline::new(
        SpeechSynthesizer::new(engine, config.speech_options()),
        SlideRenderer::new(font),
        config.segment_style(),
        FfmpegCompiler::new(config.assembly_options()),
        SystemFfmpegRunner,
    )
    .with_cancel_flag(cancel)
    .verbose(args.verbose);

    let summary = pipeline.run(&table.pairs, &output_path)?;

    emit(
        Level::Success,
        "video.render.success",
        &format!("Video created successfully: {}", summary.output.display()),
        Some(json!({
            "output": summary.output,
            "pairs": summary.pairs,
            "segments": summary.segments,
            "duration": summary.duration,
        })),
    );

    report_output(&summary, config.fps());

    Ok(())
}

fn resolve_output_path(args: &RenderArgs) -> Result<PathBuf> {
    fs::create_dir_all(&args.out_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.out_dir.display()
        )
    })?;

    let output_path = args.out_dir.join(&args.out_file);
    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Output file {} already exists. Use --force to overwrite.",
            output_path.display()
        );
    }

    Ok(output_path)
}

/// Read the finished file back and compare it against the timeline.
fn report_output(summary: &RunSummary, fps: u32) {
    if let Ok(metadata) = fs::metadata(&summary.output) {
        emit(
            Level::Info,
            "video.render.size",
            &format!(
                "Video file size: {:.1} MB",
                metadata.len() as f64 / (1024.0 * 1024.0)
            ),
            None,
        );
    }

    match probe_duration_seconds(&summary.output) {
        Ok(actual) => {
            emit(
                Level::Info,
                "video.render.duration",
                &format!(
                    "Video duration: {} (timeline {})",
                    format_duration(actual),
                    format_duration(summary.duration)
                ),
                None,
            );
            let tolerance = duration_tolerance(summary.segments, fps);
            if (actual - summary.duration).abs() > tolerance {
                emit(
                    Level::Warn,
                    "video.render.duration_mismatch",
                    &format!(
                        "Rendered duration {actual:.2}s differs from the planned {:.2}s",
                        summary.duration
                    ),
                    Some(json!({ "actual": actual, "expected": summary.duration })),
                );
            }
        }
        Err(err) => emit(
            Level::Warn,
            "video.render.probe_failed",
            &format!("Could not verify the rendered video: {err:#}"),
            None,
        ),
    }
}

/// Every looped slide is rounded up to a whole frame, so the encoded video
/// may run up to one frame per segment longer than the timeline.
fn duration_tolerance(segments: usize, fps: u32) -> f64 {
    (segments as f64 + 1.0) / fps.max(1) as f64 + 0.25
}
