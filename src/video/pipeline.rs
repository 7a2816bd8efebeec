use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;
use tempfile::TempDir;

use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

use super::error::QaVideoError;
use super::ffmpeg::{FfmpegCompiler, FfmpegRunOptions, FfmpegRunner};
use super::input::QaPair;
use super::layout::SlideRenderer;
use super::segment::{SegmentBuilder, SegmentStyle};
use super::speech::{SpeechEngine, SpeechSynthesizer};
use super::timeline::Timeline;
use super::utils::{format_duration, snippet};

/// Shared flag used to stop a run between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub pairs: usize,
    pub segments: usize,
    pub duration: f64,
}

/// Drives a whole run: one scratch directory, rows in input order, a single
/// timeline, and one encode into a staged file that only replaces
/// `output_path` once ffmpeg has succeeded.
pub struct Pipeline<E: SpeechEngine, R: FfmpegRunner> {
    synthesizer: SpeechSynthesizer<E>,
    renderer: SlideRenderer,
    style: SegmentStyle,
    compiler: FfmpegCompiler,
    runner: R,
    cancel: CancelFlag,
    temp_root: Option<PathBuf>,
    verbose: bool,
}

impl<E: SpeechEngine, R: FfmpegRunner> Pipeline<E, R> {
    pub fn new(
        synthesizer: SpeechSynthesizer<E>,
        renderer: SlideRenderer,
        style: SegmentStyle,
        compiler: FfmpegCompiler,
        runner: R,
    ) -> Self {
        Self {
            synthesizer,
            renderer,
            style,
            compiler,
            runner,
            cancel: CancelFlag::default(),
            temp_root: None,
            verbose: false,
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create the scratch directory under `root` instead of the system temp dir.
    #[cfg(test)]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn run(&self, pairs: &[QaPair], output_path: &Path) -> Result<RunSummary, QaVideoError> {
        if pairs.is_empty() {
            return Err(QaVideoError::EmptyInput);
        }

        let scratch = self.scratch_dir()?;
        emit(
            Level::Debug,
            "video.render.scratch",
            &format!(
                "Using scratch directory {} with speech engine {}",
                scratch.path().display(),
                self.synthesizer.engine().name()
            ),
            None,
        );

        let result = self.run_in(pairs, output_path, scratch.path());

        // Dropping the TempDir also removes it; close() just lets us report failures
        let scratch_path = scratch.path().to_path_buf();
        if let Err(err) = scratch.close() {
            emit(
                Level::Warn,
                "video.render.cleanup_failed",
                &format!(
                    "Could not remove scratch directory {}: {err}",
                    scratch_path.display()
                ),
                None,
            );
        }

        result
    }

    fn scratch_dir(&self) -> Result<TempDir, QaVideoError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("qavid-");
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn run_in(
        &self,
        pairs: &[QaPair],
        output_path: &Path,
        scratch: &Path,
    ) -> Result<RunSummary, QaVideoError> {
        let builder = SegmentBuilder::new(&self.synthesizer, &self.renderer, &self.style);
        let mut timeline = Timeline::new();
        let total = pairs.len();

        for (position, pair) in pairs.iter().enumerate() {
            self.check_cancelled()?;
            let ordinal = position + 1;

            emit(
                Level::Info,
                "video.render.row",
                &format!(
                    "Processing Q&A pair {ordinal} of {total}: {}",
                    snippet(&pair.question)
                ),
                Some(json!({ "row": pair.index, "position": ordinal, "total": total })),
            );

            let spinner = create_spinner(format!("Synthesizing speech for pair {ordinal}"));
            let segments = match builder.build(pair, scratch) {
                Ok(segments) => {
                    finish_spinner_with_success(spinner, format!("Pair {ordinal} ready"));
                    segments
                }
                Err(err) => {
                    spinner.finish_and_clear();
                    if err.is_verification() {
                        emit(
                            Level::Debug,
                            "video.render.verification",
                            "The speech engine exited cleanly but its output is unusable",
                            None,
                        );
                    }
                    return Err(err);
                }
            };

            let durations: Vec<String> = segments
                .iter()
                .map(|s| format!("{:.2}s", s.duration()))
                .collect();
            emit(
                Level::Debug,
                "video.render.row_segments",
                &format!("Pair {ordinal} segments: {}", durations.join(", ")),
                None,
            );

            timeline.extend(segments);
        }

        self.check_cancelled()?;

        let duration = timeline.total_duration();
        emit(
            Level::Info,
            "video.render.assemble",
            &format!(
                "Combining {} segments ({})",
                timeline.len(),
                format_duration(duration)
            ),
            Some(json!({
                "segments": timeline.len(),
                "spoken": timeline.spoken_count(),
                "duration": duration,
            })),
        );
        emit(
            Level::Debug,
            "video.render.offsets",
            &format!(
                "Segment start offsets: {}",
                timeline
                    .start_times()
                    .iter()
                    .map(|start| format!("{start:.2}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None,
        );

        self.assemble(&timeline, output_path)?;

        Ok(RunSummary {
            output: output_path.to_path_buf(),
            pairs: total,
            segments: timeline.len(),
            duration,
        })
    }

    fn assemble(&self, timeline: &Timeline, output_path: &Path) -> Result<(), QaVideoError> {
        let output_dir = output_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Staged next to the destination so the final rename stays on one filesystem
        let staged = tempfile::Builder::new()
            .prefix(".qa_video-")
            .suffix(".mp4")
            .tempfile_in(output_dir)?
            .into_temp_path();

        let args = self.compiler.compile(timeline, &staged)?;
        emit(
            Level::Debug,
            "video.render.ffmpeg_args",
            &format!("ffmpeg {}", args.join(" ")),
            None,
        );

        let options = FfmpegRunOptions::new(
            Some(timeline.total_duration()),
            self.verbose,
            get_output_format() == OutputFormat::Text,
        );
        self.runner
            .run(&args, options)
            .map_err(|err| QaVideoError::Assembly(format!("{err:#}")))?;

        let written = fs::metadata(&staged)?.len();
        if written == 0 {
            return Err(QaVideoError::Assembly(
                "ffmpeg finished but wrote an empty file".to_string(),
            ));
        }

        staged.persist(output_path).map_err(|err| {
            QaVideoError::Assembly(format!(
                "failed to move video into place at {}: {}",
                output_path.display(),
                err.error
            ))
        })?;

        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), QaVideoError> {
        if self.cancel.is_cancelled() {
            Err(QaVideoError::Cancelled)
        } else {
            Ok(())
        }
    }
}
