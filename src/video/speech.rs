use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use hound::{SampleFormat, WavReader};
use thiserror::Error;

const ENGINE_CANDIDATES: &[&str] = &["espeak-ng", "espeak"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechOptions {
    /// Words per minute
    pub rate: u32,
    /// 1.0 is the engine's normal loudness
    pub volume: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            rate: 150,
            volume: 0.9,
        }
    }
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("speech engine failed: {0}")]
    Synthesis(String),

    #[error("audio file {} failed verification: {message}", path.display())]
    Verification { path: PathBuf, message: String },
}

/// A verified spoken audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub duration_seconds: f64,
}

/// Backend that turns text into a WAV file on disk.
pub trait SpeechEngine {
    fn name(&self) -> &str;

    fn synthesize_to(
        &self,
        text: &str,
        output: &Path,
        options: &SpeechOptions,
    ) -> Result<(), SpeechError>;
}

/// Offline synthesis through the espeak / espeak-ng command line.
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    binary: PathBuf,
}

impl EspeakEngine {
    /// Resolve the engine binary once per run: the configured path if given,
    /// otherwise espeak-ng or espeak from PATH.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            let binary = which::which(path).with_context(|| {
                format!("Configured speech engine {} was not found", path.display())
            })?;
            return Ok(Self { binary });
        }

        ENGINE_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|binary| Self { binary })
            .ok_or_else(|| {
                anyhow!("No speech engine found. Install espeak-ng (or espeak) and try again.")
            })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// espeak amplitude runs 0-200 with 100 as normal.
    fn amplitude(volume: f32) -> u32 {
        (volume.clamp(0.0, 2.0) * 100.0).round() as u32
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        self.binary
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("espeak")
    }

    fn synthesize_to(
        &self,
        text: &str,
        output: &Path,
        options: &SpeechOptions,
    ) -> Result<(), SpeechError> {
        let mut child = Command::new(&self.binary)
            .arg("-w")
            .arg(output)
            .arg("-s")
            .arg(options.rate.to_string())
            .arg("-a")
            .arg(Self::amplitude(options.volume).to_string())
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                SpeechError::Synthesis(format!("failed to spawn {}: {err}", self.binary.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|err| SpeechError::Synthesis(format!("failed to send text: {err}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| SpeechError::Synthesis(format!("failed to wait for engine: {err}")))?;

        if !output.status.success() {
            return Err(SpeechError::Synthesis(format!(
                "{} exited with status {:?}: {}",
                self.name(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Request/response adapter over a [`SpeechEngine`]: every successful call
/// returns an asset that has been read back and measured.
pub struct SpeechSynthesizer<E: SpeechEngine> {
    engine: E,
    options: SpeechOptions,
}

impl<E: SpeechEngine> SpeechSynthesizer<E> {
    pub fn new(engine: E, options: SpeechOptions) -> Self {
        Self { engine, options }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn synthesize(&self, text: &str, output_path: &Path) -> Result<AudioAsset, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::Synthesis("no text to speak".to_string()));
        }

        self.engine
            .synthesize_to(text, output_path, &self.options)?;

        if !output_path.exists() {
            return Err(SpeechError::Synthesis(format!(
                "{} reported success but wrote no file at {}",
                self.engine.name(),
                output_path.display()
            )));
        }

        verify_wav(output_path)
    }
}

/// Re-open a WAV file, decode every sample and measure it. Unreadable,
/// truncated or silent-length files are rejected.
pub fn verify_wav(path: &Path) -> Result<AudioAsset, SpeechError> {
    let verification = |message: String| SpeechError::Verification {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = WavReader::open(path).map_err(|err| verification(err.to_string()))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(verification(format!(
            "invalid format ({} Hz, {} channels)",
            spec.sample_rate, spec.channels
        )));
    }

    let decoded = match spec.sample_format {
        SampleFormat::Int => reader
            .samples::<i32>()
            .try_fold(0usize, |count, sample| sample.map(|_| count + 1)),
        SampleFormat::Float => reader
            .samples::<f32>()
            .try_fold(0usize, |count, sample| sample.map(|_| count + 1)),
    }
    .map_err(|err| verification(format!("unreadable sample data: {err}")))?;

    let frames = decoded / spec.channels as usize;
    if frames == 0 {
        return Err(verification("zero duration".to_string()));
    }

    Ok(AudioAsset {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        duration_seconds: frames as f64 / spec.sample_rate as f64,
    })
}
