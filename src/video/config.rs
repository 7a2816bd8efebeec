use anyhow::{Context, Result};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths;

use super::ffmpeg::AssemblyOptions;
use super::layout::SlideStyle;
use super::segment::SegmentStyle;
use super::speech::SpeechOptions;

/// Settings shared by every stage of a run. Stored as TOML; missing keys take
/// their defaults and nonsensical values fall back to defaults on access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// Output raster width in pixels
    pub width: u32,
    /// Output raster height in pixels
    pub height: u32,
    /// Output frame rate
    pub fps: u32,
    /// Slide text size in pixels
    pub font_size: u32,
    /// Margin around slide text in pixels
    pub margin: u32,
    /// Line advance as a multiple of the font size
    pub line_spacing: f32,
    /// Silent gap after every question and answer, in seconds
    pub pause_seconds: f64,
    pub question_background: [u8; 3],
    pub answer_background: [u8; 3],
    pub pause_background: [u8; 3],
    pub text_color: [u8; 3],
    /// Speaking rate in words per minute
    pub speech_rate: u32,
    /// Speech volume (0.0-2.0, 1.0 is the engine default)
    pub speech_volume: f32,
    /// Audio sample rate of the final video
    pub sample_rate: u32,
    pub audio_bitrate: String,
    /// TrueType font for slide text; common system fonts are tried when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    /// Speech engine binary; espeak-ng or espeak on PATH when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_engine: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            fps: Self::DEFAULT_FPS,
            font_size: Self::DEFAULT_FONT_SIZE,
            margin: Self::DEFAULT_MARGIN,
            line_spacing: Self::DEFAULT_LINE_SPACING,
            pause_seconds: Self::DEFAULT_PAUSE_SECONDS,
            question_background: [0, 0, 128],
            answer_background: [0, 64, 0],
            pause_background: [0, 0, 0],
            text_color: [255, 255, 255],
            speech_rate: Self::DEFAULT_SPEECH_RATE,
            speech_volume: Self::DEFAULT_SPEECH_VOLUME,
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            audio_bitrate: Self::DEFAULT_AUDIO_BITRATE.to_string(),
            font_path: None,
            speech_engine: None,
        }
    }
}

impl VideoConfig {
    pub const DEFAULT_WIDTH: u32 = 1280;
    pub const DEFAULT_HEIGHT: u32 = 720;
    pub const DEFAULT_FPS: u32 = 24;
    pub const DEFAULT_FONT_SIZE: u32 = 48;
    pub const DEFAULT_MARGIN: u32 = 60;
    pub const DEFAULT_LINE_SPACING: f32 = 1.5;
    pub const DEFAULT_PAUSE_SECONDS: f64 = 0.5;
    pub const DEFAULT_SPEECH_RATE: u32 = 150;
    pub const DEFAULT_SPEECH_VOLUME: f32 = 0.9;
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
    pub const DEFAULT_AUDIO_BITRATE: &'static str = "192k";

    /// Load from `path`, or from the user config directory when `None`.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_path(paths::video_config_path()?),
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading video config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("parsing video config {}", path.display()))
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating video config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing video config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing video config to {}", path.display()))?;
        Ok(())
    }

    /// Output raster size, rounded down to even values as yuv420p requires.
    pub fn dimensions(&self) -> (u32, u32) {
        let (width, height) = (self.width & !1, self.height & !1);
        if width == 0 || height == 0 {
            (Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
        } else {
            (width, height)
        }
    }

    pub fn fps(&self) -> u32 {
        if self.fps == 0 { Self::DEFAULT_FPS } else { self.fps }
    }

    pub fn font_size(&self) -> u32 {
        if self.font_size == 0 {
            Self::DEFAULT_FONT_SIZE
        } else {
            self.font_size
        }
    }

    pub fn line_spacing(&self) -> f32 {
        if !self.line_spacing.is_finite() || self.line_spacing <= 0.0 {
            Self::DEFAULT_LINE_SPACING
        } else {
            self.line_spacing
        }
    }

    pub fn pause_seconds(&self) -> f64 {
        if !self.pause_seconds.is_finite() || self.pause_seconds <= 0.0 {
            Self::DEFAULT_PAUSE_SECONDS
        } else {
            self.pause_seconds
        }
    }

    pub fn speech_volume(&self) -> f32 {
        if !self.speech_volume.is_finite() || !(0.0..=2.0).contains(&self.speech_volume) {
            Self::DEFAULT_SPEECH_VOLUME
        } else {
            self.speech_volume
        }
    }

    pub fn speech_rate(&self) -> u32 {
        if self.speech_rate == 0 {
            Self::DEFAULT_SPEECH_RATE
        } else {
            self.speech_rate
        }
    }

    pub fn sample_rate(&self) -> u32 {
        if self.sample_rate == 0 {
            Self::DEFAULT_SAMPLE_RATE
        } else {
            self.sample_rate
        }
    }

    pub fn slide_style(&self, background: [u8; 3]) -> SlideStyle {
        let (width, height) = self.dimensions();
        SlideStyle {
            width,
            height,
            background: Rgb(background),
            text_color: Rgb(self.text_color),
            font_size: self.font_size(),
            margin: self.margin,
            line_spacing: self.line_spacing(),
        }
    }

    pub fn segment_style(&self) -> SegmentStyle {
        SegmentStyle {
            question: self.slide_style(self.question_background),
            answer: self.slide_style(self.answer_background),
            pause: self.slide_style(self.pause_background),
            pause_seconds: self.pause_seconds(),
        }
    }

    pub fn speech_options(&self) -> SpeechOptions {
        SpeechOptions {
            rate: self.speech_rate(),
            volume: self.speech_volume(),
        }
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        let (width, height) = self.dimensions();
        AssemblyOptions {
            width,
            height,
            fps: self.fps(),
            sample_rate: self.sample_rate(),
            audio_bitrate: if self.audio_bitrate.trim().is_empty() {
                Self::DEFAULT_AUDIO_BITRATE.to_string()
            } else {
                self.audio_bitrate.trim().to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("video.toml");

        let config = VideoConfig::load_from_path(&path).unwrap();

        assert_eq!(config, VideoConfig::default());
        assert!(path.exists());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("speech_rate = 150"));
        assert!(!written.contains("font_path"));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("video.toml");
        fs::write(&path, "pause_seconds = 1.25\nanswer_background = [10, 20, 30]\n").unwrap();

        let config = VideoConfig::load_from_path(&path).unwrap();

        assert_eq!(config.pause_seconds(), 1.25);
        assert_eq!(config.answer_background, [10, 20, 30]);
        assert_eq!(config.dimensions(), (1280, 720));
        assert_eq!(config.speech_rate(), 150);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = VideoConfig {
            width: 0,
            fps: 0,
            pause_seconds: -1.0,
            speech_volume: f32::NAN,
            line_spacing: 0.0,
            ..VideoConfig::default()
        };

        assert_eq!(config.dimensions(), (1280, 720));
        assert_eq!(config.fps(), 24);
        assert_eq!(config.pause_seconds(), VideoConfig::DEFAULT_PAUSE_SECONDS);
        assert_eq!(config.speech_volume(), VideoConfig::DEFAULT_SPEECH_VOLUME);
        assert_eq!(config.line_spacing(), VideoConfig::DEFAULT_LINE_SPACING);
    }

    #[test]
    fn odd_dimensions_are_rounded_down_to_even() {
        let config = VideoConfig {
            width: 1281,
            height: 721,
            ..VideoConfig::default()
        };
        assert_eq!(config.dimensions(), (1280, 720));
        assert_eq!(config.assembly_options().width, 1280);
        assert_eq!(config.slide_style([0, 0, 0]).height, 720);

        let tiny = VideoConfig {
            width: 1,
            ..VideoConfig::default()
        };
        assert_eq!(tiny.dimensions(), (1280, 720));
    }

    #[test]
    fn malformed_toml_is_reported_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("video.toml");
        fs::write(&path, "width = \"wide\"").unwrap();

        let err = VideoConfig::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("video.toml"));
    }

    #[test]
    fn segment_style_uses_distinct_backgrounds() {
        let style = VideoConfig::default().segment_style();
        assert_eq!(style.question.background, Rgb([0, 0, 128]));
        assert_eq!(style.answer.background, Rgb([0, 64, 0]));
        assert_eq!(style.pause.background, Rgb([0, 0, 0]));
        assert_ne!(style.question.background, style.answer.background);
        assert_eq!(style.pause_seconds, 0.5);
    }
}
