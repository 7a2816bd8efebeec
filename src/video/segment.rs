use std::path::{Path, PathBuf};

use super::error::{QaVideoError, Role};
use super::input::QaPair;
use super::layout::{SlideRenderer, SlideStyle, save_slide};
use super::speech::{AudioAsset, SpeechEngine, SpeechSynthesizer};
use super::utils::snippet;

const PAUSE_SLIDE_FILE: &str = "pause.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Question,
    Answer,
    Pause,
}

/// A rendered slide image held on screen for `duration` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub image_path: PathBuf,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Row index of the pair this segment belongs to
    pub pair_index: usize,
    pub slide: Slide,
    /// `None` for pauses, which play silence
    pub audio: Option<AudioAsset>,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.slide.duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStyle {
    pub question: SlideStyle,
    pub answer: SlideStyle,
    pub pause: SlideStyle,
    pub pause_seconds: f64,
}

/// Turns one question/answer pair into
/// `[question, pause, answer, pause]`.
pub struct SegmentBuilder<'a, E: SpeechEngine> {
    synthesizer: &'a SpeechSynthesizer<E>,
    renderer: &'a SlideRenderer,
    style: &'a SegmentStyle,
}

impl<'a, E: SpeechEngine> SegmentBuilder<'a, E> {
    pub fn new(
        synthesizer: &'a SpeechSynthesizer<E>,
        renderer: &'a SlideRenderer,
        style: &'a SegmentStyle,
    ) -> Self {
        Self {
            synthesizer,
            renderer,
            style,
        }
    }

    pub fn build(&self, pair: &QaPair, temp_dir: &Path) -> Result<Vec<Segment>, QaVideoError> {
        // Both audio files must exist before anything is rendered
        let question_audio = self.speak(pair, Role::Question, &pair.question, temp_dir)?;
        let answer_audio = self.speak(pair, Role::Answer, &pair.answer, temp_dir)?;

        let question_slide = self.text_slide(
            pair,
            Role::Question,
            &format!("Q: {}", pair.question),
            &self.style.question,
            question_audio.duration_seconds,
            temp_dir,
        )?;
        let answer_slide = self.text_slide(
            pair,
            Role::Answer,
            &format!("A: {}", pair.answer),
            &self.style.answer,
            answer_audio.duration_seconds,
            temp_dir,
        )?;
        let pause_slide = self.pause_slide(temp_dir)?;

        Ok(vec![
            Segment {
                kind: SegmentKind::Question,
                pair_index: pair.index,
                slide: question_slide,
                audio: Some(question_audio),
            },
            Segment {
                kind: SegmentKind::Pause,
                pair_index: pair.index,
                slide: pause_slide.clone(),
                audio: None,
            },
            Segment {
                kind: SegmentKind::Answer,
                pair_index: pair.index,
                slide: answer_slide,
                audio: Some(answer_audio),
            },
            Segment {
                kind: SegmentKind::Pause,
                pair_index: pair.index,
                slide: pause_slide,
                audio: None,
            },
        ])
    }

    fn speak(
        &self,
        pair: &QaPair,
        role: Role,
        text: &str,
        temp_dir: &Path,
    ) -> Result<AudioAsset, QaVideoError> {
        let path = temp_dir.join(format!("{}_{}.wav", role.tag(), pair.index));
        self.synthesizer
            .synthesize(text, &path)
            .map_err(|source| QaVideoError::Speech {
                row: pair.index,
                role,
                snippet: snippet(text),
                source,
            })
    }

    fn text_slide(
        &self,
        pair: &QaPair,
        role: Role,
        text: &str,
        style: &SlideStyle,
        duration: f64,
        temp_dir: &Path,
    ) -> Result<Slide, QaVideoError> {
        let image_path = temp_dir.join(format!("{}_{}.png", role.tag(), pair.index));
        let image = self.renderer.render(text, style);
        write_slide(&image, &image_path)?;
        Ok(Slide {
            image_path,
            duration,
        })
    }

    /// Pause slides are identical, so the image is written once per directory.
    fn pause_slide(&self, temp_dir: &Path) -> Result<Slide, QaVideoError> {
        let image_path = temp_dir.join(PAUSE_SLIDE_FILE);
        if !image_path.exists() {
            let image = self.renderer.render("", &self.style.pause);
            write_slide(&image, &image_path)?;
        }
        Ok(Slide {
            image_path,
            duration: self.style.pause_seconds,
        })
    }
}

fn write_slide(image: &image::RgbImage, path: &Path) -> Result<(), QaVideoError> {
    save_slide(image, path).map_err(|err| QaVideoError::Slide {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::config::VideoConfig;
    use crate::video::speech::SpeechOptions;
    use crate::video::speech::testing::FakeEngine;
    use tempfile::TempDir;

    fn pair(index: usize, question: &str, answer: &str) -> QaPair {
        QaPair {
            index,
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    fn small_style() -> SegmentStyle {
        let config = VideoConfig {
            width: 64,
            height: 36,
            ..VideoConfig::default()
        };
        config.segment_style()
    }

    #[test]
    fn builds_question_pause_answer_pause() {
        let temp_dir = TempDir::new().unwrap();
        let synthesizer = SpeechSynthesizer::new(FakeEngine::default(), SpeechOptions::default());
        let renderer = SlideRenderer::without_font();
        let style = small_style();
        let builder = SegmentBuilder::new(&synthesizer, &renderer, &style);

        let segments = builder
            .build(&pair(1, "What is 2+2?", "4"), temp_dir.path())
            .unwrap();

        let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Question,
                SegmentKind::Pause,
                SegmentKind::Answer,
                SegmentKind::Pause
            ]
        );
        assert!(segments[0].audio.is_some());
        assert!(segments[1].audio.is_none());
        assert!(segments[2].audio.is_some());
        assert!(segments[3].audio.is_none());
        assert!(segments.iter().all(|s| s.pair_index == 1));
        assert!(segments.iter().all(|s| s.slide.image_path.exists()));
    }

    #[test]
    fn slide_durations_match_audio_exactly() {
        let temp_dir = TempDir::new().unwrap();
        let synthesizer = SpeechSynthesizer::new(FakeEngine::default(), SpeechOptions::default());
        let renderer = SlideRenderer::without_font();
        let style = small_style();
        let builder = SegmentBuilder::new(&synthesizer, &renderer, &style);

        let segments = builder
            .build(&pair(3, "Capital of France?", "Paris"), temp_dir.path())
            .unwrap();

        for segment in &segments {
            if let Some(audio) = &segment.audio {
                assert_eq!(segment.duration(), audio.duration_seconds);
            } else {
                assert_eq!(segment.duration(), style.pause_seconds);
            }
        }

        let total: f64 = segments.iter().map(Segment::duration).sum();
        let expected = FakeEngine::expected_seconds("Capital of France?")
            + style.pause_seconds
            + FakeEngine::expected_seconds("Paris")
            + style.pause_seconds;
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn scratch_files_are_keyed_by_row_and_role() {
        let temp_dir = TempDir::new().unwrap();
        let synthesizer = SpeechSynthesizer::new(FakeEngine::default(), SpeechOptions::default());
        let renderer = SlideRenderer::without_font();
        let style = small_style();
        let builder = SegmentBuilder::new(&synthesizer, &renderer, &style);

        let first = builder.build(&pair(1, "One?", "1"), temp_dir.path()).unwrap();
        let second = builder.build(&pair(2, "Two?", "2"), temp_dir.path()).unwrap();

        let audio_name = |s: &Segment| {
            s.audio
                .as_ref()
                .and_then(|a| a.path.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        };
        assert_eq!(audio_name(&first[0]).as_deref(), Some("q_1.wav"));
        assert_eq!(audio_name(&first[2]).as_deref(), Some("a_1.wav"));
        assert_eq!(audio_name(&second[0]).as_deref(), Some("q_2.wav"));
        assert_eq!(audio_name(&second[2]).as_deref(), Some("a_2.wav"));
        assert_ne!(first[0].slide.image_path, second[0].slide.image_path);
        assert_eq!(first[1].slide.image_path, second[3].slide.image_path);
    }

    #[test]
    fn answer_failure_reports_row_role_and_snippet() {
        let temp_dir = TempDir::new().unwrap();
        let synthesizer =
            SpeechSynthesizer::new(FakeEngine::failing_on("Paris"), SpeechOptions::default());
        let renderer = SlideRenderer::without_font();
        let style = small_style();
        let builder = SegmentBuilder::new(&synthesizer, &renderer, &style);

        let err = builder
            .build(&pair(7, "Capital of France?", "Paris"), temp_dir.path())
            .unwrap_err();

        match &err {
            QaVideoError::Speech {
                row, role, snippet, ..
            } => {
                assert_eq!(*row, 7);
                assert_eq!(*role, Role::Answer);
                assert_eq!(snippet, "Paris");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_verification());
        // Nothing is rendered for a failed pair
        assert!(!temp_dir.path().join("q_7.png").exists());
    }
}
