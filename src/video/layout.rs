//! Slide rasterization.
//!
//! Text is wrapped greedily using a cheap width estimate (`chars * font_size / 2`)
//! instead of glyph metrics, then drawn top-down from the margin. Lines that
//! fall below the canvas are dropped; words are never split.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use anyhow::{Context, Result, anyhow};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SlideStyle {
    pub width: u32,
    pub height: u32,
    pub background: Rgb<u8>,
    pub text_color: Rgb<u8>,
    pub font_size: u32,
    pub margin: u32,
    /// Line advance as a multiple of `font_size`
    pub line_spacing: f32,
}

impl SlideStyle {
    /// Width available to a line of text.
    pub fn max_line_width(&self) -> u32 {
        self.width.saturating_sub(self.margin.saturating_mul(2))
    }

    pub fn line_height(&self) -> u32 {
        ((self.font_size as f32 * self.line_spacing) as u32).max(1)
    }
}

/// Estimated rendered width of `text` in pixels.
pub fn estimated_width(text: &str, font_size: u32) -> f32 {
    text.chars().count() as f32 * (font_size as f32 / 2.0)
}

/// Greedy word wrap. A word that is wider than `max_width` on its own still
/// gets a line to itself.
pub fn wrap_lines(text: &str, max_width: u32, font_size: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if estimated_width(&candidate, font_size) > max_width as f32 {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Draws text slides. Holds the font so it is parsed once per run.
pub struct SlideRenderer {
    font: Option<FontArc>,
}

impl SlideRenderer {
    pub fn new(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Renderer that lays out text without drawing glyphs.
    #[cfg(test)]
    pub(crate) fn without_font() -> Self {
        Self { font: None }
    }

    pub fn render(&self, text: &str, style: &SlideStyle) -> RgbImage {
        render_text_slide(text, style, self.font.as_ref())
    }
}

/// Render `text` onto a fresh canvas of exactly `style.width` x `style.height`.
pub fn render_text_slide(text: &str, style: &SlideStyle, font: Option<&FontArc>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(style.width, style.height, style.background);

    let Some(font) = font else {
        return canvas;
    };

    let lines = wrap_lines(text, style.max_line_width(), style.font_size);
    let line_height = style.line_height() as i64;
    let mut y = style.margin as i64;
    for line in &lines {
        if y >= style.height as i64 {
            break;
        }
        draw_text_mut(
            &mut canvas,
            style.text_color,
            style.margin as i32,
            y as i32,
            style.font_size as f32,
            font,
            line,
        );
        y += line_height;
    }

    canvas
}

/// Load the configured font, or the first usable system font.
pub fn load_font(configured: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = configured {
        return load_font_file(path);
    }

    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|path| path.exists())
        .find_map(|path| load_font_file(&path).ok())
        .ok_or_else(|| {
            anyhow!(
                "No usable TrueType font found. Set `font_path` in the video config to a .ttf file."
            )
        })
}

fn load_font_file(path: &Path) -> Result<FontArc> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read font file {}", path.display()))?;
    FontArc::try_from_vec(bytes)
        .map_err(|err| anyhow!("Failed to parse font {}: {err}", path.display()))
}

pub fn save_slide(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("Failed to write slide image {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(width: u32, height: u32) -> SlideStyle {
        SlideStyle {
            width,
            height,
            background: Rgb([0, 0, 128]),
            text_color: Rgb([255, 255, 255]),
            font_size: 48,
            margin: 60,
            line_spacing: 1.5,
        }
    }

    fn system_font() -> Option<FontArc> {
        load_font(None).ok()
    }

    #[test]
    fn wraps_greedily_at_estimated_width() {
        // 24px per char at size 48; 240px fits 10 chars
        let lines = wrap_lines("one two three four", 240, 48);
        assert_eq!(lines, vec!["one two", "three four"]);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        let lines = wrap_lines("a supercalifragilisticexpialidocious b", 240, 48);
        assert_eq!(lines, vec!["a", "supercalifragilisticexpialidocious", "b"]);
    }

    #[test]
    fn long_first_word_does_not_produce_empty_line() {
        let lines = wrap_lines("Pneumonoultramicroscopicsilicovolcanoconiosis is long", 240, 48);
        assert_eq!(lines[0], "Pneumonoultramicroscopicsilicovolcanoconiosis");
        assert!(lines.iter().all(|line| !line.is_empty()));
    }

    #[test]
    fn words_are_never_split() {
        let text = "Which planet in our solar system has the most confirmed moons orbiting it today";
        let lines = wrap_lines(text, 300, 48);
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split(' ')).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
        for line in &lines {
            if line.contains(' ') {
                assert!(estimated_width(line, 48) <= 300.0, "line too wide: {line}");
            }
        }
    }

    #[test]
    fn zero_width_puts_every_word_alone() {
        let lines = wrap_lines("a b c", 0, 48);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap_lines("", 1160, 48).is_empty());
        assert!(wrap_lines("   \n\t", 1160, 48).is_empty());
    }

    #[test]
    fn canvas_size_is_independent_of_text() {
        let style = style(1280, 720);
        let huge = "word ".repeat(2000);
        for text in ["", "Q: What is 2+2?", huge.as_str()] {
            let image = render_text_slide(text, &style, None);
            assert_eq!(image.dimensions(), (1280, 720));
        }
    }

    #[test]
    fn empty_text_is_blank_background() {
        let style = style(64, 36);
        let font = system_font();
        let image = render_text_slide("", &style, font.as_ref());
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 128])));
    }

    #[test]
    fn drawn_text_keeps_dimensions_and_marks_pixels() {
        let Some(font) = system_font() else {
            eprintln!("No system font found, skipping glyph drawing check");
            return;
        };
        let full = style(1280, 720);
        let image = render_text_slide("Q: What is 2+2?", &full, Some(&font));
        assert_eq!(image.dimensions(), (1280, 720));
        assert!(image.pixels().any(|p| *p != Rgb([0, 0, 128])));

        let overflow = "overflowing ".repeat(500);
        let clipped = render_text_slide(&overflow, &style(200, 100), Some(&font));
        assert_eq!(clipped.dimensions(), (200, 100));
    }

    #[test]
    fn rendering_is_deterministic() {
        let font = system_font();
        let style = style(320, 180);
        let first = render_text_slide("A: Paris", &style, font.as_ref());
        let second = render_text_slide("A: Paris", &style, font.as_ref());
        assert_eq!(first, second);
    }

    #[test]
    fn missing_configured_font_is_an_error() {
        let err = load_font(Some(Path::new("/no/such/font.ttf"))).err().unwrap();
        assert!(err.to_string().contains("/no/such/font.ttf"));
    }
}
