use anyhow::{Context, Result};
use serde_json::json;

use crate::ui::prelude::{Level, emit};

use super::cli::{SlideArgs, SlideKind};
use super::config::VideoConfig;
use super::layout::{SlideRenderer, load_font, save_slide};

/// Render one slide with the configured style so layouts can be previewed
/// without synthesizing any speech.
pub fn handle_slide(args: SlideArgs) -> Result<()> {
    if args.text.trim().is_empty() {
        anyhow::bail!("Slide text must not be empty");
    }
    if args.out_file.exists() && !args.force {
        anyhow::bail!(
            "Output file {} already exists. Use --force to overwrite.",
            args.out_file.display()
        );
    }

    let config = VideoConfig::load(args.config.as_deref())?;
    let background = match args.kind {
        SlideKind::Question => config.question_background,
        SlideKind::Answer => config.answer_background,
    };
    let style = config.slide_style(background);

    let renderer = SlideRenderer::new(load_font(config.font_path.as_deref())?);
    let image = renderer.render(&args.text, &style);

    if let Some(parent) = args.out_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    save_slide(&image, &args.out_file)?;

    emit(
        Level::Success,
        "video.slide.written",
        &format!("Wrote slide to {}", args.out_file.display()),
        Some(json!({
            "path": args.out_file,
            "width": style.width,
            "height": style.height,
        })),
    );

    Ok(())
}
