use clap::{Args, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum VideoCommands {
    /// Render a narrated Q&A video from a CSV file
    Render(RenderArgs),
    /// Validate a Q&A CSV file without rendering anything
    Check(CheckArgs),
    /// Render a single text slide to a PNG file
    Slide(SlideArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Path to the Q&A CSV file (header row, then question,answer rows)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub csv: PathBuf,

    /// Directory the video is written to
    #[arg(long = "out-dir", default_value = "output", value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// File name of the video inside the output directory
    #[arg(short = 'o', long = "out-file", default_value = "qa_video.mp4")]
    pub out_file: PathBuf,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Alternate video config file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Stream ffmpeg output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Path to the Q&A CSV file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub csv: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Question,
    Answer,
}

#[derive(Args, Debug, Clone)]
pub struct SlideArgs {
    /// Text to place on the slide
    pub text: String,

    /// Which slide style to use
    #[arg(long, value_enum, default_value = "question")]
    pub kind: SlideKind,

    /// Output PNG path
    #[arg(short = 'o', long = "out-file", default_value = "slide.png", value_hint = ValueHint::FilePath)]
    pub out_file: PathBuf,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Alternate video config file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}
