mod common;
mod ui;
mod video;

use clap::Parser;

use crate::ui::prelude::{Level, OutputFormat, emit};
use crate::video::{QaVideoError, VideoCommands};

/// Turn a CSV of questions and answers into a narrated slideshow video
#[derive(Parser, Debug)]
#[command(name = "qavid", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for messages
    #[arg(long = "output", value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: VideoCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = video::handle_video_command(cli.command).await {
        emit(Level::Error, "error", &format!("{err:#}"), None);
        let cancelled = matches!(
            err.downcast_ref::<QaVideoError>(),
            Some(QaVideoError::Cancelled)
        );
        std::process::exit(if cancelled { 130 } else { 1 });
    }
}
