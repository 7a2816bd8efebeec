use anyhow::Result;

use crate::ui::prelude::{Level, emit};

use super::check::handle_check;
use super::cli::{RenderArgs, VideoCommands};
use super::error::QaVideoError;
use super::pipeline::CancelFlag;
use super::render::handle_render;
use super::slide::handle_slide;

pub async fn handle_video_command(command: VideoCommands) -> Result<()> {
    match command {
        VideoCommands::Render(args) => render_until_interrupted(args).await,
        VideoCommands::Check(args) => handle_check(args),
        VideoCommands::Slide(args) => handle_slide(args),
    }
}

/// Run the blocking render on a worker thread and turn Ctrl-C into a
/// cancellation that the pipeline observes between rows.
async fn render_until_interrupted(args: RenderArgs) -> Result<()> {
    let cancel = CancelFlag::default();
    let task_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || handle_render(args, task_cancel));

    let result = tokio::select! {
        joined = &mut task => joined?,
        Ok(()) = tokio::signal::ctrl_c() => {
            emit(
                Level::Warn,
                "video.render.cancelling",
                "Interrupt received, stopping the run...",
                None,
            );
            cancel.cancel();
            task.await?
        }
    };

    // Child processes see the same SIGINT, so whatever failed after the
    // interrupt is reported as a cancellation
    match result {
        Err(_) if cancel.is_cancelled() => Err(QaVideoError::Cancelled.into()),
        other => other,
    }
}
