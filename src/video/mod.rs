mod check;
pub mod cli;
pub mod commands;
mod config;
pub mod error;
mod ffmpeg;
mod input;
mod layout;
mod pipeline;
mod render;
mod segment;
mod slide;
mod speech;
mod timeline;
mod utils;

pub use cli::VideoCommands;
pub use commands::handle_video_command;
pub use error::QaVideoError;
