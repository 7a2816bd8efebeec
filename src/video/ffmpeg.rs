use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use super::error::QaVideoError;
use super::timeline::Timeline;

/// Output raster and encoding settings for the final video.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
    pub audio_bitrate: String,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24,
            sample_rate: 44_100,
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Builds a single ffmpeg invocation that plays every slide for its segment
/// duration over its audio (or generated silence) and concatenates the lot.
pub struct FfmpegCompiler {
    options: AssemblyOptions,
}

impl FfmpegCompiler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options }
    }

    pub fn compile(&self, timeline: &Timeline, output: &Path) -> Result<Vec<String>, QaVideoError> {
        if timeline.is_empty() {
            return Err(QaVideoError::Assembly(
                "timeline has no segments to assemble".to_string(),
            ));
        }

        let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];
        let mut filters = Vec::with_capacity(timeline.len() * 2 + 1);
        let mut concat_inputs = String::new();
        let mut next_input = 0usize;

        for (idx, segment) in timeline.segments().iter().enumerate() {
            let duration = format_time(segment.duration());

            let video_input = next_input;
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                self.options.fps.to_string(),
                "-t".to_string(),
                duration.clone(),
                "-i".to_string(),
                segment.slide.image_path.to_string_lossy().into_owned(),
            ]);
            next_input += 1;

            let audio_input = next_input;
            match &segment.audio {
                Some(audio) => {
                    args.push("-i".to_string());
                    args.push(audio.path.to_string_lossy().into_owned());
                }
                None => {
                    args.extend([
                        "-f".to_string(),
                        "lavfi".to_string(),
                        "-t".to_string(),
                        duration.clone(),
                        "-i".to_string(),
                        format!(
                            "anullsrc=r={rate}:cl=stereo",
                            rate = self.options.sample_rate
                        ),
                    ]);
                }
            }
            next_input += 1;

            filters.push(format!(
                "[{input}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p,trim=duration={duration},setpts=PTS-STARTPTS[v{idx}]",
                input = video_input,
                w = self.options.width,
                h = self.options.height,
                fps = self.options.fps,
            ));
            filters.push(format!(
                "[{input}:a]aresample={rate},aformat=sample_fmts=fltp:channel_layouts=stereo,apad,atrim=duration={duration},asetpts=PTS-STARTPTS[a{idx}]",
                input = audio_input,
                rate = self.options.sample_rate,
            ));
            concat_inputs.push_str(&format!("[v{idx}][a{idx}]"));
        }

        filters.push(format!(
            "{inputs}concat=n={segments}:v=1:a=1[outv][outa]",
            inputs = concat_inputs,
            segments = timeline.len()
        ));

        args.push("-filter_complex".to_string());
        args.push(filters.join("; "));
        args.extend(
            [
                "-map",
                "[outv]",
                "-map",
                "[outa]",
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-crf",
                "18",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
            ]
            .map(String::from),
        );
        args.push("-b:a".to_string());
        args.push(self.options.audio_bitrate.clone());
        args.push("-ar".to_string());
        args.push(self.options.sample_rate.to_string());
        args.push("-ac".to_string());
        args.push("2".to_string());
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
        args.push("-f".to_string());
        args.push("mp4".to_string());
        args.push(output.to_string_lossy().into_owned());

        Ok(args)
    }
}

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub verbose: bool,
    pub show_progress: bool,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool, show_progress: bool) -> Self {
        Self {
            total_duration,
            verbose,
            show_progress,
        }
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .context("Failed to capture ffmpeg stderr")?;

        let pb = match options.total_duration {
            Some(duration) if options.show_progress => {
                let pb = ProgressBar::new((duration * 1000.0) as u64);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {msg}",
                ) {
                    pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
                }
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                pb.set_message("encoding".to_string());
                Some(pb)
            }
            _ => None,
        };

        let mut last_line = String::new();
        let mut error_lines: Vec<String> = Vec::new();
        let result = read_ffmpeg_stderr(
            stderr,
            options.verbose,
            &pb,
            &mut last_line,
            &mut error_lines,
        );

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        result?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        if !status.success() {
            let error_msg = if !error_lines.is_empty() {
                error_lines.join("\n")
            } else {
                last_line
            };
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                error_msg.trim()
            );
        }

        Ok(())
    }
}

fn read_ffmpeg_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    pb: &Option<ProgressBar>,
    last_line: &mut String,
    error_lines: &mut Vec<String>,
) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated.replace_range(..=pos, "");

            if line.is_empty() {
                continue;
            }

            if verbose {
                eprintln!("{}", line);
            }

            if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
                error_lines.push(line.clone());
            }

            if let Some(pb) = pb {
                if let Some(progress) = parse_ffmpeg_progress(&line) {
                    pb.set_position((progress * 1000.0) as u64);
                    if let Some(speed) = parse_ffmpeg_speed(&line) {
                        pb.set_message(speed);
                    }
                }
            }

            *last_line = line;
        }
    }

    Ok(())
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ').unwrap_or(time_str.len());
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..=speed_end].to_string())
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration: f64 = duration_str
        .trim()
        .parse()
        .context("Failed to parse ffprobe duration as f64")?;

    Ok(duration)
}
