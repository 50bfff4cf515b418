use super::{parse_ratio, FrameSource, VideoInfo};
use crate::error::*;
use image::RgbImage;
use serde_derive::Deserialize;
use slog::Logger;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Names (or paths) of the ffmpeg binaries to run.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            ffmpeg: "ffmpeg".to_owned(),
            ffprobe: "ffprobe".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamList {
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    width: u32,
    height: u32,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_aspect_ratio: Option<String>,
    display_aspect_ratio: Option<String>,
}

pub fn read_info(log: &Logger, tools: &Tools, path: &Path) -> Result<VideoInfo> {
    if !path.is_file() {
        return Err(Error::decode(format!("video not found: `{}`", path.display())));
    }

    let output = Command::new(&tools.ffprobe)
        .args(&[
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate,sample_aspect_ratio,display_aspect_ratio",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context_kind(ErrorKind::Decode, "ffprobe command failed")?;

    if !output.status.success() {
        slog::error!(
            log, "Failed to read video info with ffprobe";
            "path" => %path.display(),
            "stderr" => %String::from_utf8_lossy(&output.stderr)
        );
        return Err(Error::decode("ffprobe command failed"));
    }

    let parsed: StreamList = serde_json::from_slice(&output.stdout)
        .context_kind(ErrorKind::Decode, "failed to parse ffprobe output")?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| Error::decode(format!("no video stream in `{}`", path.display())))?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_ratio)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_ratio))
        .ok_or_else(|| Error::decode("unknown frame rate"))?;

    let dar = display_aspect(
        stream.width,
        stream.height,
        stream.display_aspect_ratio.as_deref(),
        stream.sample_aspect_ratio.as_deref(),
    )
    .ok_or_else(|| Error::decode("video has no usable dimensions"))?;

    let info = VideoInfo {
        path: path.to_path_buf(),
        width: stream.width,
        height: stream.height,
        fps,
        dar,
    };

    slog::debug!(
        log, "Read video info";
        "path" => %path.display(), "fps" => info.fps, "dar" => info.dar,
        "width" => info.width, "height" => info.height
    );

    Ok(info)
}

/// Prefer the container's DAR, then derive it from the SAR, then assume
/// square pixels.
pub(crate) fn display_aspect(
    width: u32,
    height: u32,
    dar: Option<&str>,
    sar: Option<&str>,
) -> Option<f64> {
    if width == 0 || height == 0 {
        return None;
    }
    let storage = f64::from(width) / f64::from(height);

    dar.and_then(parse_ratio)
        .or_else(|| sar.and_then(parse_ratio).map(|sar| sar * storage))
        .or(Some(storage))
}

/// Forward jumps longer than this are served by a fresh seek instead of
/// decoding through the gap.
const SEEK_AHEAD_SECONDS: f64 = 2.0;

/// One ffmpeg process streaming raw RGB frames from a seek position.
///
/// Short forward reads discard the frames in between; reading backwards or
/// far ahead re-spawns the process at the new position. The process is
/// killed on the first read error and when the session is dropped.
pub struct DecoderSession {
    log: Logger,
    tools: Tools,
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    /// Diagnostics written by the running process.
    stderr: Option<File>,
    /// Index of the next frame the pipe will yield.
    position: u64,
}

impl DecoderSession {
    pub fn open(log: &Logger, tools: &Tools, info: VideoInfo) -> Result<Self> {
        if !info.path.is_file() {
            return Err(Error::decode(format!(
                "failed to open video `{}`",
                info.path.display()
            )));
        }

        Ok(DecoderSession {
            log: log.clone(),
            tools: tools.clone(),
            info,
            child: None,
            stdout: None,
            stderr: None,
            position: 0,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_size(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 3
    }

    fn seek_gap(&self) -> u64 {
        (self.info.fps * SEEK_AHEAD_SECONDS).ceil().max(1.0) as u64
    }

    fn needs_seek(&self, index: u64) -> bool {
        self.stdout.is_none() || index < self.position || index - self.position > self.seek_gap()
    }

    fn spawn_at(&mut self, index: u64) -> Result<()> {
        self.close();

        let seconds = index as f64 / self.info.fps;
        slog::debug!(
            self.log, "Spawning decoder";
            "path" => %self.info.path.display(), "frame" => index, "seconds" => seconds
        );

        let stderr = tempfile::tempfile()
            .context_kind(ErrorKind::Io, "failed to create temporary file")?;
        let child_stderr = stderr
            .try_clone()
            .context_kind(ErrorKind::Io, "failed to share temporary file")?;

        let mut child = Command::new(&self.tools.ffmpeg)
            .args(&["-hide_banner", "-loglevel", "error", "-ss"])
            .arg(format!("{:.6}", seconds))
            .arg("-i")
            .arg(&self.info.path)
            .args(&["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(child_stderr))
            .spawn()
            .context_kind(ErrorKind::Decode, "failed to spawn ffmpeg decoder")?;

        self.stdout = child.stdout.take();
        self.stderr = Some(stderr);
        self.child = Some(child);
        self.position = index;

        if self.stdout.is_none() {
            return Err(Error::decode("failed to capture ffmpeg stdout"));
        }

        Ok(())
    }

    /// Whatever the process has written to stderr so far.
    fn diagnostics(&mut self) -> String {
        let mut text = String::new();
        if let Some(file) = self.stderr.as_mut() {
            if file.seek(SeekFrom::Start(0)).is_ok() {
                let _ = file.read_to_string(&mut text);
            }
        }
        text.trim().to_owned()
    }

    fn read_next(&mut self, buffer: &mut [u8]) -> Result<()> {
        let index = self.position;
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| Error::decode("decoder is not running"))?;

        let err = match stdout.read_exact(buffer) {
            Ok(()) => {
                self.position += 1;
                return Ok(());
            }
            Err(e) => e,
        };

        let stderr = self.diagnostics();
        if !stderr.is_empty() {
            slog::error!(
                self.log, "ffmpeg decoder failed";
                "path" => %self.info.path.display(), "frame" => index, "stderr" => %stderr
            );
        }

        let mut message = if err.kind() == std::io::ErrorKind::UnexpectedEof {
            format!(
                "frame {} is past the end of `{}`",
                index,
                self.info.path.display()
            )
        } else {
            "failed to read from ffmpeg".to_owned()
        };
        if let Some(line) = stderr.lines().last() {
            message = format!("{} ({})", message, line);
        }

        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Err(Error::decode(message))
        } else {
            Err(err).context_kind(ErrorKind::Decode, message)
        }
    }

    fn advance_to(&mut self, index: u64, buffer: &mut [u8]) -> Result<()> {
        while self.position < index {
            self.read_next(buffer)?;
        }
        self.read_next(buffer)
    }

    fn close(&mut self) {
        self.stdout = None;
        self.stderr = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for DecoderSession {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn read_frame(&mut self, index: u64) -> Result<RgbImage> {
        if self.needs_seek(index) {
            self.spawn_at(index)?;
        }

        let mut buffer = vec![0u8; self.frame_size()];
        if let Err(err) = self.advance_to(index, &mut buffer) {
            self.close();
            return Err(err);
        }

        RgbImage::from_raw(self.info.width, self.info.height, buffer)
            .ok_or_else(|| Error::decode("decoded frame has an unexpected size"))
    }
}

impl Drop for DecoderSession {
    fn drop(&mut self) {
        self.close();
    }
}
