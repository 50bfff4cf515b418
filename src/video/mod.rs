//! Video descriptors and decoding through ffmpeg/ffprobe child processes.

mod ffmpeg;

pub use self::ffmpeg::{DecoderSession, Tools};

use crate::error::*;
use image::RgbImage;
use serde_derive::Serialize;
use slog::Logger;
use std::path::{Path, PathBuf};

/// Anything that can hand out decoded frames by index.
pub trait FrameSource {
    fn fps(&self) -> f64;

    fn read_frame(&mut self, index: u64) -> Result<RgbImage>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn read_frame(&mut self, index: u64) -> Result<RgbImage> {
        (**self).read_frame(index)
    }
}

/// A decoder session together with the display aspect ratio its frames
/// must be corrected to.
pub struct OpenedVideo {
    pub source: Box<dyn FrameSource>,
    pub dar: f64,
}

/// Opens videos for extraction. Every call hands out a fresh session owned
/// by the caller; sessions are never shared.
pub trait VideoBackend {
    fn open(&self, log: &Logger, path: &Path) -> Result<OpenedVideo>;
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    pub tools: Tools,
}

impl FfmpegBackend {
    pub fn new(tools: Tools) -> Self {
        FfmpegBackend { tools }
    }
}

impl VideoBackend for FfmpegBackend {
    fn open(&self, log: &Logger, path: &Path) -> Result<OpenedVideo> {
        let info = VideoInfo::read(log, &self.tools, path)?;
        let dar = info.dar;
        let session = DecoderSession::open(log, &self.tools, info)?;

        Ok(OpenedVideo {
            source: Box::new(session),
            dar,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Display aspect ratio (width / height as played back).
    pub dar: f64,
}

impl VideoInfo {
    pub fn read(log: &Logger, tools: &Tools, path: &Path) -> Result<Self> {
        ffmpeg::read_info(log, tools, path)
    }
}

/// Parse `30000/1001`, `16:9` or a plain number.
pub fn parse_ratio(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw.find(|c| c == '/' || c == ':');

    let value = match split {
        Some(position) => {
            let numerator = raw[..position].parse::<f64>().ok()?;
            let denominator = raw[position + 1..].parse::<f64>().ok()?;
            if denominator == 0.0 {
                return None;
            }
            numerator / denominator
        }
        None => raw.parse::<f64>().ok()?,
    };

    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}
