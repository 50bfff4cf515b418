//! In-memory stand-ins for the decoder, the font renderer and the catalog.

use crate::catalog::{search_records, Catalog, MediaRecord};
use crate::error::*;
use crate::overlay::Captioner;
use crate::subtitles::SubtitleEntry;
use crate::video::{FrameSource, OpenedVideo, VideoBackend};
use image::{Rgb, RgbImage};
use slog::Logger;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

pub fn log() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

/// Frames whose red channel encodes the index they were read at.
pub struct FakeSource {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    pub reads: Vec<u64>,
}

impl FakeSource {
    pub fn new(fps: f64, width: u32, height: u32, frames: u64) -> Self {
        FakeSource {
            fps,
            width,
            height,
            frames,
            reads: Vec::new(),
        }
    }
}

impl FrameSource for FakeSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn read_frame(&mut self, index: u64) -> Result<RgbImage> {
        if index >= self.frames {
            return Err(Error::decode(format!("frame {} is past the end", index)));
        }
        self.reads.push(index);
        Ok(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([(index % 256) as u8, 0, 0]),
        ))
    }
}

/// Marks the top-left pixel with the caption length instead of drawing text.
pub struct MarkCaptioner;

impl Captioner for MarkCaptioner {
    fn draw_quote(&self, mut image: RgbImage, text: &str) -> Result<RgbImage> {
        image.put_pixel(0, 0, Rgb([0, 255, text.len() as u8]));
        Ok(image)
    }
}

/// Hands out [`FakeSource`]s and remembers which paths were opened.
pub struct FakeBackend {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    pub opened: RefCell<Vec<PathBuf>>,
}

impl FakeBackend {
    pub fn new(width: u32, height: u32) -> Self {
        FakeBackend {
            fps: 24.0,
            width,
            height,
            frames: 24 * 60 * 60,
            opened: RefCell::new(Vec::new()),
        }
    }
}

impl VideoBackend for FakeBackend {
    fn open(&self, _log: &Logger, path: &Path) -> Result<OpenedVideo> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(OpenedVideo {
            source: Box::new(FakeSource::new(
                self.fps,
                self.width,
                self.height,
                self.frames,
            )),
            dar: f64::from(self.width) / f64::from(self.height),
        })
    }
}

pub struct MemoryCatalog {
    pub records: Vec<MediaRecord>,
    pub subtitles: Vec<SubtitleEntry>,
}

impl Catalog for MemoryCatalog {
    fn search(&self, log: &Logger, identifier: &str, strict: bool) -> Result<MediaRecord> {
        search_records(log, &self.records, identifier, strict).map(Clone::clone)
    }

    fn subtitles(&self, _record: &MediaRecord) -> Result<Vec<SubtitleEntry>> {
        Ok(self.subtitles.clone())
    }
}

pub fn movie(title: &str, year: u32) -> MediaRecord {
    MediaRecord {
        title: title.to_owned(),
        original_title: Some(title.to_owned()),
        year: Some(year),
        director: Some("Some Director".to_owned()),
        category: Some("Certified Kino".to_owned()),
        path: PathBuf::from(format!("/movies/{}.mkv", title)),
        ..MediaRecord::default()
    }
}

pub fn subtitle(index: usize, start_ms: i64, end_ms: i64, message: &str) -> SubtitleEntry {
    SubtitleEntry::from_millis(index, start_ms, end_ms, message.to_owned())
}

pub fn catalog() -> MemoryCatalog {
    MemoryCatalog {
        records: vec![movie("Stalker", 1979), movie("Solaris", 1972)],
        subtitles: vec![
            subtitle(0, 61_500, 63_000, "Hello there."),
            subtitle(1, 64_000, 66_000, "General Kenobi!"),
            subtitle(2, 66_100, 68_900, "You are a bold one."),
            subtitle(3, 70_000, 71_000, "Kill him."),
            subtitle(4, 72_000, 73_000, "Back away."),
            subtitle(5, 74_000, 75_000, "I will deal with this Jedi slime myself."),
        ],
    }
}
