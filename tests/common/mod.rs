#![allow(dead_code)]

use image::{Rgb, RgbImage};
use kinoframes::catalog::{JsonCatalog, MediaRecord};
use kinoframes::error::*;
use kinoframes::overlay::Uncaptioned;
use kinoframes::resolve::Services;
use kinoframes::subtitles::SubtitleMatcher;
use kinoframes::video::{FrameSource, OpenedVideo, VideoBackend};
use kinoframes::Settings;
use slog::Logger;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SUBTITLES: &str = "1
00:01:01,500 --> 00:01:03,000
Hello there.

2
00:01:04,000 --> 00:01:06,000
General Kenobi!

3
00:01:06,100 --> 00:01:08,900
You are a bold one.
";

pub fn log() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

/// Solid frames whose color depends on the frame index.
pub struct SolidSource {
    width: u32,
    height: u32,
}

impl FrameSource for SolidSource {
    fn fps(&self) -> f64 {
        24.0
    }

    fn read_frame(&mut self, index: u64) -> Result<RgbImage> {
        let shade = (index % 200) as u8;
        Ok(RgbImage::from_pixel(self.width, self.height, Rgb([shade, shade, 64])))
    }
}

pub struct SolidBackend {
    pub width: u32,
    pub height: u32,
}

impl VideoBackend for SolidBackend {
    fn open(&self, _log: &Logger, _path: &Path) -> Result<OpenedVideo> {
        Ok(OpenedVideo {
            source: Box::new(SolidSource {
                width: self.width,
                height: self.height,
            }),
            dar: f64::from(self.width) / f64::from(self.height),
        })
    }
}

/// A catalog of two movies sharing one subtitle file, plus the directories
/// the test writes to.
pub struct Fixture {
    pub dir: TempDir,
    pub catalog: JsonCatalog,
    pub backend: SolidBackend,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let subtitle = dir.path().join("movie.srt");
        std::fs::write(&subtitle, SUBTITLES).unwrap();

        let movie = |title: &str, original: &str, year: u32| MediaRecord {
            title: title.to_owned(),
            original_title: Some(original.to_owned()),
            year: Some(year),
            director: Some("Andrei Tarkovsky".to_owned()),
            category: Some("Certified Kino".to_owned()),
            path: dir.path().join(format!("{}.mkv", title)),
            subtitle: subtitle.clone(),
            ..MediaRecord::default()
        };

        let catalog = JsonCatalog::new(vec![
            movie("Stalker", "Сталкер", 1979),
            movie("Solaris", "Солярис", 1972),
        ]);

        Fixture {
            dir,
            catalog,
            backend: SolidBackend {
                width: 64,
                height: 36,
            },
        }
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            catalog: &self.catalog,
            matcher: &SubtitleMatcher,
            backend: &self.backend,
            captioner: &Uncaptioned,
        }
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.dir.path().join("frames")
    }

    pub fn settings(&self) -> Settings {
        Settings {
            frames_dir: self.frames_dir(),
            ..Settings::default()
        }
    }
}
