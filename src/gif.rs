//! Animated requests: validation, extraction and GIF encoding.

use crate::catalog::MediaRecord;
use crate::error::*;
use crate::frames::{frame_window, FrameSequence, ResolvedMatch, SUBTITLE_PADDING};
use crate::request::{parse_timestamp, Request};
use crate::resolve::Services;
use crate::subtitles::{QuoteMatcher, SubtitleEntry};
use crate::video::FrameSource;
use image::codecs::gif::GifEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Frame, RgbImage};
use slog::Logger;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Most subtitle entries a single animation may span.
pub const MAX_SUBTITLES: usize = 4;

/// Longest explicit range, in seconds.
pub const MAX_RANGE_SECONDS: f64 = 7.0;

/// Every animated frame ends up narrower than this.
pub const MAX_WIDTH: u32 = 550;

/// What the first fragment of a GIF request asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum GifContent {
    Range(f64, f64),
    Quotes,
}

/// Read `a-b` as a second range. A side that is not a timestamp makes the
/// fragment a quote; anything other than exactly two numeric sides is
/// malformed.
pub fn get_range(content: &str) -> Result<GifContent> {
    let seconds = content
        .split('-')
        .map(|side| parse_timestamp(side))
        .collect::<Option<Vec<_>>>();

    match seconds.as_deref() {
        None => Ok(GifContent::Quotes),
        Some([start, end]) => Ok(GifContent::Range(*start, *end)),
        Some(_) => Err(Error::invalid_request(format!(
            "malformed range `{}`",
            content
        ))),
    }
}

pub fn sanity_checks(subtitles: &[SubtitleEntry], range: Option<(f64, f64)>) -> Result<()> {
    if subtitles.len() > MAX_SUBTITLES {
        return Err(Error::invalid_request(format!(
            "{} subtitles requested, at most {} allowed",
            subtitles.len(),
            MAX_SUBTITLES
        )));
    }

    if let Some((start, end)) = range {
        if (start - end).abs() > MAX_RANGE_SECONDS {
            return Err(Error::invalid_request(format!(
                "range {}-{} is longer than {} seconds",
                start, end, MAX_RANGE_SECONDS
            )));
        }
    }

    Ok(())
}

/// Start at half size and step down by a tenth until the width fits.
pub fn scale_factor(width: u32) -> f64 {
    let mut factor = 0.5;
    while f64::from(width) * factor >= f64::from(MAX_WIDTH) {
        factor -= 0.1;
    }
    factor
}

/// Below this the stepped search has run out of useful factors.
const MIN_SCALE_FACTOR: f64 = 0.05;

pub fn scale_to_gif(image: &RgbImage) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let factor = scale_factor(width);
    if factor <= MIN_SCALE_FACTOR {
        return Err(Error::invalid_request(format!(
            "frames {} pixels wide are too large for an animation",
            width
        )));
    }

    let new_width = ((f64::from(width) * factor) as u32).max(1);
    let new_height = ((f64::from(height) * factor) as u32).max(1);

    Ok(imageops::resize(image, new_width, new_height, FilterType::CatmullRom))
}

/// Chain-match the whole request first; fall back to matching each fragment
/// on its own.
pub fn get_quote_list(
    matcher: &dyn QuoteMatcher,
    subtitles: &[SubtitleEntry],
    request: &Request,
) -> Result<Vec<SubtitleEntry>> {
    let chain = matcher.guess_subtitle_chain(subtitles, request);
    if !chain.is_empty() {
        return Ok(chain);
    }

    request
        .content
        .iter()
        .map(|quote| matcher.find_quote(subtitles, quote))
        .collect()
}

/// A validated animation, ready to be decoded.
#[derive(Debug, Clone)]
pub struct AnimationPlan {
    pub record: MediaRecord,
    pub matches: Vec<ResolvedMatch>,
}

/// Validate the request and resolve what to extract, without decoding
/// anything.
pub fn plan_animation(log: &Logger, request: &Request, services: &Services) -> Result<AnimationPlan> {
    let first = request
        .content
        .first()
        .ok_or_else(|| Error::invalid_request("empty request"))?;

    let content = get_range(first)?;
    if let GifContent::Range(start, end) = content {
        sanity_checks(&[], Some((start, end)))?;
    }

    // Non-strict: the closest title wins, an empty catalog is still NotFound
    let record = services.catalog.search(log, &request.movie, false)?;

    let matches = match content {
        GifContent::Range(start, end) => {
            slog::info!(log, "Good GIF timestamp request"; "start" => start, "end" => end);
            vec![ResolvedMatch::Range(start, end)]
        }
        GifContent::Quotes => {
            let subtitles = services.catalog.subtitles(&record)?;
            let quotes = get_quote_list(services.matcher, &subtitles, request)?;
            sanity_checks(&quotes, None)?;
            slog::info!(log, "Subtitles found"; "count" => quotes.len());
            quotes.into_iter().map(ResolvedMatch::Subtitle).collect()
        }
    };

    Ok(AnimationPlan { record, matches })
}

/// Extract and downscale every frame of the plan, in request order.
pub fn render_frames<S: FrameSource>(
    log: &Logger,
    plan: &AnimationPlan,
    source: &mut S,
    dar: f64,
    services: &Services,
) -> Result<Vec<RgbImage>> {
    let fps = source.fps();
    let mut images = Vec::new();

    for matched in &plan.matches {
        let window = frame_window(fps, matched);
        let sequence = match matched {
            ResolvedMatch::Subtitle(entry) => {
                let window = window.padded(SUBTITLE_PADDING);
                slog::info!(
                    log, "Extracting subtitle window";
                    "start" => window.start, "end" => window.end, "diff" => window.len()
                );
                FrameSequence::new(&mut *source, window, dar)
                    .with_caption(services.captioner, &entry.message)
            }
            ResolvedMatch::Range(..) => {
                slog::info!(
                    log, "Extracting range window";
                    "start" => window.start, "end" => window.end, "diff" => window.len()
                );
                FrameSequence::new(&mut *source, window, dar)
            }
        };

        for frame in sequence {
            images.push(scale_to_gif(&frame?)?);
        }
    }

    Ok(images)
}

/// Encode `images` as one animation at `path`. The file only appears once
/// encoding has finished.
pub fn image_list_to_gif(log: &Logger, images: Vec<RgbImage>, path: &Path) -> Result<()> {
    if images.is_empty() {
        return Err(Error::invalid_request("no frames to encode"));
    }

    slog::info!(log, "Saving GIF"; "images" => images.len());

    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = tempfile::NamedTempFile::new_in(directory)
        .context_kind(ErrorKind::Io, "failed to create temporary file")?;

    {
        let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file.as_file()), 10);
        let frames = images
            .into_iter()
            .map(|image| Frame::new(DynamicImage::ImageRgb8(image).into_rgba8()));
        encoder
            .encode_frames(frames)
            .context_kind(ErrorKind::Io, "failed to encode GIF")?;
    }

    file.persist(path)
        .map_err(|e| e.error)
        .context_kind(ErrorKind::Io, format!("failed to save `{}`", path.display()))?;

    slog::info!(log, "Saved"; "path" => %path.display());

    Ok(())
}

/// Build the animation for `request` and return the matched record with the
/// path of the single GIF file.
pub fn handle_gif_request(
    log: &Logger,
    request: &Request,
    services: &Services,
    frames_dir: &Path,
) -> Result<(MediaRecord, Vec<PathBuf>)> {
    let plan = plan_animation(log, request, services)?;

    let images = {
        let mut video = services.backend.open(log, &plan.record.path)?;
        render_frames(log, &plan, &mut video.source, video.dar, services)?
    };

    std::fs::create_dir_all(frames_dir).context_kind(
        ErrorKind::Io,
        format!("failed to create `{}`", frames_dir.display()),
    )?;
    let filename = frames_dir.join(format!("{}.gif", request.id));
    image_list_to_gif(log, images, &filename)?;

    Ok((plan.record, vec![filename]))
}
