//! Drives one request from dissected comment to saved artifacts.

use crate::catalog::MediaRecord;
use crate::compose;
use crate::config::Settings;
use crate::describe;
use crate::error::*;
use crate::gif;
use crate::output;
use crate::request::{Request, RequestFlags, RequestKind, MAX_FRAGMENTS};
use crate::resolve::{FrameResolver, Resolution, ResolvedFrames, Services};
use image::RgbImage;
use serde_derive::Serialize;
use slog::Logger;
use std::path::PathBuf;

/// Everything produced by a finished request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub description: String,
    pub images: Vec<PathBuf>,
    pub request: Request,
    pub flags: RequestFlags,
    pub record: MediaRecord,
}

/// Resolve every fragment of `request` in order. A fragment asking for a
/// chain replaces the rest of the request with one chained resolution.
pub fn generate_frames(
    log: &Logger,
    request: &Request,
    resolver: &dyn FrameResolver,
    multiple: bool,
) -> Result<Vec<ResolvedFrames>> {
    let mut resolved = Vec::new();

    for fragment in request.fragments() {
        match resolver.resolve(log, request, &fragment, multiple)? {
            Resolution::Frames(frames) => resolved.push(frames),
            Resolution::NeedsChain => {
                resolved.push(resolver.resolve_chain(log, request)?);
                break;
            }
        }
    }

    if resolved.is_empty() {
        return Err(Error::invalid_request("request has no content"));
    }

    Ok(resolved)
}

/// Composed images plus the record they are credited to.
struct Composition {
    images: Vec<RgbImage>,
    record: MediaRecord,
    alt_title: Option<String>,
}

fn first_image(frames: &ResolvedFrames) -> Result<&RgbImage> {
    frames.images.first().ok_or_else(|| {
        Error::invalid_request(format!("no frames resolved from `{}`", frames.record.title))
    })
}

fn compose_parallel(
    log: &Logger,
    request: &Request,
    parts: &[String],
    is_episode: bool,
    resolver: &dyn FrameResolver,
    services: &Services,
) -> Result<Composition> {
    let mut firsts = Vec::with_capacity(parts.len());
    for part in parts {
        let child = request.parallel_child(part)?;
        slog::info!(log, "Parallel sub-request"; "movie" => &child.movie);

        let resolved = generate_frames(log, &child, resolver, true)?;
        firsts.extend(resolved.into_iter().next());
    }

    let images = firsts
        .iter()
        .map(|frames| first_image(frames).map(Clone::clone))
        .collect::<Result<Vec<_>>>()?;
    let homogenized = compose::homogenize(images);

    let mut captioned = Vec::with_capacity(homogenized.len());
    for (image, frames) in homogenized.into_iter().zip(&firsts) {
        match &frames.quote {
            Some(quote) => captioned.push(services.captioner.draw_quote(image, quote)?),
            None => captioned.push(image),
        }
    }

    let merged = compose::collage(&captioned)?;
    let records = firsts.iter().map(|frames| &frames.record).collect::<Vec<_>>();
    let alt_title = describe::get_alt_title(&records, is_episode);

    let record = firsts
        .into_iter()
        .next()
        .map(|frames| frames.record)
        .ok_or_else(|| Error::invalid_request("parallel request has no sides"))?;

    Ok(Composition {
        images: vec![merged],
        record,
        alt_title: Some(alt_title),
    })
}

fn compose_sequence(
    log: &Logger,
    request: &Request,
    resolver: &dyn FrameResolver,
) -> Result<Composition> {
    let resolved = generate_frames(log, request, resolver, request.is_multiple())?;

    let mut images = if request.kind == RequestKind::Palette {
        vec![compose::palette(first_image(&resolved[0])?)]
    } else {
        resolved
            .iter()
            .flat_map(|frames| frames.images.iter().cloned())
            .collect::<Vec<_>>()
    };

    compose::check_integrity(&images)?;

    if images.len() > 1 && images.len() < 4 {
        slog::info!(log, "Merging into a collage"; "images" => images.len());
        images = vec![compose::collage(&images)?];
    }

    let record = resolved
        .into_iter()
        .next()
        .map(|frames| frames.record)
        .ok_or_else(|| Error::invalid_request("request has no content"))?;

    Ok(Composition {
        images,
        record,
        alt_title: None,
    })
}

pub fn handle_request(
    log: &Logger,
    request: Request,
    resolver: &dyn FrameResolver,
    services: &Services,
    settings: &Settings,
) -> Result<RequestOutcome> {
    let mut flags = RequestFlags::classify(&request);

    if request.content.len() > MAX_FRAGMENTS {
        return Err(Error::new(
            ErrorKind::TooLongRequest,
            format!(
                "{} fragments requested, at most {} are allowed",
                request.content.len(),
                MAX_FRAGMENTS
            ),
        ));
    }

    let log = log.new(slog::o!("kind" => request.kind.command(), "id" => request.id.clone()));
    slog::info!(log, "Handling request"; "comment" => &request.comment);

    let (record, images) = if request.kind == RequestKind::Gif {
        if settings.extra_info {
            return Err(Error::invalid_request(
                "animations cannot be posted with extra info",
            ));
        }
        gif::handle_gif_request(&log, &request, services, &settings.frames_dir)?
    } else {
        let composition = match &flags.parallel {
            Some(parts) => {
                compose_parallel(&log, &request, parts, flags.is_episode, resolver, services)?
            }
            None => compose_sequence(&log, &request, resolver)?,
        };
        flags.alt_title = composition.alt_title;

        let saved = output::save_images(
            &log,
            &settings.frames_dir,
            &composition.images,
            &composition.record,
            &request,
        )?;
        (composition.record, saved)
    };

    let description = describe::get_description(&record, &request, &flags, settings.extra_info);
    slog::info!(log, "Request finished successfully"; "images" => images.len());

    Ok(RequestOutcome {
        description,
        images,
        request,
        flags,
        record,
    })
}
