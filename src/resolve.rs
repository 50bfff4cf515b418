//! Turning one request fragment into stills.

use crate::catalog::{Catalog, MediaRecord};
use crate::error::*;
use crate::frames::{self, ResolvedMatch};
use crate::overlay::Captioner;
use crate::request::{Fragment, Request, RequestKind};
use crate::subtitles::QuoteMatcher;
use crate::video::VideoBackend;
use image::RgbImage;
use slog::Logger;

/// The external collaborators a request is resolved against.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub catalog: &'a dyn Catalog,
    pub matcher: &'a dyn QuoteMatcher,
    pub backend: &'a dyn VideoBackend,
    pub captioner: &'a dyn Captioner,
}

#[derive(Debug, Clone)]
pub struct ResolvedFrames {
    pub images: Vec<RgbImage>,
    pub record: MediaRecord,
    /// Matched dialogue. Parallel sub-requests come back uncaptioned and
    /// leave drawing it to the caller.
    pub quote: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Frames(ResolvedFrames),
    /// The fragment alone is not enough; the whole request should be
    /// resolved as one contiguous run of subtitles.
    NeedsChain,
}

pub trait FrameResolver {
    fn resolve(
        &self,
        log: &Logger,
        request: &Request,
        fragment: &Fragment,
        multiple: bool,
    ) -> Result<Resolution>;

    fn resolve_chain(&self, log: &Logger, request: &Request) -> Result<ResolvedFrames>;
}

/// Resolves fragments against the catalog's subtitles and decodes one still
/// per match.
pub struct SubtitleFrameResolver<'a> {
    services: Services<'a>,
}

impl<'a> SubtitleFrameResolver<'a> {
    pub fn new(services: Services<'a>) -> Self {
        SubtitleFrameResolver { services }
    }

    fn caption_for(&self, request: &Request) -> Option<&'a dyn Captioner> {
        match request.kind {
            RequestKind::Parallel => None,
            _ => Some(self.services.captioner),
        }
    }

    fn stills_for_subtitles(
        &self,
        log: &Logger,
        request: &Request,
        record: &MediaRecord,
        matches: &[ResolvedMatch],
    ) -> Result<Vec<RgbImage>> {
        let mut video = self.services.backend.open(log, &record.path)?;
        let captioner = self.caption_for(request);

        matches
            .iter()
            .map(|matched| {
                frames::still_for_subtitle(&mut video.source, matched, video.dar, captioner)
            })
            .collect()
    }
}

impl<'a> FrameResolver for SubtitleFrameResolver<'a> {
    fn resolve(
        &self,
        log: &Logger,
        request: &Request,
        fragment: &Fragment,
        multiple: bool,
    ) -> Result<Resolution> {
        let record = self.services.catalog.search(log, &request.movie, true)?;

        match fragment {
            Fragment::Minute(seconds) => {
                slog::info!(log, "Minute request"; "seconds" => *seconds, "title" => &record.title);
                let image = {
                    let mut video = self.services.backend.open(log, &record.path)?;
                    frames::still_at(&mut video.source, *seconds, video.dar)?
                };
                Ok(Resolution::Frames(ResolvedFrames {
                    images: vec![image],
                    record,
                    quote: None,
                }))
            }
            Fragment::Range(..) => Err(Error::invalid_request(
                "second ranges are only supported in GIF requests",
            )),
            Fragment::Quote(quote) => {
                let subtitles = self.services.catalog.subtitles(&record)?;
                let entry = match self.services.matcher.find_quote(&subtitles, quote) {
                    Ok(entry) => entry,
                    Err(ref e) if e.kind() == ErrorKind::NotFound && multiple => {
                        slog::info!(log, "Quote not found, trying a chain"; "quote" => quote);
                        return Ok(Resolution::NeedsChain);
                    }
                    Err(e) => return Err(e),
                };

                slog::info!(
                    log, "Quote request";
                    "quote" => quote, "matched" => &entry.message, "title" => &record.title
                );
                let message = entry.message.clone();
                let images =
                    self.stills_for_subtitles(log, request, &record, &[ResolvedMatch::Subtitle(entry)])?;

                Ok(Resolution::Frames(ResolvedFrames {
                    images,
                    record,
                    quote: Some(message),
                }))
            }
        }
    }

    fn resolve_chain(&self, log: &Logger, request: &Request) -> Result<ResolvedFrames> {
        let record = self.services.catalog.search(log, &request.movie, true)?;
        let subtitles = self.services.catalog.subtitles(&record)?;

        let chain = self.services.matcher.guess_subtitle_chain(&subtitles, request);
        if chain.is_empty() {
            return Err(Error::not_found(format!(
                "no subtitle chain for `{}`",
                request.comment
            )));
        }

        slog::info!(log, "Chain request"; "entries" => chain.len(), "title" => &record.title);
        let matches = chain
            .into_iter()
            .map(ResolvedMatch::Subtitle)
            .collect::<Vec<_>>();
        let images = self.stills_for_subtitles(log, request, &record, &matches)?;

        Ok(ResolvedFrames {
            images,
            record,
            quote: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::dissect_comment;
    use crate::subtitles::SubtitleMatcher;
    use crate::testing::{self, FakeBackend, MarkCaptioner};

    fn frames(resolution: Resolution) -> ResolvedFrames {
        match resolution {
            Resolution::Frames(frames) => frames,
            Resolution::NeedsChain => panic!("unexpected chain"),
        }
    }

    #[test]
    fn minute_and_quote_fragments() {
        let catalog = testing::catalog();
        let backend = FakeBackend::new(64, 36);
        let resolver = SubtitleFrameResolver::new(Services {
            catalog: &catalog,
            matcher: &SubtitleMatcher,
            backend: &backend,
            captioner: &MarkCaptioner,
        });
        let log = testing::log();
        let request = dissect_comment("!req Stalker [1:00] [general kenobi]").unwrap();
        let fragments = request.fragments();

        let minute = frames(resolver.resolve(&log, &request, &fragments[0], true).unwrap());
        assert_eq!(minute.images.len(), 1);
        assert_eq!(minute.record.title, "Stalker");
        assert_eq!(minute.quote, None);

        let quote = frames(resolver.resolve(&log, &request, &fragments[1], true).unwrap());
        assert_eq!(quote.images.len(), 1);
        assert_eq!(quote.quote.as_deref(), Some("General Kenobi!"));
        // Captioned by the default resolver
        assert_eq!(quote.images[0].get_pixel(0, 0)[1], 255);
    }

    #[test]
    fn unknown_quote_asks_for_a_chain_only_when_multiple() {
        let catalog = testing::catalog();
        let backend = FakeBackend::new(64, 36);
        let resolver = SubtitleFrameResolver::new(Services {
            catalog: &catalog,
            matcher: &SubtitleMatcher,
            backend: &backend,
            captioner: &MarkCaptioner,
        });
        let log = testing::log();
        let request = dissect_comment("!req Stalker [zzz] [yyy]").unwrap();
        let fragment = Fragment::Quote("zzz".into());

        match resolver.resolve(&log, &request, &fragment, true).unwrap() {
            Resolution::NeedsChain => {}
            Resolution::Frames(_) => panic!("expected a chain"),
        }

        let err = resolver.resolve(&log, &request, &fragment, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn chain_yields_one_still_per_entry() {
        let catalog = testing::catalog();
        let backend = FakeBackend::new(64, 36);
        let resolver = SubtitleFrameResolver::new(Services {
            catalog: &catalog,
            matcher: &SubtitleMatcher,
            backend: &backend,
            captioner: &MarkCaptioner,
        });
        let request = dissect_comment("!req Stalker [kill him] [back away] [jedi slime]").unwrap();

        let chain = resolver.resolve_chain(&testing::log(), &request).unwrap();
        assert_eq!(chain.images.len(), 3);
        assert_eq!(backend.opened.borrow().len(), 1);
    }

    #[test]
    fn parallel_and_regular_quotes_pick_the_same_frame() {
        let catalog = testing::catalog();
        let backend = FakeBackend::new(64, 36);
        let resolver = SubtitleFrameResolver::new(Services {
            catalog: &catalog,
            matcher: &SubtitleMatcher,
            backend: &backend,
            captioner: &MarkCaptioner,
        });
        let log = testing::log();

        let regular = dissect_comment("!req Stalker [bold one]").unwrap();
        let fragments = regular.fragments();
        let regular = frames(resolver.resolve(&log, &regular, &fragments[0], false).unwrap());

        let parent = dissect_comment("!parallel Stalker [bold one] | Solaris [1:00]").unwrap();
        let child = parent.parallel_child("Stalker [bold one]").unwrap();
        let fragments = child.fragments();
        let parallel = frames(resolver.resolve(&log, &child, &fragments[0], true).unwrap());

        // 66.1s..68.9s at 24fps is frames 1586..1653, middle 1619
        assert_eq!(regular.images[0].get_pixel(5, 5)[0], (1619 % 256) as u8);
        assert_eq!(parallel.images[0].get_pixel(5, 5)[0], (1619 % 256) as u8);
        // Only the regular still is captioned here
        assert_eq!(regular.images[0].get_pixel(0, 0)[1], 255);
        assert_eq!(parallel.images[0].get_pixel(0, 0)[1], 0);
        assert_eq!(parallel.quote.as_deref(), Some("You are a bold one."));
    }

    #[test]
    fn ranges_and_unknown_titles_are_rejected() {
        let catalog = testing::catalog();
        let backend = FakeBackend::new(64, 36);
        let resolver = SubtitleFrameResolver::new(Services {
            catalog: &catalog,
            matcher: &SubtitleMatcher,
            backend: &backend,
            captioner: &MarkCaptioner,
        });
        let log = testing::log();

        let request = dissect_comment("!req Stalker [1:00-1:05]").unwrap();
        let err = resolver
            .resolve(&log, &request, &request.fragments()[0], false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let request = dissect_comment("!req Stalker Director's Cut Remastered [1:00]").unwrap();
        let err = resolver
            .resolve(&log, &request, &request.fragments()[0], false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
