use super::geometry;
use super::timing::FrameWindow;
use crate::error::*;
use crate::overlay::Captioner;
use crate::video::FrameSource;
use image::RgbImage;
use std::ops::Range;

/// Sampling stride for animated output.
pub const STRIDE: usize = 3;

/// Frames appended to subtitle windows so captions are not cut off abruptly.
pub const SUBTITLE_PADDING: u64 = 10;

/// Single-pass iterator of corrected (and optionally captioned) frames.
///
/// The sequence borrows its frame source for its whole life, so one decoder
/// is never shared between two extractions. After the last frame, or after
/// the first error, the sequence is exhausted and keeps returning `None`.
pub struct FrameSequence<'a, S: FrameSource> {
    source: &'a mut S,
    dar: f64,
    caption: Option<(&'a dyn Captioner, &'a str)>,
    indices: std::iter::StepBy<Range<u64>>,
    exhausted: bool,
}

impl<'a, S: FrameSource> FrameSequence<'a, S> {
    pub fn new(source: &'a mut S, window: FrameWindow, dar: f64) -> Self {
        FrameSequence {
            source,
            dar,
            caption: None,
            indices: (window.start..window.end).step_by(STRIDE),
            exhausted: false,
        }
    }

    /// Burn `text` onto every yielded frame.
    pub fn with_caption(mut self, captioner: &'a dyn Captioner, text: &'a str) -> Self {
        self.caption = Some((captioner, text));
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn produce(&mut self, index: u64) -> Result<RgbImage> {
        let frame = self.source.read_frame(index)?;
        let frame = geometry::correct(frame, self.dar);

        match self.caption {
            Some((captioner, text)) => captioner.draw_quote(frame, text),
            None => Ok(frame),
        }
    }
}

impl<'a, S: FrameSource> Iterator for FrameSequence<'a, S> {
    type Item = Result<RgbImage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let index = match self.indices.next() {
            Some(index) => index,
            None => {
                self.exhausted = true;
                return None;
            }
        };

        let produced = self.produce(index);
        if produced.is_err() {
            self.exhausted = true;
        }
        Some(produced)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            (0, Some(0))
        } else {
            self.indices.size_hint()
        }
    }
}

impl<'a, S: FrameSource> std::iter::FusedIterator for FrameSequence<'a, S> {}

/// Number of frames a window yields at [`STRIDE`].
pub fn sampled_len(window: FrameWindow) -> usize {
    (window.len() as usize + STRIDE - 1) / STRIDE
}
