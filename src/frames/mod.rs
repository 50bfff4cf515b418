//! Everything between a resolved match and a list of ready-to-compose frames.

pub mod extract;
pub mod geometry;
pub mod timing;

pub use self::extract::{FrameSequence, STRIDE, SUBTITLE_PADDING};
pub use self::timing::{frame_window, FrameWindow, ResolvedMatch};

use crate::error::*;
use crate::overlay::Captioner;
use crate::video::FrameSource;
use image::RgbImage;

/// Decode the single frame at `seconds`, corrected for the video's DAR.
pub fn still_at<S: FrameSource>(source: &mut S, seconds: f64, dar: f64) -> Result<RgbImage> {
    let index = (source.fps() * seconds).max(0.0) as u64;
    let frame = source.read_frame(index)?;
    Ok(geometry::correct(frame, dar))
}

/// Decode the middle frame of a match's window, captioned with the subtitle
/// text when a captioner is given.
pub fn still_for_subtitle<S: FrameSource>(
    source: &mut S,
    matched: &ResolvedMatch,
    dar: f64,
    captioner: Option<&dyn Captioner>,
) -> Result<RgbImage> {
    let window = frame_window(source.fps(), matched);
    let index = window.start + window.len() / 2;
    let frame = geometry::correct(source.read_frame(index)?, dar);

    match (matched, captioner) {
        (ResolvedMatch::Subtitle(entry), Some(captioner)) => {
            captioner.draw_quote(frame, &entry.message)
        }
        _ => Ok(frame),
    }
}
