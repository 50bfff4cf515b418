use crate::subtitles::SubtitleEntry;
use serde_derive::Serialize;

/// A fragment bound to concrete timing, ready to be turned into frames.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMatch {
    Subtitle(SubtitleEntry),
    Range(f64, f64),
}

/// `(start, end)` frame indices. Not guaranteed to be ordered for malformed
/// input; callers validate ranges before extracting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameWindow {
    pub start: u64,
    pub end: u64,
}

impl FrameWindow {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extend the end of the window, e.g. to keep a caption on screen a
    /// little longer than its subtitle.
    pub fn padded(self, frames: u64) -> Self {
        FrameWindow {
            start: self.start,
            end: self.end + frames,
        }
    }
}

/// Truncating `fps * seconds`, clamped at zero.
fn frames_at(fps: f64, seconds: f64) -> u64 {
    (fps * seconds).max(0.0) as u64
}

/// Whole seconds and their microsecond remainders are converted separately
/// and summed, so each part is truncated on its own.
pub fn frame_window(fps: f64, matched: &ResolvedMatch) -> FrameWindow {
    match matched {
        ResolvedMatch::Subtitle(entry) => {
            let extra_start = frames_at(fps, entry.start_us as f64 * 0.000_001);
            let extra_end = frames_at(fps, entry.end_us as f64 * 0.000_001);

            FrameWindow {
                start: frames_at(fps, entry.start as f64) + extra_start,
                end: frames_at(fps, entry.end as f64) + extra_end,
            }
        }
        ResolvedMatch::Range(start, end) => FrameWindow {
            start: frames_at(fps, *start),
            end: frames_at(fps, *end),
        },
    }
}
