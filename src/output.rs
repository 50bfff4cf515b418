use crate::catalog::MediaRecord;
use crate::error::*;
use crate::request::Request;
use image::RgbImage;
use lazy_static::lazy_static;
use regex::Regex;
use slog::Logger;
use std::path::{Path, PathBuf};

/// Column width of `info.txt`.
pub const INFO_WIDTH: usize = 70;

lazy_static! {
    static ref CHUNKS: Regex = Regex::new(r"\s+|\S+").unwrap();
}

/// Greedy word wrap. Whitespace inside a line is kept (each character as a
/// space), whitespace at a break is dropped, and words longer than `width`
/// are split across lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    let mut finish = |line: &mut String, line_len: &mut usize| {
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_owned());
        }
        line.clear();
        *line_len = 0;
    };

    for chunk in CHUNKS.find_iter(text).map(|m| m.as_str()) {
        let chunk_len = chunk.chars().count();

        if chunk.chars().all(char::is_whitespace) {
            if line_len == 0 {
                continue;
            }
            if line_len + chunk_len > width {
                finish(&mut line, &mut line_len);
            } else {
                line.extend(std::iter::repeat(' ').take(chunk_len));
                line_len += chunk_len;
            }
            continue;
        }

        if line_len + chunk_len > width {
            finish(&mut line, &mut line_len);
        }

        let mut word = chunk;
        while word.chars().count() > width {
            let split = word
                .char_indices()
                .nth(width)
                .map_or(word.len(), |(position, _)| position);
            line.push_str(&word[..split]);
            finish(&mut line, &mut line_len);
            word = &word[split..];
        }

        line.push_str(word);
        line_len += word.chars().count();
    }

    finish(&mut line, &mut line_len);
    lines
}

/// One-line summary of what was requested from which record.
pub fn info_text(record: &MediaRecord, request: &Request) -> String {
    let title = match record.year {
        Some(year) => format!("{} ({})", record.title, year),
        None => record.title.clone(),
    };
    let content = request
        .content
        .iter()
        .map(|fragment| format!("[{}]", fragment))
        .collect::<Vec<_>>()
        .join(" ");

    format!("{} *** {} {}", title, request.kind, content)
}

/// Name of a fresh output directory: the current time in seconds, with
/// microseconds.
pub fn timestamp_dirname() -> String {
    let now = chrono::Utc::now();
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

/// Write `images` as `00.jpg`, `01.jpg`, ... plus `info.txt` into a new
/// directory under `frames_dir`. The directory only appears once every file
/// has been written.
pub fn save_images(
    log: &Logger,
    frames_dir: &Path,
    images: &[RgbImage],
    record: &MediaRecord,
    request: &Request,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(frames_dir).context_kind(
        ErrorKind::Io,
        format!("failed to create `{}`", frames_dir.display()),
    )?;

    let staging = tempfile::Builder::new()
        .prefix(".pending-")
        .tempdir_in(frames_dir)
        .context_kind(ErrorKind::Io, "failed to create staging directory")?;

    let info = wrap(&info_text(record, request), INFO_WIDTH).join("\n");
    std::fs::write(staging.path().join("info.txt"), info)
        .context_kind(ErrorKind::Io, "failed to write info.txt")?;

    let names = (0..images.len())
        .map(|n| format!("{:02}.jpg", n))
        .collect::<Vec<_>>();

    for (image, name) in images.iter().zip(&names) {
        image
            .save(staging.path().join(name))
            .context_kind(ErrorKind::Io, format!("failed to save `{}`", name))?;
    }

    let directory = frames_dir.join(timestamp_dirname());
    std::fs::rename(staging.path(), &directory).context_kind(
        ErrorKind::Io,
        format!("failed to move images to `{}`", directory.display()),
    )?;
    // Already moved into place
    let _ = staging.keep();

    let paths = names
        .iter()
        .map(|name| directory.join(name))
        .collect::<Vec<_>>();

    for path in &paths {
        slog::info!(log, "Saved"; "path" => %path.display());
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::dissect_comment;
    use crate::testing;

    #[test]
    fn wraps_at_width_without_losing_characters() {
        let text = "Stalker (1979) *** !req [What do you want? The truth? Peace? \
                    Happiness? Love?] [1:00] [I don't know what I want]";
        let lines = wrap(text, INFO_WIDTH);

        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= INFO_WIDTH));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn spaces_inside_a_line_are_kept() {
        assert_eq!(wrap("Stalker *** !req [a  b]", INFO_WIDTH), vec!["Stalker *** !req [a  b]"]);
        assert_eq!(wrap("ab  cd ef", 5), vec!["ab", "cd ef"]);
        assert_eq!(wrap("  lead and tab\there  ", 70), vec!["lead and tab here"]);
    }

    #[test]
    fn long_words_are_broken() {
        let lines = wrap("ab abcdefgh c", 4);
        assert_eq!(lines, vec!["ab", "abcd", "efgh", "c"]);
    }

    #[test]
    fn info_summarizes_record_and_request() {
        let request = dissect_comment("!req Stalker [Hello there] [1:00]").unwrap();
        let text = info_text(&testing::movie("Stalker", 1979), &request);
        assert_eq!(text, "Stalker (1979) *** !req [Hello there] [1:00]");
    }

    #[test]
    fn saves_numbered_jpegs_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let request = dissect_comment("!req Stalker [Hello there]").unwrap();
        let images = vec![RgbImage::new(16, 9), RgbImage::new(16, 9)];

        let paths = save_images(
            &testing::log(),
            dir.path(),
            &images,
            &testing::movie("Stalker", 1979),
            &request,
        )
        .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("00.jpg"));
        assert!(paths[1].ends_with("01.jpg"));
        assert!(paths.iter().all(|p| p.is_file()));

        let directory = paths[0].parent().unwrap();
        let info = std::fs::read_to_string(directory.join("info.txt")).unwrap();
        assert_eq!(info, "Stalker (1979) *** !req [Hello there]");

        // Nothing but the final directory is left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
