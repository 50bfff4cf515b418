use crate::error::*;
use crate::request::Request;
use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use subparse::SubtitleFormat;

lazy_static! {
    // Anything between {}'s is an ASS override block, <...> is SRT styling
    static ref ESCAPES: Regex = Regex::new(r"\{[^}]*\}|</?[a-zA-Z][^>]*>").unwrap();
    static ref SPACES: Regex = Regex::new(r"\\N|\\n|\\h|\n").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// One dialogue line with its timing split into whole seconds and a
/// microsecond remainder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start: u64,
    pub start_us: u64,
    pub end: u64,
    pub end_us: u64,
    pub message: String,
}

impl SubtitleEntry {
    pub fn from_millis(index: usize, start_ms: i64, end_ms: i64, message: String) -> Self {
        let start_ms = start_ms.max(0) as u64;
        let end_ms = end_ms.max(0) as u64;

        SubtitleEntry {
            index,
            start: start_ms / 1000,
            start_us: (start_ms % 1000) * 1000,
            end: end_ms / 1000,
            end_us: (end_ms % 1000) * 1000,
            message,
        }
    }

    pub fn start_seconds(&self) -> f64 {
        self.start as f64 + self.start_us as f64 * 0.000_001
    }

    pub fn end_seconds(&self) -> f64 {
        self.end as f64 + self.end_us as f64 * 0.000_001
    }
}

pub fn clean_line(line: &str) -> String {
    let text = ESCAPES.replace_all(line, "");
    let text = SPACES.replace_all(&text, " ");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

pub fn get_subtitles_from_file(path: &Path) -> Result<Vec<SubtitleEntry>> {
    let display = path.to_string_lossy();
    let format = subparse::get_subtitle_format_by_extension(path.extension()).ok_or_else(|| {
        Error::invalid_request(format!("failed to determine subtitle format of `{}`", display))
    })?;

    let mut file = std::fs::File::open(path)
        .context_kind(ErrorKind::NotFound, format!("failed to read `{}`", display))?;

    parse_subtitles(&mut file, format)
}

/// Parse a subtitle stream, dropping `Comment:` events from SSA/ASS files and
/// any line left empty after markup removal.
pub fn parse_subtitles(
    source: &mut impl Read,
    format: SubtitleFormat,
) -> Result<Vec<SubtitleEntry>> {
    let mut output = String::new();

    if format == SubtitleFormat::SubStationAlpha {
        for line in BufReader::new(source).lines() {
            let line = line.context("failed to read line")?;
            if !line.starts_with("Comment: ") {
                output.push_str(&line);
                output.push('\n');
            }
        }
    } else {
        source
            .read_to_string(&mut output)
            .context("failed to read subtitles")?;
    }

    let entries = subparse::parse_str(format, &output, 24.0)
        .map_err(|e| Error::context(format!("failed to parse subtitle file: {}", e)))?
        .get_subtitle_entries()
        .map_err(|e| Error::context(format!("failed to get subtitle entries: {}", e)))?;

    let mut subtitles = entries
        .into_iter()
        .filter_map(|entry| {
            let message = clean_line(entry.line.as_ref()?);
            if message.is_empty() {
                return None;
            }
            Some((entry.timespan.start.msecs(), entry.timespan.end.msecs(), message))
        })
        .collect::<Vec<_>>();

    subtitles.sort_by_key(|(start, _, _)| *start);

    Ok(subtitles
        .into_iter()
        .enumerate()
        .map(|(index, (start, end, message))| SubtitleEntry::from_millis(index, start, end, message))
        .collect())
}

/// Quote and chain resolution against a subtitle list.
pub trait QuoteMatcher {
    fn find_quote(&self, subtitles: &[SubtitleEntry], quote: &str) -> Result<SubtitleEntry>;

    /// Match the request's whole fragment list against a contiguous run of
    /// entries. An empty result means no chain was found.
    fn guess_subtitle_chain(
        &self,
        subtitles: &[SubtitleEntry],
        request: &Request,
    ) -> Vec<SubtitleEntry>;
}

/// Normalized substring matching with a token-overlap fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubtitleMatcher;

pub fn normalize(text: &str) -> String {
    let lowered = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>();

    WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(' ')
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Share of the quote's tokens present in the candidate line.
fn overlap(quote: &HashSet<String>, line: &str) -> f64 {
    if quote.is_empty() {
        return 0.0;
    }
    let line = tokens(line);
    quote.intersection(&line).count() as f64 / quote.len() as f64
}

impl QuoteMatcher for SubtitleMatcher {
    fn find_quote(&self, subtitles: &[SubtitleEntry], quote: &str) -> Result<SubtitleEntry> {
        let needle = normalize(quote);
        if needle.is_empty() {
            return Err(Error::invalid_request("empty quote"));
        }

        if let Some(entry) = subtitles
            .iter()
            .find(|entry| normalize(&entry.message).contains(&needle))
        {
            return Ok(entry.clone());
        }

        let quote_tokens = tokens(&needle);
        let mut best: Option<(f64, &SubtitleEntry)> = None;
        for entry in subtitles {
            let score = overlap(&quote_tokens, &normalize(&entry.message));
            if score > best.map_or(0.0, |(s, _)| s) {
                best = Some((score, entry));
            }
        }

        best.map(|(_, entry)| entry.clone())
            .ok_or_else(|| Error::not_found(format!("quote not found: `{}`", quote)))
    }

    fn guess_subtitle_chain(
        &self,
        subtitles: &[SubtitleEntry],
        request: &Request,
    ) -> Vec<SubtitleEntry> {
        if request.content.len() < 2 || request.content.len() > subtitles.len() {
            return Vec::new();
        }

        let needles = request
            .content
            .iter()
            .map(|quote| normalize(quote))
            .collect::<Vec<_>>();

        if needles.iter().any(String::is_empty) {
            return Vec::new();
        }

        let messages = subtitles
            .iter()
            .map(|entry| normalize(&entry.message))
            .collect::<Vec<_>>();

        messages
            .windows(needles.len())
            .position(|window| {
                window
                    .iter()
                    .zip(&needles)
                    .all(|(message, needle)| message.contains(needle.as_str()))
            })
            .map(|start| subtitles[start..start + needles.len()].to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::dissect_comment;

    const SRT: &str = "1
00:00:01,500 --> 00:00:03,250
<i>Hello there.</i>

2
00:00:04,000 --> 00:00:06,000
General Kenobi!

3
00:00:06,100 --> 00:00:08,900
You are a bold one.
";

    fn subtitles() -> Vec<SubtitleEntry> {
        parse_subtitles(&mut SRT.as_bytes(), SubtitleFormat::SubRip).unwrap()
    }

    #[test]
    fn parses_srt_into_seconds_and_remainders() {
        let subs = subtitles();

        assert_eq!(subs.len(), 3);
        assert_eq!(subs[0].message, "Hello there.");
        assert_eq!((subs[0].start, subs[0].start_us), (1, 500_000));
        assert_eq!((subs[0].end, subs[0].end_us), (3, 250_000));
        assert_eq!(subs[2].index, 2);
    }

    #[test]
    fn cleans_ass_markup() {
        assert_eq!(clean_line(r"{\an8}Over\Nthere"), "Over there");
        assert_eq!(clean_line("<b>  bold </b>"), "bold");
    }

    #[test]
    fn finds_quotes_by_substring_then_overlap() {
        let subs = subtitles();
        let matcher = SubtitleMatcher;

        assert_eq!(matcher.find_quote(&subs, "general kenobi").unwrap().index, 1);
        assert_eq!(matcher.find_quote(&subs, "bold one, you are").unwrap().index, 2);

        let err = matcher.find_quote(&subs, "nothing matches").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn guesses_contiguous_chain() {
        let subs = subtitles();
        let matcher = SubtitleMatcher;

        let request = dissect_comment("!req Star Wars [General Kenobi] [bold one]").unwrap();
        let chain = matcher.guess_subtitle_chain(&subs, &request);
        assert_eq!(chain.iter().map(|e| e.index).collect::<Vec<_>>(), vec![1, 2]);

        let request = dissect_comment("!req Star Wars [Hello there] [bold one]").unwrap();
        assert!(matcher.guess_subtitle_chain(&subs, &request).is_empty());

        let request = dissect_comment("!req Star Wars [Hello there]").unwrap();
        assert!(matcher.guess_subtitle_chain(&subs, &request).is_empty());
    }
}
