//! Structured requests and the fragments they carry.
//!
//! A [`Request`] is immutable once dissected. Fields derived later in the
//! pipeline (episode flag, parallel sub-requests, the alternate title) are
//! returned separately as [`RequestFlags`] instead of being written back.

use crate::error::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::Serialize;
use std::fmt;

/// Requests carrying more fragments than this are rejected outright.
pub const MAX_FRAGMENTS: usize = 10;

lazy_static! {
    static ref COMMAND: Regex = Regex::new(r"^\s*(![a-z]+)\s+(.*)$").unwrap();
    static ref BRACKETS: Regex = Regex::new(r"\[([^\[\]]*)\]").unwrap();
    static ref EPISODE: Regex = Regex::new(r"(?i)\bs\d{1,2}e\d{1,3}\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestKind {
    #[serde(rename = "!req")]
    Frames,
    #[serde(rename = "!gif")]
    Gif,
    #[serde(rename = "!palette")]
    Palette,
    #[serde(rename = "!parallel")]
    Parallel,
}

impl RequestKind {
    pub fn from_command(command: &str) -> Result<Self> {
        match command {
            "!req" => Ok(RequestKind::Frames),
            "!gif" => Ok(RequestKind::Gif),
            "!palette" => Ok(RequestKind::Palette),
            "!parallel" => Ok(RequestKind::Parallel),
            other => Err(Error::invalid_request(format!(
                "unknown request type `{}`",
                other
            ))),
        }
    }

    pub fn command(self) -> &'static str {
        match self {
            RequestKind::Frames => "!req",
            RequestKind::Gif => "!gif",
            RequestKind::Palette => "!palette",
            RequestKind::Parallel => "!parallel",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// One atomic piece of request content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Fragment {
    Quote(String),
    /// Explicit second range, e.g. `00:01:00-00:01:05`.
    Range(f64, f64),
    /// A single timestamp, in seconds.
    Minute(f64),
}

impl Fragment {
    pub fn parse(raw: &str) -> Fragment {
        let raw = raw.trim();

        if let Some(seconds) = parse_timestamp(raw) {
            return Fragment::Minute(seconds);
        }

        match parse_range(raw) {
            Some((start, end)) => Fragment::Range(start, end),
            None => Fragment::Quote(raw.to_owned()),
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fragment::Quote(quote) => f.write_str(quote),
            Fragment::Range(start, end) => write!(f, "{}-{}", start, end),
            Fragment::Minute(seconds) => write!(f, "{}", seconds),
        }
    }
}

/// Convert plain seconds, `MM:SS` or `HH:MM:SS` into seconds.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut seconds = 0.0;
    let parts = raw.split(':').collect::<Vec<_>>();
    if parts.len() > 3 {
        return None;
    }

    for part in parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
    }

    Some(seconds)
}

/// Split an `a-b` token into two seconds values. Returns `None` as soon as
/// either side is not a timestamp, in which case the whole token is a quote.
pub fn parse_range(raw: &str) -> Option<(f64, f64)> {
    let sides = raw.split('-').map(parse_timestamp).collect::<Vec<_>>();

    match sides.as_slice() {
        [Some(start), Some(end)] => Some((*start, *end)),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: String,
    pub user: String,
    pub kind: RequestKind,
    /// Everything after the command, as typed by the user.
    pub comment: String,
    pub movie: String,
    pub content: Vec<String>,
    pub verified: bool,
    pub on_demand: bool,
}

impl Request {
    pub fn fragments(&self) -> Vec<Fragment> {
        self.content.iter().map(|raw| Fragment::parse(raw)).collect()
    }

    pub fn is_multiple(&self) -> bool {
        self.content.len() > 1
    }

    /// Build the sub-request for one side of a parallel comment.
    pub fn parallel_child(&self, part: &str) -> Result<Request> {
        let mut child = dissect_comment(&format!("!req {}", part))?;
        child.id = self.id.clone();
        child.user = self.user.clone();
        child.verified = self.verified;
        child.on_demand = self.on_demand;
        child.kind = RequestKind::Parallel;
        Ok(child)
    }
}

/// Fields computed from the raw comment before resolution starts, plus the
/// alternate title produced by parallel composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestFlags {
    pub is_episode: bool,
    pub parallel: Option<Vec<String>>,
    pub alt_title: Option<String>,
}

impl RequestFlags {
    pub fn classify(request: &Request) -> Self {
        RequestFlags {
            is_episode: is_episode(&request.comment),
            parallel: is_parallel(&request.comment),
            alt_title: None,
        }
    }
}

pub fn is_episode(comment: &str) -> bool {
    EPISODE.is_match(comment)
}

/// A comment is parallel when it holds at least two `|`-separated sides.
pub fn is_parallel(comment: &str) -> Option<Vec<String>> {
    let parts = comment
        .split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect::<Vec<_>>();

    if parts.len() > 1 {
        Some(parts)
    } else {
        None
    }
}

/// Turn `!type Title [fragment] [fragment]` into a [`Request`].
///
/// Parallel comments keep the whole text as `comment`; the title and content
/// of the first side are used for the top-level request.
pub fn dissect_comment(text: &str) -> Result<Request> {
    let captures = COMMAND
        .captures(text)
        .ok_or_else(|| Error::invalid_request(format!("no command found in `{}`", text)))?;

    let kind = RequestKind::from_command(&captures[1])?;
    let comment = captures[2].trim().to_owned();
    let first_side = comment.split('|').next().unwrap_or_default();

    let movie = match first_side.find('[') {
        Some(position) => first_side[..position].trim().to_owned(),
        None => first_side.trim().to_owned(),
    };

    let content = BRACKETS
        .captures_iter(first_side)
        .map(|c| c[1].trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();

    if movie.is_empty() || content.is_empty() {
        return Err(Error::invalid_request(format!(
            "expected `{} Title [content]`, got `{}`",
            kind, text
        )));
    }

    Ok(Request {
        id: String::new(),
        user: String::new(),
        kind,
        comment,
        movie,
        content,
        verified: false,
        on_demand: false,
    })
}
