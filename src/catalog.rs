use crate::error::*;
use crate::subtitles::{self, normalize, SubtitleEntry};
use serde_derive::{Deserialize, Serialize};
use slog::Logger;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Minimum score for a strict lookup to accept a candidate.
pub const STRICT_THRESHOLD: f64 = 0.85;

/// A movie or an episode known to the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRecord {
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u32>,
    pub director: Option<String>,
    pub category: Option<String>,
    pub writer: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub path: PathBuf,
    pub subtitle: PathBuf,
}

impl MediaRecord {
    pub fn is_episode(&self) -> bool {
        self.season.is_some() && self.episode.is_some()
    }

    /// Every way a user is likely to spell this record.
    fn aliases(&self) -> Vec<String> {
        let mut aliases = vec![self.title.clone()];

        if let Some(year) = self.year {
            aliases.push(format!("{} ({})", self.title, year));
        }
        if let Some(original) = &self.original_title {
            aliases.push(original.clone());
        }
        if let (Some(season), Some(episode)) = (self.season, self.episode) {
            aliases.push(format!("{} s{:02}e{:02}", self.title, season, episode));
        }

        aliases
    }

    /// Best similarity between `query` and any alias, in `[0, 1]`.
    pub fn score(&self, query: &str) -> f64 {
        let query = normalize(query);
        let query_tokens = query.split(' ').filter(|t| !t.is_empty()).collect::<HashSet<_>>();
        if query_tokens.is_empty() {
            return 0.0;
        }

        self.aliases()
            .iter()
            .map(|alias| {
                let alias = normalize(alias);
                if alias == query {
                    return 1.0;
                }
                let alias_tokens = alias.split(' ').filter(|t| !t.is_empty()).collect::<HashSet<_>>();
                let shared = query_tokens.intersection(&alias_tokens).count() as f64;
                let total = query_tokens.union(&alias_tokens).count() as f64;
                shared / total
            })
            .fold(0.0, f64::max)
    }
}

pub trait Catalog {
    /// Look up a record by user-supplied identifier. A strict lookup only
    /// accepts close matches; a non-strict one settles for the best candidate.
    fn search(&self, log: &Logger, identifier: &str, strict: bool) -> Result<MediaRecord>;

    fn subtitles(&self, record: &MediaRecord) -> Result<Vec<SubtitleEntry>>;
}

/// Catalog backed by a JSON array of [`MediaRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    records: Vec<MediaRecord>,
}

impl JsonCatalog {
    pub fn new(records: Vec<MediaRecord>) -> Self {
        JsonCatalog { records }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .context_kind(ErrorKind::Io, format!("failed to open catalog `{}`", path.display()))?;
        let records = serde_json::from_reader(std::io::BufReader::new(file))
            .context("failed to parse catalog")?;

        Ok(JsonCatalog { records })
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }
}

/// Pick the best-scoring record. Shared by every [`Catalog`] implementation
/// that holds its records in memory.
pub fn search_records<'a>(
    log: &Logger,
    records: &'a [MediaRecord],
    identifier: &str,
    strict: bool,
) -> Result<&'a MediaRecord> {
    let mut best: Option<(f64, &MediaRecord)> = None;
    for record in records {
        let score = record.score(identifier);
        if score > best.map_or(0.0, |(s, _)| s) {
            best = Some((score, record));
        }
    }

    match best {
        Some((score, record)) if !strict || score >= STRICT_THRESHOLD => {
            slog::debug!(
                log, "Catalog match";
                "query" => identifier, "title" => &record.title, "score" => score
            );
            Ok(record)
        }
        Some((score, record)) => {
            slog::info!(
                log, "Rejecting loose catalog match";
                "query" => identifier, "title" => &record.title, "score" => score
            );
            Err(Error::not_found(format!(
                "`{}` not found (closest: `{}`)",
                identifier, record.title
            )))
        }
        None => Err(Error::not_found(format!("`{}` not found", identifier))),
    }
}

impl Catalog for JsonCatalog {
    fn search(&self, log: &Logger, identifier: &str, strict: bool) -> Result<MediaRecord> {
        search_records(log, &self.records, identifier, strict).map(Clone::clone)
    }

    fn subtitles(&self, record: &MediaRecord) -> Result<Vec<SubtitleEntry>> {
        subtitles::get_subtitles_from_file(&record.subtitle)
    }
}
