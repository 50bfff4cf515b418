//! Human-readable descriptions posted alongside the images.

use crate::catalog::MediaRecord;
use crate::request::{Request, RequestFlags};

pub const PARALLEL_CATEGORY: &str = "Kinema Parallels";
pub const PROJECT_URL: &str = "https://github.com/vitiko98/kinobot";

/// Original titles this long are left out of the description.
const MAX_ORIGINAL_TITLE_LEN: usize = 45;

fn or_unknown<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "Unknown".to_owned(), ToString::to_string)
}

fn episode_title(record: &MediaRecord) -> String {
    format!(
        "{} - Season {}, Episode {}",
        record.title,
        or_unknown(&record.season),
        or_unknown(&record.episode)
    )
}

fn movie_title(record: &MediaRecord) -> String {
    format!("{} ({})", record.title, or_unknown(&record.year))
}

/// Combined title for a parallel request: every side's title joined by `|`,
/// under the parallels category.
pub fn get_alt_title(records: &[&MediaRecord], is_episode: bool) -> String {
    let titles = records
        .iter()
        .map(|record| {
            if is_episode {
                episode_title(record)
            } else {
                movie_title(record)
            }
        })
        .collect::<Vec<_>>();

    format!("{}\nCategory: {}", titles.join(" | "), PARALLEL_CATEGORY)
}

fn pretty_title(record: &MediaRecord) -> String {
    match &record.original_title {
        Some(original)
            if original.to_lowercase() != record.title.to_lowercase()
                && original.chars().count() < MAX_ORIGINAL_TITLE_LEN =>
        {
            format!("{} [{}]", original, record.title)
        }
        _ => record.title.clone(),
    }
}

pub fn get_description(
    record: &MediaRecord,
    request: &Request,
    flags: &RequestFlags,
    extra_info: bool,
) -> String {
    let title = match &flags.alt_title {
        Some(alt_title) => alt_title.clone(),
        None if flags.is_episode => format!(
            "{}\nWriter: {}",
            episode_title(record),
            or_unknown(&record.writer)
        ),
        None => format!(
            "{} ({})\nDirector: {}\nCategory: {}",
            pretty_title(record),
            or_unknown(&record.year),
            or_unknown(&record.director),
            or_unknown(&record.category)
        ),
    };

    if !extra_info {
        return title;
    }

    let banner = chrono::Local::now()
        .format("Automatically executed at %H:%M GMT-4")
        .to_string();

    format!(
        "{}\n\nRequested by {} ({} {})\n\n{}\nThis bot is open source: {}",
        title, request.user, request.kind, request.comment, banner, PROJECT_URL
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::dissect_comment;
    use crate::testing;

    fn episode() -> MediaRecord {
        MediaRecord {
            title: "The Sopranos".into(),
            season: Some(1),
            episode: Some(2),
            writer: Some("Frank Renzulli".into()),
            ..MediaRecord::default()
        }
    }

    #[test]
    fn movie_description_uses_original_title() {
        let mut record = testing::movie("Stalker", 1979);
        record.original_title = Some("Сталкер".into());
        let request = dissect_comment("!req Stalker [1:00]").unwrap();

        let description = get_description(&record, &request, &RequestFlags::default(), false);
        assert_eq!(
            description,
            "Сталкер [Stalker] (1979)\nDirector: Some Director\nCategory: Certified Kino"
        );
    }

    #[test]
    fn same_original_title_is_not_repeated() {
        let mut record = testing::movie("Stalker", 1979);
        record.original_title = Some("STALKER".into());
        let request = dissect_comment("!req Stalker [1:00]").unwrap();

        let description = get_description(&record, &request, &RequestFlags::default(), false);
        assert!(description.starts_with("Stalker (1979)\n"));
    }

    #[test]
    fn episode_description_names_the_writer() {
        let request = dissect_comment("!req The Sopranos s01e02 [1:00]").unwrap();
        let flags = RequestFlags::classify(&request);

        let description = get_description(&episode(), &request, &flags, false);
        assert_eq!(
            description,
            "The Sopranos - Season 1, Episode 2\nWriter: Frank Renzulli"
        );
    }

    #[test]
    fn parallel_titles_are_joined() {
        let stalker = testing::movie("Stalker", 1979);
        let solaris = testing::movie("Solaris", 1972);

        let title = get_alt_title(&[&stalker, &solaris], false);
        assert_eq!(
            title,
            "Stalker (1979) | Solaris (1972)\nCategory: Kinema Parallels"
        );

        let episode = episode();
        let title = get_alt_title(&[&episode, &episode], true);
        assert!(title.starts_with("The Sopranos - Season 1, Episode 2 | The Sopranos"));
    }

    #[test]
    fn extra_info_credits_the_requester() {
        let mut request = dissect_comment("!req Stalker [1:00]").unwrap();
        request.user = "Someone".into();
        let flags = RequestFlags {
            alt_title: Some("A | B\nCategory: Kinema Parallels".into()),
            ..RequestFlags::default()
        };

        let description = get_description(&testing::movie("Stalker", 1979), &request, &flags, true);
        assert!(description.starts_with("A | B\nCategory: Kinema Parallels\n\n"));
        assert!(description.contains("Requested by Someone (!req Stalker [1:00])"));
        assert!(description.contains("Automatically executed at "));
        assert!(description.ends_with(PROJECT_URL));
    }
}
