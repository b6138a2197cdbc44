use chrono::SecondsFormat;
use serde::Serialize;
use std::cmp::Reverse;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::model::Repository;

const ELLIPSIS: &str = "...";

#[derive(Serialize)]
struct CsvRow<'a> {
    full_name: &'a str,
    description: String,
    stargazers_count: u64,
    language: &'a str,
    updated_at: String,
    url: &'a str,
}

/// Cut `description` to at most `max_length` characters, ending in `...`
/// when it was shortened. `None` becomes an empty string. Limits too small
/// to hold the ellipsis cut the text without one.
pub fn truncate_description(description: Option<&str>, max_length: usize) -> String {
    let Some(text) = description else {
        return String::new();
    };
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length < ELLIPSIS.len() {
        return text.chars().take(max_length).collect();
    }
    let keep = max_length.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Most starred first, ties broken by most recently updated.
pub fn sort_repositories(repos: &mut [Repository]) {
    repos.sort_by_key(|r| (Reverse(r.stargazers_count), Reverse(r.updated_at)));
}

/// Write `repos` as CSV in the order given.
pub fn write_csv<W: Write>(writer: W, repos: &[Repository], description_width: usize) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for repo in repos {
        csv_writer.serialize(CsvRow {
            full_name: &repo.full_name,
            description: truncate_description(repo.description.as_deref(), description_width),
            stargazers_count: repo.stargazers_count,
            language: repo.language.as_deref().unwrap_or(""),
            updated_at: repo.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            url: &repo.html_url,
        })?;
    }
    if repos.is_empty() {
        // serialize() writes the header with the first row only
        csv_writer.write_record(["full_name", "description", "stargazers_count", "language", "updated_at", "url"])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, repos: &[Repository], description_width: usize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), repos, description_width)?;
    info!("Wrote {} repositories to {}", repos.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    fn repo(name: &str, stars: u64, updated: &str) -> Repository {
        Repository {
            full_name: name.to_string(),
            description: Some(format!("{} description", name)),
            stargazers_count: stars,
            language: Some("Rust".to_string()),
            updated_at: updated.parse::<DateTime<Utc>>().unwrap(),
            html_url: format!("https://github.com/{}", name),
        }
    }

    #[test]
    fn truncates_long_descriptions() {
        let text = "This is a very long description that needs to be truncated.";
        assert_eq!(truncate_description(Some(text), 20), "This is a very lo...");
        assert_eq!(truncate_description(Some("Short description."), 20), "Short description.");
        assert_eq!(truncate_description(None, 20), "");
    }

    #[test]
    fn tiny_limits_never_exceed_max_length() {
        assert_eq!(truncate_description(Some("abcdef"), 2), "ab");
        assert_eq!(truncate_description(Some("abcdef"), 0), "");
        assert_eq!(truncate_description(Some("abcdef"), 3), "...");
        assert_eq!(truncate_description(Some("ab"), 2), "ab");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "日本語のリポジトリの説明です";
        let out = truncate_description(Some(text), 8);
        assert_eq!(out, "日本語のリ...");
    }

    #[test]
    fn sorts_by_stars_then_recency() {
        let mut repos = vec![
            repo("a/low", 10, "2023-01-01T00:00:00Z"),
            repo("b/old", 20, "2022-06-01T00:00:00Z"),
            repo("c/new", 20, "2023-01-02T00:00:00Z"),
        ];
        sort_repositories(&mut repos);
        let names: Vec<_> = repos.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["c/new", "b/old", "a/low"]);
    }

    #[test]
    fn writes_header_and_rows() {
        let mut repos = vec![repo("repo1", 10, "2023-01-01T00:00:00Z"), repo("repo2", 20, "2023-01-02T00:00:00Z")];
        repos[0].language = None;
        let mut out = Vec::new();
        write_csv(&mut out, &repos, 80).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "full_name,description,stargazers_count,language,updated_at,url");
        assert_eq!(lines[1], "repo1,repo1 description,10,,2023-01-01T00:00:00Z,https://github.com/repo1");
        assert_eq!(lines[2], "repo2,repo2 description,20,Rust,2023-01-02T00:00:00Z,https://github.com/repo2");
    }

    #[test]
    fn empty_report_still_has_header() {
        let mut out = Vec::new();
        write_csv(&mut out, &[], 80).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "full_name,description,stargazers_count,language,updated_at,url\n");
    }

    proptest! {
        #[test]
        fn truncated_never_exceeds_limit(text in ".{0,200}", max in 0usize..120) {
            let out = truncate_description(Some(&text), max);
            prop_assert!(out.chars().count() <= max);
            if text.chars().count() <= max {
                prop_assert_eq!(out, text);
            } else if max >= ELLIPSIS.len() {
                prop_assert!(out.ends_with(ELLIPSIS));
            }
        }

        #[test]
        fn sort_orders_stars_descending(stars in proptest::collection::vec(0u64..10_000, 0..50)) {
            let mut repos: Vec<_> = stars.iter().enumerate()
                .map(|(i, s)| repo(&format!("r/{}", i), *s, "2023-01-01T00:00:00Z"))
                .collect();
            sort_repositories(&mut repos);
            prop_assert!(repos.windows(2).all(|w| w[0].stargazers_count >= w[1].stargazers_count));
        }
    }
}
