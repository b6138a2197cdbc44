use futures::{Stream, TryStreamExt};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::client::GitHubClient;
use crate::error::{Result, SearchError};
use crate::model::SearchPage;

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"<([^>]*)>\s*;\s*rel="([^"]*)""#).expect("link header pattern is valid"))
}

/// Parse an RFC 8288 `Link` header into `rel -> url`. URLs are delimited by
/// their angle brackets, so commas inside a URL are kept.
pub fn parse_link_header(header: &str) -> HashMap<String, String> {
    link_pattern()
        .captures_iter(header)
        .map(|caps| (caps[2].to_string(), caps[1].to_string()))
        .collect()
}

/// Stream of search pages. The first request carries `params`; every later
/// request follows the `next` link verbatim since it already holds the query.
pub fn pages<'a>(client: &'a GitHubClient, url: &str, params: &[(String, String)]) -> impl Stream<Item = Result<SearchPage>> + 'a {
    let start = Some((url.to_string(), params.to_vec()));

    futures::stream::try_unfold(start, move |state| async move {
        let Some((url, params)) = state else {
            return Ok::<_, SearchError>(None);
        };

        let response = client.get(&url, &params).await?;
        if response.from_cache {
            debug!("Served {} from cache", response.url);
        }
        let page: SearchPage = serde_json::from_value(response.body)?;

        let next = parse_link_header(response.link.as_deref().unwrap_or(""))
            .remove("next")
            .filter(|next| {
                let looping = *next == response.url;
                if looping {
                    warn!("Next link points back at {}, stopping", next);
                }
                !looping
            });

        Ok::<_, SearchError>(Some((page, next.map(|next| (next, Vec::new())))))
    })
}

/// Everything gathered from one paginated search.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub total_count: u64,
    pub pages: u32,
    pub items: Vec<Value>,
}

/// Drain the page stream into a single item list. `on_page` is called with
/// the 1-based page number after each page arrives.
pub async fn collect_items<F>(
    client: &GitHubClient,
    url: &str,
    params: &[(String, String)],
    max_pages: Option<u32>,
    mut on_page: F,
) -> Result<Collected>
where
    F: FnMut(u32, &SearchPage),
{
    let mut stream = Box::pin(pages(client, url, params));
    let mut collected = Collected::default();

    loop {
        if let Some(max) = max_pages {
            if collected.pages >= max {
                info!("Max page limit reached (limit: {})", max);
                break;
            }
        }

        let page = match stream.try_next().await {
            Ok(Some(page)) => page,
            Ok(None) => break,
            // GitHub refuses to page past its first 1000 results.
            Err(e) if collected.pages > 0 && e.status() == Some(422) => {
                warn!("Reached search limit at page {}: {}", collected.pages + 1, e);
                break;
            }
            Err(e) => return Err(e),
        };

        collected.pages += 1;
        if collected.pages == 1 {
            collected.total_count = page.total_count;
            info!("Total repositories to fetch: {}", page.total_count);
        }
        if page.incomplete_results {
            warn!("GitHub reported incomplete results for page {}", collected.pages);
        }
        on_page(collected.pages, &page);

        // An empty page ends the search even if GitHub still sends a next link.
        if page.items.is_empty() {
            debug!("Page {} returned no items", collected.pages);
            break;
        }
        collected.items.extend(page.items);
    }

    Ok(collected)
}
