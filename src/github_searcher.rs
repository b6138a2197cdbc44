use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::client::GitHubClient;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::filter::{apply_filter, into_repositories};
use crate::pagination::collect_items;
use crate::report::{sort_repositories, write_csv_file};

/// Outcome of a completed search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    /// `total_count` reported by GitHub on the first page.
    pub total_count: u64,
    pub pages: u32,
    /// Items received across all pages, before filtering.
    pub fetched: usize,
    /// Rows written to the CSV.
    pub written: usize,
    pub output: PathBuf,
}

pub struct GitHubSearcher {
    config: SearchConfig,
    client: GitHubClient,
    progress: ProgressBar,
}

impl GitHubSearcher {
    /// Create a new GitHubSearcher instance
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;

        let cache = match &config.cache_dir {
            Some(dir) => Some(ResponseCache::new(dir, config.cache_ttl)?),
            None => None,
        };

        let progress = ProgressBar::new_spinner();
        progress.set_style(spinner_style());

        let client = GitHubClient::new(&config, cache)?.with_progress(progress.clone());

        Ok(GitHubSearcher { config, client, progress })
    }

    /// Fetch every page, filter, sort and write the CSV report.
    pub async fn run(&self) -> Result<SearchSummary> {
        if self.config.clear_cache {
            if let Some(cache) = self.client.cache() {
                let removed = cache.clear().await?;
                info!("Cleared {} cached responses from {}", removed, cache.dir().display());
            }
        } else if let Some(cache) = self.client.cache() {
            let purged = cache.purge_expired().await?;
            if purged > 0 {
                debug!("Purged {} expired cache entries", purged);
            }
        }

        let url = self.config.search_url();
        let params = self.config.search_params();
        self.progress.set_message(format!("Searching '{}'", self.config.query));
        self.progress.enable_steady_tick(Duration::from_millis(80));

        let progress = &self.progress;
        let collected = collect_items(&self.client, &url, &params, self.config.max_pages, |page_no, page| {
            if page_no == 1 {
                progress.set_length(page.total_count);
                progress.set_style(bar_style());
            }
            progress.inc(page.items.len() as u64);
            progress.set_message(format!("page {}", page_no));
        })
        .await;

        let collected = match collected {
            Ok(collected) => collected,
            Err(e) => {
                self.progress.abandon_with_message(format!("✗ Failed '{}'", self.config.query));
                return Err(e);
            }
        };
        self.progress.finish_and_clear();

        let fetched = collected.items.len();
        info!("Total repositories fetched: {}", fetched);

        let selected = match &self.config.filter {
            Some(expr) => apply_filter(collected.items, expr)?,
            None => collected.items,
        };
        let mut repos = into_repositories(selected)?;
        sort_repositories(&mut repos);

        write_csv_file(&self.config.output, &repos, self.config.description_width)?;
        info!("Data written to {}", self.config.output.display());

        Ok(SearchSummary {
            total_count: collected.total_count,
            pages: collected.pages,
            fetched,
            written: repos.len(),
            output: self.config.output.clone(),
        })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}
