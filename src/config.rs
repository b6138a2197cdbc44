use std::path::PathBuf;
use std::time::Duration;

use crate::args::Args;
use crate::error::{Result, SearchError};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_ENDPOINT: &str = "/search/repositories";
pub const DEFAULT_QUERY: &str = "quasar OR quasar-framework in:topics";

/// Validated settings for a single search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub endpoint: String,
    pub query: String,
    pub per_page: u32,
    pub sort: String,
    pub order: String,
    pub token: String,
    pub output: PathBuf,
    pub max_pages: Option<u32>,
    /// `None` disables the response cache.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub clear_cache: bool,
    pub filter: Option<String>,
    pub description_width: usize,
    pub max_retries: u32,
}

impl SearchConfig {
    /// Build a config with defaults for everything but the credential.
    pub fn new(token: impl Into<String>) -> Self {
        SearchConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query: DEFAULT_QUERY.to_string(),
            per_page: 100,
            sort: "stars".to_string(),
            order: "desc".to_string(),
            token: token.into(),
            output: PathBuf::from("quasar_repos.csv"),
            max_pages: None,
            cache_dir: Some(PathBuf::from("github_cache")),
            cache_ttl: Duration::from_secs(3600),
            clear_cache: false,
            filter: None,
            description_width: 80,
            max_retries: 5,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let token = match &args.token {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => return Err(SearchError::config("GitHub token is required (pass --token or set GITHUB_TOKEN)")),
        };

        let config = SearchConfig {
            base_url: args.base_url.clone(),
            endpoint: args.endpoint.clone(),
            query: args.query.clone(),
            per_page: args.per_page,
            sort: args.sort.clone(),
            order: args.order.clone(),
            token,
            output: args.output.clone(),
            max_pages: args.max_pages,
            cache_dir: if args.no_cache { None } else { Some(args.cache_dir.clone()) },
            cache_ttl: Duration::from_secs(args.cache_ttl),
            clear_cache: args.clear_cache,
            filter: args.filter.clone(),
            description_width: args.description_width,
            max_retries: args.max_retries,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(SearchError::config("GitHub token must not be blank"));
        }
        if self.query.trim().is_empty() {
            return Err(SearchError::config("search query must not be empty"));
        }
        if self.per_page == 0 || self.per_page > 100 {
            return Err(SearchError::config(format!("per_page must be between 1 and 100, got {}", self.per_page)));
        }
        if self.description_width < 3 {
            return Err(SearchError::config("description width must be at least 3"));
        }
        Ok(())
    }

    /// Full URL of the search endpoint.
    pub fn search_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.endpoint.starts_with('/') {
            format!("{}{}", base, self.endpoint)
        } else {
            format!("{}/{}", base, self.endpoint)
        }
    }

    /// Query parameters sent with the first page request.
    pub fn search_params(&self) -> Vec<(String, String)> {
        vec![
            ("q".to_string(), self.query.clone()),
            ("per_page".to_string(), self.per_page.to_string()),
            ("sort".to_string(), self.sort.clone()),
            ("order".to_string(), self.order.clone()),
        ]
    }
}
