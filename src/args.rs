use clap::Parser;
use std::path::PathBuf;

/// GitHub repository search CLI that pages through every result, caches
/// responses on disk and exports the repositories to CSV.
#[derive(Parser, Debug, Clone)]
#[clap(
    author,
    version,
    about,
    long_about = "Runs a GitHub search query, follows pagination to the last page while respecting rate limits, \
                  caches responses locally and writes the repositories sorted by stars to a CSV file."
)]
pub struct Args {
    /// Search query, using GitHub's search qualifiers.
    #[clap(short, long, env = "QUERY", default_value = "quasar OR quasar-framework in:topics")]
    pub query: String,

    /// Search endpoint path, relative to the API base URL.
    #[clap(long, env = "ENDPOINT", default_value = "/search/repositories")]
    pub endpoint: String,

    /// GitHub API base URL.
    #[clap(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub base_url: String,

    /// Results per page (GitHub caps this at 100).
    #[clap(long, env = "PER_PAGE", default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub per_page: u32,

    /// Field GitHub sorts the results by.
    #[clap(long, env = "SORT", default_value = "stars")]
    pub sort: String,

    /// Sort direction requested from GitHub.
    #[clap(long, env = "ORDER", default_value = "desc")]
    pub order: String,

    /// Output file path for the CSV report.
    #[clap(short, long, env = "CSV_FILE", default_value = "quasar_repos.csv")]
    pub output: PathBuf,

    /// GitHub API token for authentication.
    #[clap(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum number of pages to retrieve.
    #[clap(short = 'p', long, value_name = "NUM")]
    pub max_pages: Option<u32>,

    /// Directory holding cached API responses.
    #[clap(long, env = "CACHE_DIR", default_value = "github_cache")]
    pub cache_dir: PathBuf,

    /// Seconds a cached response stays fresh.
    #[clap(long, env = "CACHE_TTL", default_value_t = 3600, value_name = "SECS")]
    pub cache_ttl: u64,

    /// Bypass the response cache entirely.
    #[clap(long)]
    pub no_cache: bool,

    /// Remove every cached response before searching.
    #[clap(long)]
    pub clear_cache: bool,

    /// JSONPath expression selecting which raw items are kept,
    /// e.g. "$[?(@.language == 'Rust')]".
    #[clap(short, long, env = "FILTER", value_name = "JSONPATH")]
    pub filter: Option<String>,

    /// Maximum description length in the CSV.
    #[clap(long, default_value_t = 80, value_name = "CHARS")]
    pub description_width: usize,

    /// How many times a rate-limited request is retried.
    #[clap(long, default_value_t = 5)]
    pub max_retries: u32,

    /// Enable debug logging.
    #[clap(short, long)]
    pub verbose: bool,
}
