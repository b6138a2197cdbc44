//! # GitHub Search
//!
//! A Rust library for searching GitHub repositories. It follows the search
//! API's pagination to the last page, waits out rate limits, replays
//! responses from a local cache and exports the results to CSV.
//!
//! ## Main Components
//!
//! - [`GitHubSearcher`]: Runs a search end to end and writes the report
//! - [`GitHubClient`]: Authenticated, rate-limit aware HTTP client backed by [`ResponseCache`]
//! - [`Args`]: Command line argument structure, with environment variable fallbacks
//! - [`SearchConfig`]: Validated settings built from [`Args`]
//!
//! ## Example
//!
//! ```no_run
//! use github_search_lib::{GitHubSearcher, SearchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut config = SearchConfig::new(std::env::var("GITHUB_TOKEN")?);
//!     config.query = "tokio in:topics language:rust".to_string();
//!     config.max_pages = Some(2);
//!
//!     let summary = GitHubSearcher::new(config)?.run().await?;
//!     println!("{} repositories written to {}", summary.written, summary.output.display());
//!
//!     Ok(())
//! }
//! ```

mod args;
pub mod cache;
pub mod client;
mod config;
mod error;
pub mod filter;
mod github_searcher;
pub mod logger;
pub mod model;
pub mod pagination;
pub mod report;

// Re-export main components for documentation and external use
pub use crate::args::Args;
pub use crate::cache::{CachedResponse, ResponseCache};
pub use crate::client::{ApiResponse, GitHubClient};
pub use crate::config::SearchConfig;
pub use crate::error::{Result, SearchError};
pub use crate::github_searcher::{GitHubSearcher, SearchSummary};
pub use crate::model::{Repository, SearchPage};
