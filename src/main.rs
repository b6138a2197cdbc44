use clap::Parser;
use dotenv::dotenv;
use std::process::ExitCode;
use tracing::{error, info};

use github_search_lib::logger::init_logger;
use github_search_lib::{Args, GitHubSearcher, Result, SearchConfig, SearchSummary};

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads env fallbacks
    dotenv().ok();

    let args = Args::parse();
    init_logger(args.verbose);

    match run(&args).await {
        Ok(summary) => {
            info!(
                "Fetched {} of {} repositories over {} pages, wrote {} rows",
                summary.fetched, summary.total_count, summary.pages, summary.written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Search failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<SearchSummary> {
    let config = SearchConfig::from_args(args)?;
    GitHubSearcher::new(config)?.run().await
}
