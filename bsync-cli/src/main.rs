use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bsync_api::{Api, RateLimit};
use bsync_core::task::{TaskRunner, TimingMode};
use bsync_core::tasks::{FetchPosts, FetchTags};
use bsync_store::Store;
use clap::Parser;
use log::{error, info, LevelFilter};
use tokio::signal::unix::{signal, SignalKind};

mod env;

const DEFAULT_BASE_URL: &str = "https://danbooru.donmai.us";

/// Mirror the tag and post catalogs of an imageboard into PostgreSQL.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// .env file with credentials
    #[arg(short, long, default_value = env::DEFAULT_ENV_FILE)]
    env: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    env::load(&cli.env)?;

    let login = env::require("DANBOORU_LOGIN")?;
    let api_key = env::require("DANBOORU_API_KEY")?;
    let base_url = env::get("DANBOORU_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let rate_limit: usize = env::get_or_default("DANBOORU_RATE_LIMIT", 10)?;

    info!("rate limit: {rate_limit} / s");
    let limiter = Arc::new(RateLimit::new(rate_limit, Duration::from_secs(1)));

    let api = Api::new(login, api_key, base_url, limiter)
        .await
        .context("failed to verify login")?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let mut runner = TaskRunner::new();
    let failed = runner.shutdown_token();

    // Every task owns its own store: the gateway wraps a single database
    // connection.
    runner.spawn(
        "fetch_tags",
        Duration::from_secs(5 * 60),
        TimingMode::PerInvocation,
        FetchTags::new(
            api.clone(),
            Store::connect()
                .await
                .context("failed to connect to PostgreSQL")?,
        ),
    );
    runner.spawn(
        "fetch_posts",
        Duration::from_secs(60),
        TimingMode::PerInvocation,
        FetchPosts::new(
            api,
            Store::connect()
                .await
                .context("failed to connect to PostgreSQL")?,
        ),
    );

    let fatal = tokio::select! {
        _ = sigint.recv() => false,
        _ = sigterm.recv() => false,
        () = failed.cancelled() => true,
    };

    if fatal {
        error!("task failed, closing tasks");
    } else {
        info!("signal received, closing tasks");
    }

    runner.shutdown().await;

    Ok(if fatal {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
