//! CLI entry point for the Selling Partner Feeds tool.
//!
//! Resolves credentials for an account and drives the Feeds API: listing,
//! inspecting and cancelling feeds, submitting feed content and downloading
//! processing reports.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sp_api_feeds::credentials::{APP_NAME, ConfigFile, CredentialResolver, ProcessEnv};
use sp_api_feeds::services::feeds_api::{FeedsApi, GetFeedsQuery, ProcessingStatus};
use sp_api_feeds::{Marketplace, SellingPartnerClient, SubmitFeedOptions};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "sp-feeds")]
#[command(about = "Submit and inspect Selling Partner API feeds", long_about = None)]
struct Cli {
    /// Account name used to look up credentials
    #[arg(short, long, global = true, default_value = "default")]
    account: String,

    /// Marketplace to operate on (US, DE, JP, ...)
    #[arg(short, long, global = true, default_value_t = Marketplace::US)]
    marketplace: Marketplace,

    /// Use the regional sandbox endpoint
    #[arg(long, global = true, default_value_t = false)]
    sandbox: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve credentials for the account and print a redacted summary
    Credentials,
    /// List the accounts configured in credentials.yml
    Accounts,
    /// List feeds by type, or continue a previous listing
    ListFeeds {
        /// Feed type to include; repeat for several
        #[arg(short = 't', long = "feed-type")]
        feed_types: Vec<String>,

        /// Processing status to include (DONE, IN_QUEUE, ...); repeat for several
        #[arg(short, long = "status", value_parser = parse_status)]
        statuses: Vec<ProcessingStatus>,

        #[arg(long)]
        page_size: Option<u32>,

        /// Only feeds created at or after this time (RFC 3339)
        #[arg(long)]
        created_since: Option<DateTime<Utc>>,

        /// Only feeds created before this time (RFC 3339)
        #[arg(long)]
        created_until: Option<DateTime<Utc>>,

        /// Token from a previous page; other filters are ignored
        #[arg(long)]
        next_token: Option<String>,
    },
    /// Show a single feed
    GetFeed {
        #[arg(value_name = "FEED_ID")]
        feed_id: String,
    },
    /// Cancel a feed that is still queued
    CancelFeed {
        #[arg(value_name = "FEED_ID")]
        feed_id: String,
    },
    /// Upload a file as a feed document and create the feed
    SubmitFeed {
        /// Feed type, e.g. POST_INVENTORY_AVAILABILITY_DATA
        #[arg(short = 't', long)]
        feed_type: String,

        /// File holding the feed content
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value = "text/tsv")]
        content_type: String,

        /// Marketplace ids; defaults to the selected marketplace
        #[arg(long = "marketplace-id")]
        marketplace_ids: Vec<String>,

        /// Feed option as KEY=VALUE; repeat for several
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },
    /// Download a feed document such as a processing report
    DownloadDocument {
        #[arg(value_name = "FEED_DOCUMENT_ID")]
        feed_document_id: String,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_status(s: &str) -> Result<ProcessingStatus, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_uppercase()))
        .map_err(|_| format!("unknown processing status '{s}'"))
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("SP_API_LOG_FILE").unwrap_or_else(|_| "logs/sp_feeds.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("sp_feeds.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Credentials => {
            let resolver = CredentialResolver::from_environment(&cli.account).await?;
            let creds = resolver.credentials();
            print_json(&serde_json::json!({
                "account": resolver.account(),
                "lwa_app_id": creds.lwa_app_id,
                "aws_access_key": creds.aws_access_key,
                "refresh_token": creds.refresh_token.as_ref().map(|_| "***"),
                "role_arn": creds.role_arn,
                "use_instance_profile": creds.use_instance_profile,
            }))?;
        }
        Commands::Accounts => {
            let file = ConfigFile::open_named(APP_NAME, &ProcessEnv)?;
            info!(path = %file.path().display(), "Config file loaded");
            for account in file.accounts() {
                println!("{account}");
            }
        }
        Commands::ListFeeds {
            feed_types,
            statuses,
            page_size,
            created_since,
            created_until,
            next_token,
        } => {
            let query = match next_token {
                Some(token) => GetFeedsQuery::next_page(token),
                None if feed_types.is_empty() => {
                    bail!("at least one --feed-type is required unless --next-token is given")
                }
                None => GetFeedsQuery {
                    marketplace_ids: vec![cli.marketplace.id().to_string()],
                    processing_statuses: statuses,
                    page_size,
                    created_since,
                    created_until,
                    ..GetFeedsQuery::feed_types(feed_types)
                },
            };

            let client = connect(&cli.account, cli.marketplace, cli.sandbox).await?;
            let response = client.get_feeds(&query).await?;
            info!(
                feeds = response.payload.feeds.len(),
                rate_limit = ?response.rate_limit,
                "Feeds listed"
            );
            print_json(&response.payload)?;
        }
        Commands::GetFeed { feed_id } => {
            let client = connect(&cli.account, cli.marketplace, cli.sandbox).await?;
            let feed = client.get_feed(&feed_id).await?.payload;
            print_json(&feed)?;
        }
        Commands::CancelFeed { feed_id } => {
            let client = connect(&cli.account, cli.marketplace, cli.sandbox).await?;
            let response = client.cancel_feed(&feed_id).await?;
            info!(feed_id = %feed_id, request_id = ?response.request_id, "Feed cancelled");
        }
        Commands::SubmitFeed {
            feed_type,
            file,
            content_type,
            marketplace_ids,
            options,
        } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            if content.is_empty() {
                warn!(file = %file.display(), "Submitting an empty feed document");
            }

            let options = SubmitFeedOptions {
                marketplace_ids,
                feed_options: (!options.is_empty())
                    .then(|| options.into_iter().collect::<BTreeMap<_, _>>()),
            };

            let client = connect(&cli.account, cli.marketplace, cli.sandbox).await?;
            let (document, feed) = client
                .submit_feed(&feed_type, content, &content_type, options)
                .await?;
            print_json(&serde_json::json!({
                "feedId": feed.payload.feed_id,
                "feedDocumentId": document.feed_document_id,
            }))?;
        }
        Commands::DownloadDocument {
            feed_document_id,
            output,
        } => {
            let client = connect(&cli.account, cli.marketplace, cli.sandbox).await?;
            let content = client.download_feed_document(&feed_document_id).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), bytes = content.len(), "Document saved");
                }
                None => std::io::stdout().write_all(&content)?,
            }
        }
    }

    Ok(())
}

/// Resolves credentials for `account` and builds a client for `marketplace`.
#[tracing::instrument(skip(marketplace), fields(marketplace = %marketplace))]
async fn connect(
    account: &str,
    marketplace: Marketplace,
    sandbox: bool,
) -> Result<SellingPartnerClient> {
    let client = SellingPartnerClient::for_account(account, marketplace).await?;
    let client = if sandbox { client.sandbox()? } else { client };
    info!(endpoint = %client.endpoint(), "Client ready");
    Ok(client)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
