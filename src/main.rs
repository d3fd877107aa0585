use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use charitygate::validation::SearchArgs;
use charitygate::{
    protocol, telemetry, CharityGateway, GatewayConfig, SlidingWindowLimiter,
    UpstreamClient,
};

#[derive(Debug, Parser)]
#[command(name = "charitygate", version, about = "Gateway to a charity registry API")]
struct Cli {
    /// Optional configuration file; environment variables override it.
    #[arg(long, env = "CHARITYGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve JSON-lines tool requests on stdin/stdout.
    Serve,
    /// Look up an organization by EIN.
    Lookup { ein: String },
    /// Check whether an EIN is a public charity.
    Check { ein: String },
    /// Search organizations.
    Search {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// List organizations changed since a date (YYYY-MM-DD) or RFC 3339 timestamp.
    List { since: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    telemetry::init();
    let cli = Cli::parse();

    let config = GatewayConfig::load(cli.config.as_deref())?;
    info!(upstream = %config.upstream.base_url, "configuration loaded");

    let client = Arc::new(UpstreamClient::new(&config.upstream)?);
    let limiter = Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit));
    let gateway = CharityGateway::new(client, limiter);

    let outcome = match cli.command {
        Command::Serve => {
            info!("serving tool requests on stdio");
            protocol::serve(
                &gateway,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                config.rate_limit.sweep_interval(),
            )
            .await?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Lookup { ein } => gateway.lookup_charity(&ein).await,
        Command::Check { ein } => gateway.check_public_charity(&ein).await,
        Command::Search { query, city, state, limit, offset } => {
            gateway.search_charities(&SearchArgs { query, city, state, limit, offset }).await
        }
        Command::List { since } => gateway.list_organizations(&since).await,
    };

    match outcome {
        Ok(text) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("{}", gateway.describe_error(&error));
            Ok(ExitCode::FAILURE)
        }
    }
}
