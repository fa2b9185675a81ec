mod report;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use comment_analyzer::{AnalyzerConfig, CommentAnalyzer, VideoAnalysisService};
use llm_interface::OpenAiProvider;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tubesense_core::{AppConfig, CommentOrder, CoreError, ErrorExt, ErrorReporter, VideoAnalysis};
use youtube_client::YouTubeApiClient;

const DEFAULT_LOG_FILTER: &str =
    "tubesense=info,comment_analyzer=info,youtube_client=info,llm_interface=info,tubesense_core=info";
const VERBOSE_LOG_FILTER: &str =
    "tubesense=debug,comment_analyzer=debug,youtube_client=debug,llm_interface=debug,tubesense_core=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Order {
    Relevance,
    Time,
}

impl From<Order> for CommentOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Relevance => CommentOrder::Relevance,
            Order::Time => CommentOrder::Time,
        }
    }
}

/// Sentiment and topic report for the comments of a YouTube video.
#[derive(Debug, Parser)]
#[command(name = "tubesense", version)]
struct Cli {
    /// Video link or bare 11-character video id
    link: String,

    /// Report language (en, ru); defaults to DEFAULT_LANGUAGE
    #[arg(short, long)]
    language: Option<String>,

    /// Number of comments to fetch (1-100); defaults to MAX_COMMENTS
    #[arg(short = 'n', long)]
    max_comments: Option<u32>,

    #[arg(long, value_enum, default_value_t = Order::Relevance)]
    order: Order,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// TOML settings file; environment variables take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<VideoAnalysis, CoreError> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env()?,
    };

    let timeout = config.request_timeout();
    let fetcher = YouTubeApiClient::new(config.youtube_api_key.clone(), config.max_comments, timeout)?
        .with_base_url(&config.youtube_api_base_url);
    let provider = OpenAiProvider::new(config.openai_api_key.clone(), timeout)?
        .with_base_url(&config.openai_api_base_url);

    let analyzer = CommentAnalyzer::new(provider, AnalyzerConfig::from_app_config(&config));
    let mut service = VideoAnalysisService::new(fetcher, analyzer).with_order(cli.order.into());
    if let Some(max_comments) = cli.max_comments {
        service = service.with_max_comments(max_comments);
    }

    let language = cli
        .language
        .as_deref()
        .unwrap_or(config.default_language.as_str());

    service.analyze_video(&cli.link, language).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::info!("Starting Tubesense");

    let analysis = match run(&cli).await {
        Ok(analysis) => analysis,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            eprintln!("{}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&analysis)
                .context("failed to serialize the report")?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", report::render_text_report(&analysis)),
    }

    Ok(())
}
