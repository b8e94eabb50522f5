use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod classify;
mod config;
mod db;
mod error;
mod export;
mod filter;
mod ingest;
mod insights;
mod llm;
mod models;
mod pipeline;
mod report;
mod stats;
mod store;

use config::{LlmConfig, MarketContext};
use filter::{DateRange, ReviewQuery};
use insights::{RecommendationRequest, SwotRequest};
use llm::LlmClient;
use store::{Dataset, DatasetStore};

#[derive(Parser)]
#[command(name = "review-insights")]
#[command(about = "Classify app-store reviews and report on sentiment and themes", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import a review CSV export, classify it and replace the stored dataset
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Store default labels without calling the classifier
        #[arg(long)]
        skip_classification: bool,
        #[command(flatten)]
        llm: LlmConfig,
    },
    /// Print aggregate statistics for the stored dataset
    Stats {
        #[arg(long, value_enum, default_value_t = DateRange::All)]
        range: DateRange,
    },
    /// Export the stored reviews as CSV
    Export {
        #[arg(long, value_enum, default_value_t = DateRange::All)]
        range: DateRange,
        #[command(flatten)]
        query: ReviewQuery,
        #[arg(long, default_value = "reviews.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_enum, default_value_t = DateRange::All)]
        range: DateRange,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value = "Mobile Banking App")]
        app_name: String,
        /// Ask the LLM for a SWOT analysis and recommendations
        #[arg(long)]
        with_insights: bool,
        #[command(flatten)]
        llm: LlmConfig,
        #[command(flatten)]
        market: MarketContext,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import {
            csv,
            skip_classification,
            llm,
        } => {
            let file = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let source_name = csv
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| csv.display().to_string());

            let client = if skip_classification {
                None
            } else {
                Some(LlmClient::new(llm.clone())?)
            };

            let lock = db::try_lock_upload(&pool).await?;
            let store = DatasetStore::new();
            let summary = pipeline::upload(
                &store,
                &pool,
                &source_name,
                file,
                client.as_ref(),
                llm.timeout(),
            )
            .await?;
            lock.release().await?;

            println!(
                "Imported {} reviews from {} ({}, {}).",
                summary.stored,
                csv.display(),
                summary.layout.label(),
                summary.dataset.status.as_str()
            );
            if let Some(error) = summary.classification_error {
                println!("Classification unavailable, default labels kept: {error}");
            }
        }
        Commands::Stats { range } => {
            let dataset = load_current(&pool).await?;
            let reviews = filter::filter_by_range(&dataset.reviews, range);
            let stats = stats::aggregate(&reviews);

            println!(
                "Dataset {} ({}), {}: {}",
                dataset.source_name,
                dataset.status.as_str(),
                range.label(),
                stats.review_duration
            );
            println!("Total reviews: {}", stats.total);
            println!("Average rating: {}", stats.average_rating);
            println!(
                "Sentiment: {} positive ({}%), {} negative ({}%), {} neutral ({}%)",
                stats.positive,
                stats.positive_percent,
                stats.negative,
                stats.negative_percent,
                stats.neutral,
                stats.neutral_percent
            );
            for (stars, count) in stats.star_counts.iter().rev() {
                println!("{stars} star reviews: {count}");
            }
            println!(
                "Lowest rated day: {} ({})",
                stats.worst_day.date, stats.worst_day.rating
            );
            println!("Top themes:");
            for mention in &stats.themes {
                println!("- {}: {} mentions", mention.theme, mention.mentions);
            }
        }
        Commands::Export { range, query, out } => {
            let dataset = load_current(&pool).await?;
            let reviews = query.apply(&filter::filter_by_range(&dataset.reviews, range));
            let file = File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::write_reviews(file, &reviews)?;
            println!("Exported {} reviews to {}.", reviews.len(), out.display());
        }
        Commands::Report {
            range,
            out,
            app_name,
            with_insights,
            llm,
            market,
        } => {
            let dataset = load_current(&pool).await?;
            let reviews = filter::filter_by_range(&dataset.reviews, range);

            let insights = if with_insights {
                let client = LlmClient::new(llm)?;
                generate_insights(&client, &reviews, &market).await
            } else {
                report::ReportInsights::default()
            };

            let report = report::build_report(&app_name, range, &reviews, &insights);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn load_current(pool: &sqlx::PgPool) -> anyhow::Result<Arc<Dataset>> {
    db::open_store(pool)
        .await?
        .snapshot()
        .context("no reviews imported yet; run `import --csv <file>` first")
}

/// SWOT first, then recommendations from its weaknesses. Either step may fail
/// without stopping the report.
async fn generate_insights(
    client: &LlmClient,
    reviews: &[models::Review],
    market: &MarketContext,
) -> report::ReportInsights {
    let mut insights = report::ReportInsights::default();

    let swot_request = SwotRequest::from_reviews(reviews, market);
    let swot = match client.swot_analysis(&swot_request).await {
        Ok(swot) => swot,
        Err(error) => {
            tracing::warn!(%error, "SWOT analysis failed");
            return insights;
        }
    };

    match RecommendationRequest::from_swot(&swot, reviews) {
        Some(request) => match client.recommendations(&request).await {
            Ok(result) => insights.recommendations = Some(result.recommendations),
            Err(error) => tracing::warn!(%error, "recommendations failed"),
        },
        None => tracing::warn!("SWOT analysis found no weaknesses; skipping recommendations"),
    }

    insights.swot = Some(swot);
    insights
}
