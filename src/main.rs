use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

mod analytics;
mod buckets;
mod chart;
mod db;
mod logging;
mod models;
mod report;
mod source;

use analytics::{ReportOptions, WeeklyAnalyticsReport};
use chart::{JsonSurface, MarkdownSurface};
use models::SessionDataset;

#[derive(Parser)]
#[command(name = "weekly-engagement-report")]
#[command(about = "Weekly session and engagement reporting", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DatasetArgs {
    /// Read sessions from a CSV export instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Only sessions that logged in on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Sort sessions by login time before reporting
    #[arg(long)]
    sort_by_login: bool,
    /// Keep the final week in variation and bug series
    #[arg(long)]
    keep_trailing_week: bool,
}

impl DatasetArgs {
    fn options(&self) -> ReportOptions {
        ReportOptions {
            trim_trailing_week: !self.keep_trailing_week,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small demo session table
    Seed,
    /// Import sessions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Render every chart of the weekly report
    Report {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print week-over-week engagement variation
    Variation {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance holding session data")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_dataset(args: &DatasetArgs) -> anyhow::Result<SessionDataset> {
    let dataset = match &args.csv {
        Some(path) => {
            let dataset = source::load_csv(path)?;
            match args.since {
                Some(since) => SessionDataset::new(
                    dataset
                        .records()
                        .iter()
                        .filter(|record| record.login_day() >= since)
                        .cloned()
                        .collect(),
                ),
                None => dataset,
            }
        }
        None => db::fetch_sessions(&connect().await?, args.since).await?,
    };

    if dataset.is_empty() {
        warn!("no sessions matched; charts will be empty");
    }
    if args.sort_by_login {
        Ok(dataset.sorted_by_login())
    } else {
        Ok(dataset)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&connect().await?).await?;
            println!("Seeded {inserted} sessions.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&connect().await?, &csv).await?;
            println!("Inserted {inserted} sessions from {}.", csv.display());
        }
        Commands::Report {
            dataset,
            format,
            out,
        } => {
            let data = load_dataset(&dataset).await?;
            let weekly = WeeklyAnalyticsReport::with_options(&data, dataset.options());

            let rendered = match format {
                Format::Markdown => {
                    let mut surface = MarkdownSurface::new("Weekly Engagement Report");
                    report::render_all(&weekly, &mut surface)?;
                    surface.into_string()
                }
                Format::Json => {
                    let mut surface = JsonSurface::new();
                    report::render_all(&weekly, &mut surface)?;
                    info!(charts = surface.charts().len(), "collected charts as JSON");
                    surface.to_json()?
                }
            };
            std::fs::write(&out, rendered)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(sessions = data.len(), out = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
        Commands::Variation { dataset, json } => {
            let data = load_dataset(&dataset).await?;
            let rows = WeeklyAnalyticsReport::with_options(&data, dataset.options())
                .percent_variation();

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("Not enough weeks for a variation.");
                return Ok(());
            }

            println!("Week-over-week engagement variation:");
            for row in rows.iter() {
                println!(
                    "- week of {} (closing {}): projects {:.2}%, likes {:.2}%, comments {:.2}%",
                    buckets::week_opening(row.week),
                    row.week,
                    row.projects * 100.0,
                    row.likes * 100.0,
                    row.comments * 100.0
                );
            }
        }
    }

    Ok(())
}
