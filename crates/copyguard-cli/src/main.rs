use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use copyguard_api::dailymotion::DailymotionClient;
use copyguard_core::catalog::{import_sheet_exports, SheetExports};
use copyguard_core::config::AppConfig;
use copyguard_core::keywords::build_series_keywords;
use copyguard_core::models::Catalog;
use copyguard_runtime::Runtime;

/// Finds pirated re-uploads of catalog titles and tracks their takedown.
#[derive(Parser)]
#[command(name = "copyguard", version)]
struct Cli {
    /// User config file (TOML), merged over the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog JSON from CSV exports of the title workbook.
    Import {
        /// Owned-title sheet (剧名 / 上线剧名 / 别名 …).
        #[arg(long)]
        titles: Option<PathBuf>,
        /// Multilingual title sheet joined on the English title.
        #[arg(long)]
        multilingual: Option<PathBuf>,
        /// Per-language sheet joined on the original title.
        #[arg(long)]
        base_titles: Option<PathBuf>,
        /// Whitelisted owner channels.
        #[arg(long)]
        whitelist: Option<PathBuf>,
        /// Output path; defaults to `general.data_path`.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the search keywords of every catalog entry.
    Keywords {
        /// Only these series ids.
        #[arg(long = "series")]
        series_ids: Vec<String>,
        /// Append episode markers to each entry's anchor alias.
        #[arg(long)]
        ep_patterns: bool,
    },

    /// Search the platform, score candidates and store new detections.
    Detect {
        /// Only these series ids (overrides `search.series_ids`).
        #[arg(long = "series")]
        series_ids: Vec<String>,
        /// Run date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Re-query the status of tracked videos and write the status sheet.
    Recheck {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Write the daily new-detections and tracking sheets.
    Report {
        /// Report date (YYYY-MM-DD); defaults to today.
        date: Option<NaiveDate>,
    },

    /// Exclude the videos listed in a CSV from rechecks and reports.
    Ignore {
        csv: PathBuf,
        #[arg(long, default_value = "dailymotion")]
        platform: String,
        #[arg(long, default_value = "ignore_list")]
        reason: String,
        /// Only count the ids; change nothing.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("loading configuration")?;

    let _log_guard = init_logging(config.general.log_dir.as_deref());

    match cli.command {
        Commands::Import {
            titles,
            multilingual,
            base_titles,
            whitelist,
            output,
        } => {
            let source_file = titles
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned());
            let exports = SheetExports {
                titles,
                multilingual,
                base_titles,
                whitelist,
            };
            let catalog = import_sheet_exports(&exports, source_file)?;
            let output = output.unwrap_or_else(|| config.general.data_path.clone());
            catalog
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "{} series, {} aliases, {} whitelisted channels → {}",
                catalog.series.len(),
                catalog.aliases.len(),
                catalog.whitelist.len(),
                output.display()
            );
        }

        Commands::Keywords {
            series_ids,
            ep_patterns,
        } => {
            let path = &config.general.data_path;
            let catalog = Catalog::load(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            let mut keyword_config = config.keywords.clone();
            keyword_config.include_ep_patterns |= ep_patterns;

            let mut plan = build_series_keywords(&catalog, &keyword_config);
            plan.retain_series(&series_ids);
            let titles = catalog.titles_by_series();
            for series in &plan.series {
                let title = titles.get(series.series_id.as_str()).copied().unwrap_or("");
                println!("{}\t{}", series.series_id, title);
                for term in &series.search_terms {
                    println!("    {term}");
                }
            }
        }

        Commands::Detect { series_ids, date } => {
            let mut config = config;
            if !series_ids.is_empty() {
                config.search.series_ids = series_ids;
            }
            let client = platform_client(&config)?;
            let runtime = Runtime::new(config)?;
            let catalog = runtime.load_catalog()?;
            let summary = runtime
                .detect(&client, &catalog, date.unwrap_or_else(today))
                .await?;
            print_summary(&summary)?;
        }

        Commands::Recheck { date } => {
            let client = platform_client(&config)?;
            let runtime = Runtime::new(config)?;
            let summary = runtime.recheck(&client, date.unwrap_or_else(today)).await?;
            print_summary(&summary)?;
        }

        Commands::Report { date } => {
            let runtime = Runtime::new(config)?;
            let summary = runtime.report(date.unwrap_or_else(today)).await?;
            print_summary(&summary)?;
        }

        Commands::Ignore {
            csv,
            platform,
            reason,
            dry_run,
        } => {
            let runtime = Runtime::new(config)?;
            let summary = runtime
                .apply_ignore_list(&csv, &platform, &reason, dry_run)
                .await?;
            print_summary(&summary)?;
        }
    }

    Ok(())
}

/// Console logging filtered by `RUST_LOG` (default `copyguard=info`), plus a
/// daily file under `log_dir` when configured.
fn init_logging(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("copyguard=info"));
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "copyguard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

fn platform_client(config: &AppConfig) -> anyhow::Result<DailymotionClient> {
    Ok(DailymotionClient::new()?
        .with_page_size(config.search.effective_page_size())
        .with_page_delay(Duration::from_millis(config.search.sleep_ms)))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn print_summary<T: serde::Serialize>(summary: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
