mod browser;
mod config;
mod crawl;
mod document;
mod export;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use browser::chromium::ChromiumSession;
use config::Settings;
use crawl::Crawler;

#[derive(Parser)]
#[command(name = "insights_crawler", about = "Insight article crawler for filterable listings")]
struct Cli {
    /// Settings file (TOML); missing file means built-in defaults
    #[arg(short, long, global = true, default_value = "insights.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every filter combination and export the documents
    Run {
        /// Max articles per filter combination
        #[arg(short = 'n', long)]
        max_documents: Option<usize>,
        /// Listing page to start from
        #[arg(long)]
        host: Option<String>,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
        #[arg(long, default_value = "backup/documents.backup.json")]
        archive: PathBuf,
        #[arg(long, default_value = "out/documents.csv")]
        csv: PathBuf,
    },
    /// Print the filter combinations in crawl order
    Combinations,
    /// Print the documents stored in an archive
    Show {
        #[arg(long, default_value = "backup/documents.backup.json")]
        archive: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    match cli.command {
        Commands::Combinations => {
            settings.validate()?;
            let combos = crawl::combinations(&settings.filters);
            for (i, c) in combos.iter().enumerate() {
                println!("{:>3} | {}", i + 1, c.values().collect::<Vec<_>>().join(" / "));
            }
            println!("\n{} combinations, up to {} articles each", combos.len(), settings.max_documents);
        }
        Commands::Run {
            max_documents,
            host,
            headful,
            archive,
            csv,
        } => {
            if let Some(n) = max_documents {
                settings.max_documents = n;
            }
            if let Some(h) = host {
                settings.host = h;
            }
            if headful {
                settings.browser.headless = false;
            }
            settings.validate()?;

            info!("Set source: {}", settings.host);
            let session = ChromiumSession::launch(&settings.browser, settings.timeouts.page_load()).await?;
            let mut crawler = Crawler::new(session, settings).with_progress(std::io::stderr().is_terminal());
            crawler.run().await;
            crawler.close().await;

            let stats = crawler.stats().clone();
            let docs = crawler.documents();

            let report = export::write_all(&archive, &csv, docs);
            if let Err(e) = &report.archive {
                error!("Archive not written: {:#}", e);
                eprintln!("{:#}", e);
            }
            if let Err(e) = &report.table {
                error!("CSV not written: {:#}", e);
                eprintln!("{:#}", e);
            }

            for doc in docs {
                println!("{}\n", doc);
            }
            println!(
                "Done: {} combinations, {} tiles, {} documents ({} skipped).",
                stats.combinations, stats.harvested, stats.extracted, stats.skipped
            );
        }
        Commands::Show { archive } => {
            let docs = export::read_archive(&archive)?;
            for doc in &docs {
                println!("{}\n", doc);
            }
            println!("{} documents in {}", docs.len(), archive.display());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
