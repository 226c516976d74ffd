// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use earnings_rs::cache::AnalysisCache;
use earnings_rs::comparator::{CompanyAnalysis, ComparisonKind, QuarterComparison};
use earnings_rs::config::{self, Config, DEFAULT_CONFIG_PATH};
use earnings_rs::db;
use earnings_rs::downloader::{DownloadStatus, Downloader};
use earnings_rs::export;
use earnings_rs::fiscal;
use earnings_rs::models::{DocType, EarningsDocument, Region};
use earnings_rs::service::{DiscoveryReport, EarningsService};
use earnings_rs::sources::{DocumentRequest, SourceRegistry};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config.toml file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List regions with at least one source
    Regions,
    /// Search for a company across sources
    Search {
        query: String,
        /// Region id: india, us, japan, korea or china
        #[arg(long)]
        region: Option<Region>,
    },
    /// Company name suggestions for a prefix
    Suggest {
        prefix: String,
        #[arg(long)]
        region: Option<Region>,
        #[arg(long, default_value = "8")]
        limit: usize,
    },
    /// Discover and deduplicate earnings documents
    Documents {
        /// Company names, brands or tickers
        #[arg(required = true)]
        companies: Vec<String>,
        #[arg(long)]
        region: Option<Region>,
        /// Number of most recent quarters per company (default from config)
        #[arg(long)]
        quarters: Option<usize>,
        /// Document types (comma-separated). Leave empty for all types.
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<DocType>>,
        /// Also export the documents to CSV in the output directory
        #[arg(long)]
        csv: bool,
    },
    /// Discover documents and download them
    Download {
        #[arg(required = true)]
        companies: Vec<String>,
        #[arg(long)]
        region: Option<Region>,
        #[arg(long)]
        quarters: Option<usize>,
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<DocType>>,
        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Store analyses from a JSON file (one object or an array)
    ImportAnalysis { file: PathBuf },
    /// Compare a stored quarter with its QoQ and/or YoY baseline
    Compare {
        company: String,
        /// Quarter label, e.g. Q3FY26 or "Q4 2025"
        #[arg(long)]
        quarter: String,
        #[arg(long, default_value = "india")]
        region: Region,
        /// qoq, yoy or both
        #[arg(long, default_value = "both")]
        kind: String,
    },
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        return init_config(&cli.config, force);
    }

    let config = config::load_config_or_default(&cli.config)?;
    let service = build_service(&config)?;

    match cli.command {
        Commands::Regions => {
            let regions = service.regions();
            if regions.is_empty() {
                println!("⚠️  No sources configured. Add fixture files to {}", cli.config.display());
            }
            for region in regions {
                println!(
                    "{} ({}): fiscal year {}, sources: {}",
                    region.name,
                    region.id,
                    region.fiscal_year.name(),
                    region.sources.join(", ")
                );
            }
        }
        Commands::Search { query, region } => {
            let candidates = service.search_company(&query, region).await;
            if candidates.is_empty() {
                println!("No companies found for '{}'", query);
            }
            for candidate in candidates {
                match candidate.url {
                    Some(url) => println!("{} [{}] {}", candidate.name, candidate.source, url),
                    None => println!("{} [{}]", candidate.name, candidate.source),
                }
            }
        }
        Commands::Suggest {
            prefix,
            region,
            limit,
        } => {
            let mut names: Vec<String> = service.identity().suggest(&prefix, limit);
            for candidate in service.suggest_companies(&prefix, region, limit).await {
                if names.len() >= limit {
                    break;
                }
                if !names.iter().any(|n| n.eq_ignore_ascii_case(&candidate.name)) {
                    names.push(candidate.name);
                }
            }
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Documents {
            companies,
            region,
            quarters,
            types,
            csv,
        } => {
            let request = document_request(&config, quarters, types);
            let reports = service
                .get_earnings_documents_many(&companies, region, &request)
                .await;
            let documents = print_reports(&reports);

            if csv && !documents.is_empty() {
                let path = export::export_documents_csv(&documents, &config.output_dir)?;
                println!("✅ Exported {} documents to {}", documents.len(), path.display());
            }
        }
        Commands::Download {
            companies,
            region,
            quarters,
            types,
            output,
        } => {
            let request = document_request(&config, quarters, types);
            let reports = service
                .get_earnings_documents_many(&companies, region, &request)
                .await;
            let documents = print_reports(&reports);
            if documents.is_empty() {
                return Ok(());
            }

            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            let outcomes = Downloader::new(&config)?
                .with_progress(true)
                .download_all(&documents, &output_dir)
                .await;

            let mut downloaded = 0;
            let mut skipped = 0;
            for outcome in &outcomes {
                match &outcome.status {
                    DownloadStatus::Downloaded { .. } => downloaded += 1,
                    DownloadStatus::Skipped => skipped += 1,
                    DownloadStatus::Failed(reason) => {
                        println!("⚠️  Failed {}: {}", outcome.document.url, reason)
                    }
                }
            }
            println!(
                "✅ Downloaded {}, already present {}, failed {} (into {})",
                downloaded,
                skipped,
                outcomes.len() - downloaded - skipped,
                output_dir.display()
            );
        }
        Commands::ImportAnalysis { file } => {
            let cache = open_cache().await?;
            let analyses = read_analyses(&file)?;
            for mut analysis in analyses {
                match service.identity().match_company(&analysis.company) {
                    Ok(found) => analysis.company = found.name,
                    Err(e) => println!("⚠️  {}; storing under the given name", e),
                }
                cache.save_analysis(&analysis).await?;
                println!("✅ Stored {} {}", analysis.company, analysis.period.label());
            }
        }
        Commands::Compare {
            company,
            quarter,
            region,
            kind,
        } => {
            let cache = open_cache().await?;
            let period = fiscal::normalize(&quarter, None, region.convention())
                .with_context(|| format!("Cannot read quarter '{}'", quarter))?;
            let company = match service.identity().match_company(&company) {
                Ok(found) => found.name,
                Err(e) => {
                    println!("⚠️  {}; using it as given", e);
                    company
                }
            };
            let kinds = match kind.to_lowercase().as_str() {
                "both" => vec![ComparisonKind::Qoq, ComparisonKind::Yoy],
                other => vec![other.parse::<ComparisonKind>()?],
            };

            let comparator = config.comparator();
            for kind in kinds {
                match cache.compare(&comparator, &company, &period, kind).await? {
                    Some(comparison) => print_comparison(&comparison),
                    None => println!(
                        "⚠️  No {} comparison for {} {}: needs analyses for {} and {}",
                        kind.label(),
                        company,
                        period.label(),
                        period.label(),
                        kind.baseline(&period).label()
                    ),
                }
            }
        }
        // written before any config is loaded
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn build_service(config: &Config) -> Result<EarningsService> {
    let registry = SourceRegistry::from_fixtures(config.priority_table(), &config.fixtures)?;
    log::info!("Loaded {} sources", registry.len());
    Ok(
        EarningsService::new(Arc::new(registry), Arc::new(config.identity()))
            .with_timeout(config.request_timeout()),
    )
}

fn document_request(
    config: &Config,
    quarters: Option<usize>,
    types: Option<Vec<DocType>>,
) -> DocumentRequest {
    let count = quarters.unwrap_or(config.quarters_per_company);
    match types {
        Some(types) if !types.is_empty() => DocumentRequest::only(count, types),
        _ => DocumentRequest::new(count),
    }
}

async fn open_cache() -> Result<AnalysisCache> {
    let pool = db::create_db_pool(&db::database_url()).await?;
    Ok(AnalysisCache::new(pool))
}

fn read_analyses(path: &Path) -> Result<Vec<CompanyAnalysis>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let analyses = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(analyses)
}

/// Prints each report and returns all canonical documents in report order.
fn print_reports(reports: &[DiscoveryReport]) -> Vec<EarningsDocument> {
    let mut all = Vec::new();
    for report in reports {
        println!();
        if report.unmatched {
            println!(
                "⚠️  '{}' is not a known company, searching sources as given",
                report.query
            );
        } else if report.company != report.query {
            println!("{} → {}", report.query, report.company);
        }
        for failure in &report.failed_sources {
            println!("⚠️  Source {} failed: {}", failure.source, failure.reason);
        }
        for skipped in &report.skipped {
            println!(
                "⚠️  Skipped {} from {}: {}",
                skipped.document.url, skipped.document.source, skipped.reason
            );
        }

        if report.is_empty() {
            println!("No documents found for {}", report.company);
            continue;
        }

        println!("{} ({} documents):", report.company, report.documents.len());
        for doc in &report.documents {
            println!(
                "  {:<8} {:<16} {:<10} {}",
                doc.period.label(),
                doc.doc_type,
                doc.source,
                doc.url
            );
        }
        all.extend(report.documents.iter().cloned());
    }
    all
}

fn print_comparison(comparison: &QuarterComparison) {
    println!(
        "\n{} {}: {} vs {}",
        comparison.company,
        comparison.kind.label(),
        comparison.current.label(),
        comparison.previous.label()
    );
    for change in &comparison.material_changes {
        println!(
            "  {:<30} {:>12} → {:>12} ({:+.1}%, {:?}, {:?})",
            change.metric_name,
            earnings_rs::utils::format_amount(change.previous_value),
            earnings_rs::utils::format_amount(change.current_value),
            change.change_pct,
            change.significance,
            change.direction
        );
    }
    if !comparison.new_themes.is_empty() {
        println!("  New themes: {}", comparison.new_themes.join(", "));
    }
    if !comparison.dropped_themes.is_empty() {
        println!("  Dropped themes: {}", comparison.dropped_themes.join(", "));
    }
    println!("  {}", comparison.summary);
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, use --force to overwrite", path.display());
    }
    config::save_config(&Config::default(), path)?;
    println!("✅ Wrote default config to {}", path.display());
    Ok(())
}
