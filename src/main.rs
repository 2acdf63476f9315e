use std::fs;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Instrument};

use skylark_bi::app::normalize_use_case::NormalizeUseCase;
use skylark_bi::app::ports::NormalizeOutputPort;
use skylark_bi::app::query_use_case::QueryUseCase;
use skylark_bi::config::AppConfig;
use skylark_bi::constants;
use skylark_bi::infra::monday_client::MondayClient;
use skylark_bi::infra::normalize_output_adapter::FileNormalizeOutputAdapter;
use skylark_bi::pipeline::dataset::NormalizedDataset;
use skylark_bi::pipeline::processing::normalize::{DatasetSchema, RawRow, RecordNormalizer};
use skylark_bi::{logging, observability};

#[derive(Parser)]
#[command(name = "skylark")]
#[command(about = "Sync, sanitize and query monday.com board data")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML file with [monday], [sanity] and [columns] sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: String,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    metrics_listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch boards from monday.com and normalize them
    Sync {
        /// Datasets to sync (comma-separated). Available: deals, work_orders
        #[arg(long)]
        datasets: Option<String>,
        /// Output directory for records and reports
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
    /// Normalize a local JSON array of raw rows
    Normalize {
        /// JSON file holding an array of objects
        #[arg(long)]
        input: PathBuf,
        /// Dataset label used for output file names
        #[arg(long, default_value = constants::DEALS_DATASET)]
        label: String,
        /// Output directory for records and reports
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
    /// Evaluate an analysis plan against synced records
    Query {
        /// Plan file, or `-` for stdin
        #[arg(long)]
        plan: String,
        /// Directory holding synced records
        #[arg(long, default_value = "output")]
        data: PathBuf,
    },
}

fn parse_datasets(list: Option<String>) -> Vec<String> {
    match list {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => constants::get_supported_datasets()
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

fn print_dataset(dataset: &NormalizedDataset) {
    let report = &dataset.report;
    println!("\n📊 Normalization results for {}:", report.dataset);
    println!("   Rows: {}", report.rows);
    println!("   Fields corrected: {}", report.fields_corrected);
    println!("     Unparseable: {}", report.unparseable);
    println!("     Magnitude sanity violations: {}", report.sanity_violations);
    println!("   Dropped columns: {}", report.dropped_columns);

    if report.flagged() > 0 {
        println!("\n⚠️  Flagged rows:");
        for audit in dataset.flagged_audits() {
            let corrections: Vec<String> = audit
                .corrections
                .iter()
                .map(|c| format!("{} ({})", c.column, c.reason))
                .collect();
            println!(
                "   - row {}: corrected [{}] dropped [{}]",
                audit.row_index,
                corrections.join(", "),
                audit.dropped_columns.join(", ")
            );
        }
    }
}

async fn run_sync(config: &AppConfig, datasets: Vec<String>, output: &Path) -> Result<()> {
    let mut failures = 0;

    for label in datasets {
        let span = tracing::info_span!("sync", dataset = %label);

        let board_id = match config.board_id(&label) {
            Ok(id) => id.to_string(),
            Err(e) => {
                span.in_scope(|| warn!("Skipping dataset: {}", e));
                println!("⚠️  Skipping {}: {}", label, e);
                failures += 1;
                continue;
            }
        };

        let use_case = NormalizeUseCase::new(
            Box::new(MondayClient::new(&config.monday)?),
            Box::new(FileNormalizeOutputAdapter::new(output)?),
            config.sanity.clone(),
        )
        .with_columns(config.columns.keywords.clone(), config.columns.hints.clone());

        match use_case.run(&label, &board_id).instrument(span.clone()).await {
            Ok(dataset) => print_dataset(&dataset),
            Err(e) => {
                span.in_scope(|| error!("Sync failed: {:#}", e));
                println!("❌ Sync failed for {}: {:#}", label, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} dataset(s) failed to sync", failures);
    }
    Ok(())
}

async fn run_normalize(config: &AppConfig, input: &Path, label: &str, output: &Path) -> Result<()> {
    let content = fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let rows: Vec<RawRow> = serde_json::from_str(&content).context("input must be a JSON array of objects")?;

    // Column order follows first appearance across rows
    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        for column in row.columns() {
            if !headers.iter().any(|h| h == column) {
                headers.push(column.to_string());
            }
        }
    }

    let schema = DatasetSchema::infer(&headers, &config.columns.keywords).with_overrides(&config.columns.hints);
    let normalizer = RecordNormalizer::new(schema, config.sanity.clone())?;
    let dataset = NormalizedDataset::from_raw_rows(label, &normalizer, &rows);
    observability::metrics::normalize::run_completed(&dataset.report);

    FileNormalizeOutputAdapter::new(output)?.write_dataset(&dataset).await?;
    info!(report = %dataset.report, "Normalized local input");
    print_dataset(&dataset);
    Ok(())
}

fn run_query(plan: &str, data: &Path) -> Result<()> {
    let plan_text = if plan == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(plan).with_context(|| format!("failed to read plan {}", plan))?
    };

    let (plan, result) = QueryUseCase::new(data).run(&plan_text)?;
    println!("🔎 {} → {:?}", plan.dataset, plan.aggregate.op);
    println!("{}", result);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    if let Some(addr) = cli.metrics_listen {
        observability::init(addr).map_err(|e| anyhow::anyhow!("failed to start metrics exporter: {}", e))?;
        info!(%addr, "Serving Prometheus metrics");
    }

    // Built once here and passed down; nothing below reads the environment
    let config = AppConfig::load(cli.config.as_deref()).context("invalid configuration")?;

    match cli.command {
        Commands::Sync { datasets, output } => {
            println!("🔄 Syncing boards...");
            run_sync(&config, parse_datasets(datasets), &output).await
        }
        Commands::Normalize { input, label, output } => run_normalize(&config, &input, &label, &output).await,
        Commands::Query { plan, data } => run_query(&plan, &data),
    }
}
