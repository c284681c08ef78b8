use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use cnpj_leads::app::ports::EnrichmentPort;
use cnpj_leads::app::qualify_use_case::{QualificationOutcome, QualifyUseCase};
use cnpj_leads::app::resolve_use_case::{ResolutionSummary, ResolveUseCase};
use cnpj_leads::config::Config;
use cnpj_leads::infra::csv_output_adapter::{read_records, read_table, write_table};
use cnpj_leads::infra::{CsvOutputAdapter, EnrichmentTable, ReqwestHttp};
use cnpj_leads::logging;
use cnpj_leads::pipeline::ingestion::reader::read_queries;
use cnpj_leads::pipeline::ingestion::{BatchResolver, ResolutionClient, RetryPolicy};
use cnpj_leads::pipeline::processing::dedup::dedup_rows;
use cnpj_leads::pipeline::processing::filter::LeadFilter;
use cnpj_leads::types::CanonicalRecord;

#[derive(Parser)]
#[command(name = "cnpj_leads")]
#[command(about = "Resolve CNPJ identifiers and qualify them as sales leads")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for rolling log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve identifiers against the registry and write the record exports
    Resolve {
        /// Newline-delimited identifiers
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        resolver: ResolverArgs,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score, classify and gate a previously written full export
    Qualify {
        /// Full audited export (records_full.csv)
        #[arg(long)]
        input: PathBuf,
        /// Keyed enrichment table (CSV with a cnpj column)
        #[arg(long)]
        enrichment: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run resolve and qualify back to back
    Run {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        resolver: ResolverArgs,
        #[arg(long)]
        enrichment: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Narrow a lead export by state, activity code or contact presence
    Filter {
        #[arg(long)]
        input: PathBuf,
        /// State substring, e.g. SC
        #[arg(long)]
        uf: Option<String>,
        /// Activity code substring, e.g. 4781
        #[arg(long)]
        cnae: Option<String>,
        /// Keep only rows with a phone or an email
        #[arg(long)]
        only_contact: bool,
        #[arg(long)]
        output: PathBuf,
    },
    /// Deduplicate any flat CSV by a column, keeping the first occurrence.
    /// Blank values count as one key.
    Dedup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "cnpj")]
        column: String,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct ResolverArgs {
    /// Concurrent lookups
    #[arg(long)]
    workers: Option<usize>,
    /// Pause after each completed lookup, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
}

impl ResolverArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.registry.workers = workers.max(1);
        }
        if let Some(delay_ms) = self.delay_ms {
            config.registry.delay_ms = delay_ms;
        }
    }
}

fn build_resolve_use_case(config: &Config, output: &CsvOutputAdapter) -> Result<ResolveUseCase> {
    let http = ReqwestHttp::new(config.registry.timeout()).context("failed to build HTTP client")?;
    let client = ResolutionClient::new(
        Arc::new(http),
        config.registry.base_url.clone(),
        config.registry.timeout(),
        RetryPolicy::from_config(&config.retry),
    );
    let resolver = BatchResolver::new(Arc::new(client), config.registry.workers, config.registry.delay());
    Ok(ResolveUseCase::new(resolver, Box::new(output.clone())))
}

fn build_qualify_use_case(enrichment: Option<&Path>, output: &CsvOutputAdapter) -> Result<QualifyUseCase> {
    let table: Option<Box<dyn EnrichmentPort>> = match enrichment {
        Some(path) => {
            let table = EnrichmentTable::load(path)
                .with_context(|| format!("failed to load enrichment table {}", path.display()))?;
            Some(Box::new(table))
        }
        None => None,
    };
    Ok(QualifyUseCase::with_default_gate(table, Box::new(output.clone())))
}

async fn resolve(config: &Config, input: &Path, output: &CsvOutputAdapter) -> Result<Vec<CanonicalRecord>> {
    let queries = read_queries(input).with_context(|| format!("failed to read {}", input.display()))?;
    info!(queries = queries.len(), workers = config.registry.workers, "Resolving");

    let use_case = build_resolve_use_case(config, output)?;
    let outcome = use_case.execute(queries).await?;
    print_resolution(&outcome.summary, output.dir());
    Ok(outcome.records)
}

fn qualify(records: Vec<CanonicalRecord>, enrichment: Option<&Path>, output: &CsvOutputAdapter) -> Result<()> {
    let use_case = build_qualify_use_case(enrichment, output)?;
    let outcome = use_case.execute(records)?;
    print_qualification(&outcome, output.dir());
    Ok(())
}

fn print_resolution(summary: &ResolutionSummary, dir: &Path) {
    println!("\nResolution results:");
    println!("   Total queries: {}", summary.total);
    println!("   Found: {}", summary.found);
    println!("   Failed: {}", summary.failed());
    for (kind, count) in &summary.errors {
        println!("     {kind}: {count}");
    }
    println!("   Output directory: {}", dir.display());
}

fn print_qualification(outcome: &QualificationOutcome, dir: &Path) {
    let report = &outcome.report;
    println!("\nQualification results:");
    println!("   Total records: {}", report.total);
    println!("   Structurally valid: {} ({:.2}%)", report.valid, report.valid_pct());
    println!("   Structurally invalid: {} ({:.2}%)", report.invalid, report.invalid_pct());
    if !report.top_missing.is_empty() {
        println!("   Most missing fields:");
        for (field, count) in &report.top_missing {
            println!("     {field}: {count}");
        }
    }
    println!("   By classification:");
    for (class, count) in &outcome.summary.by_class {
        println!("     {class}: {count}");
    }
    println!("   Business valid: {}", outcome.summary.business_valid);
    println!("   Final leads: {}", outcome.summary.final_leads);
    println!("   Output directory: {}", dir.display());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    let mut config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Resolve { input, resolver, output } => {
            resolver.apply(&mut config);
            let adapter = CsvOutputAdapter::new(output.unwrap_or_else(|| config.output.dir.clone()))?;
            resolve(&config, &input, &adapter).await?;
        }
        Commands::Qualify { input, enrichment, output } => {
            let adapter = CsvOutputAdapter::new(output.unwrap_or_else(|| config.output.dir.clone()))?;
            let records = read_records(&input).with_context(|| format!("failed to read {}", input.display()))?;
            let enrichment = enrichment.or_else(|| config.enrichment.table_path.clone());
            qualify(records, enrichment.as_deref(), &adapter)?;
        }
        Commands::Run { input, resolver, enrichment, output } => {
            resolver.apply(&mut config);
            let adapter = CsvOutputAdapter::new(output.unwrap_or_else(|| config.output.dir.clone()))?;
            let records = resolve(&config, &input, &adapter).await?;
            let enrichment = enrichment.or_else(|| config.enrichment.table_path.clone());
            qualify(records, enrichment.as_deref(), &adapter)?;
        }
        Commands::Filter { input, uf, cnae, only_contact, output } => {
            let (headers, rows) = read_table(&input)?;
            let filter = LeadFilter { uf, cnae, only_contact };
            if filter.is_empty() {
                warn!("No filter given, copying input unchanged");
            }
            let before = rows.len();
            let kept = filter.apply(&headers, rows)?;
            write_table(&output, &headers, &kept)?;
            println!("Filtered {} -> {} leads into {}", before, kept.len(), output.display());
        }
        Commands::Dedup { input, column, output } => {
            let (headers, rows) = read_table(&input)?;
            let before = rows.len();
            let kept = dedup_rows(&headers, rows, &column);
            write_table(&output, &headers, &kept)?;
            println!("Deduplicated {} -> {} rows by '{}' into {}", before, kept.len(), column, output.display());
        }
    }

    Ok(())
}
