//! `embedding-compare` - run one query against every configured embedding
//! provider and print how each provider's index answers it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use embedding_compare::{
    best_performer, classify, load_credentials, summary_table, CompareConfig,
    ComparisonOrchestrator, ComparisonResult, ExportArtifact, ProviderRegistry, SearchKind,
    TurbopufferClient,
};

#[derive(Debug, Parser)]
#[command(name = "embedding-compare", version, about)]
struct Cli {
    /// Query text to embed and search.
    #[arg(long)]
    query: String,

    /// YAML run configuration. Without it, namespaces come from credentials.
    #[arg(long)]
    config: Option<PathBuf>,

    /// YAML secrets file, consulted before the environment.
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Namespace family to search (titles or skills).
    #[arg(long, default_value = "titles")]
    kind: SearchKind,

    /// Rows per provider.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    top_k: Option<u64>,

    /// Write the JSON export to this file, or into this directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Per-provider deadline in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` may set RUST_LOG, so load it before the subscriber.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let file_config = match cli.config.as_deref() {
        Some(path) => Some(
            CompareConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
        ),
        None => None,
    };
    let overrides = file_config
        .as_ref()
        .map(|config| config.env_overrides.clone())
        .unwrap_or_default();
    let credentials = Arc::new(
        load_credentials(cli.secrets.as_deref(), &overrides).context("loading credentials")?,
    );

    let mut config = match file_config {
        Some(config) => config,
        None => CompareConfig::from_credentials(credentials.as_ref()),
    };
    if let Some(top_k) = cli.top_k {
        config.top_k = top_k as usize;
    }
    if let Some(secs) = cli.timeout_secs {
        config.job_timeout_secs = Some(secs);
    }
    config.validate()?;

    let request = config.to_run_request(cli.query.as_str(), cli.kind);
    if request.targets.is_empty() {
        bail!("no provider has a {} namespace configured", cli.kind);
    }
    tracing::info!(
        query = %request.query,
        kind = %cli.kind,
        providers = request.targets.len(),
        top_k = request.top_k,
        "starting comparison"
    );

    let index = TurbopufferClient::new(config.index_config(credentials.as_ref())?)?;
    let orchestrator =
        ComparisonOrchestrator::new(Arc::new(ProviderRegistry::new(credentials)), Arc::new(index));
    let result = orchestrator.run(request).await?;

    print_summary(&result);

    if let Some(output) = cli.output.as_deref() {
        let artifact = ExportArtifact::from_result(&result);
        let path = export_path(output, &artifact);
        artifact
            .write_to(&path)
            .with_context(|| format!("writing export {}", path.display()))?;
        println!("\nExported results to {}", path.display());
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn export_path(output: &Path, artifact: &ExportArtifact) -> PathBuf {
    if output.is_dir() {
        output.join(artifact.suggested_file_name())
    } else {
        output.to_path_buf()
    }
}

fn print_summary(result: &ComparisonResult) {
    println!("Query: {}", result.query);
    println!(
        "\n{:<14} {:<28} {:>5} {:>9} {:>9} {:>9}  {}",
        "provider", "namespace", "rows", "avg", "best", "worst", "tier"
    );
    for row in summary_table(result) {
        let tier = match &row.error {
            Some(error) => format!("error: {error}"),
            None if row.summary.is_empty() => "no results".to_string(),
            None => classify(row.summary.avg_distance).to_string(),
        };
        println!(
            "{:<14} {:<28} {:>5} {:>9.4} {:>9.4} {:>9.4}  {}",
            row.provider,
            row.namespace,
            row.summary.count,
            row.summary.avg_distance,
            row.summary.best_distance,
            row.summary.worst_distance,
            tier
        );
    }

    for (provider, outcome) in result.iter() {
        if outcome.results.is_empty() {
            continue;
        }
        println!(
            "\n{provider} ({} dims, ~{} rows indexed, {:.2}s)",
            outcome.query_vector_dimension,
            outcome.stats.approx_item_count,
            outcome.elapsed.as_secs_f64()
        );
        for (rank, hit) in outcome.results.iter().enumerate() {
            println!(
                "  {:>2}. [{}] {:.4}  {}  (id {})",
                rank + 1,
                classify(hit.distance),
                hit.distance,
                hit.text,
                hit.id
            );
        }
    }

    match best_performer(result) {
        Some(best) => println!(
            "\nBest performer: {} (avg distance {:.4})",
            best.provider, best.summary.avg_distance
        ),
        None => println!("\nBest performer: none (no provider returned results)"),
    }
}
