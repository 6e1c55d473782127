//! kgview CLI: load Turtle into a triple store and inspect the stored graphs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kgview::{load_config, parse_turtle, Config, EntityQuery, KgService};

#[derive(Parser)]
#[command(name = "kgview", version, about = "Batched RDF ingestion and graph analysis")]
struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, global = true, env = "KGVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a Turtle file into a named graph and print the job report.
    Upload {
        file: PathBuf,

        /// Target graph name; the configured default graph when omitted.
        #[arg(long, short, default_value = "")]
        graph: String,

        /// Base IRI for resolving relative IRIs in the file.
        #[arg(long)]
        base_iri: Option<String>,

        /// Force-complete the job if it is still running after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Analyse a graph already in the store.
    Analyze { graph: String },

    /// List graphs under the configured base URI.
    Graphs,

    /// Delete a graph.
    Delete { graph: String },

    /// Entity counts per type.
    Stats { graph: String },

    /// Page through the entities of one type.
    Entities {
        graph: String,

        /// Type IRI.
        #[arg(long = "type")]
        type_uri: String,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "50")]
        limit: usize,

        /// Case-insensitive match on URI and labels.
        #[arg(long)]
        search: Option<String>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config
        .apply_env()
        .context("Invalid configuration from environment")?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn upload(
    service: &KgService,
    file: &Path,
    graph: &str,
    base_iri: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let triples = parse_turtle(&text, base_iri)?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let job_id = service.submit(&filename, graph, triples)?;
    info!(job_id = %job_id, "Waiting for job");

    match timeout_secs {
        Some(secs) => {
            if tokio::time::timeout(Duration::from_secs(secs), service.wait_for(&job_id))
                .await
                .is_err()
            {
                warn!(job_id = %job_id, secs, "Job still running, forcing completion");
                service.force_complete(&job_id)?;
            }
        }
        None => {
            service.wait_for(&job_id).await?;
        }
    }

    let status = service.get_status(&job_id).await?;
    print_json(&status)?;
    if let Some(message) = &status.job.error_message {
        bail!("Upload failed: {}", message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = config(cli.config.as_deref())?;
    let service = KgService::from_config(&config)?;

    match cli.command {
        Commands::Upload {
            file,
            graph,
            base_iri,
            timeout_secs,
        } => upload(&service, &file, &graph, base_iri.as_deref(), timeout_secs).await?,
        Commands::Analyze { graph } => print_json(&service.analyze_graph(&graph).await?)?,
        Commands::Graphs => print_json(&service.list_graphs().await?)?,
        Commands::Delete { graph } => {
            service.delete_graph(&graph).await?;
            info!(graph = %graph, "Deleted");
        }
        Commands::Stats { graph } => print_json(&service.entity_statistics(&graph).await?)?,
        Commands::Entities {
            graph,
            type_uri,
            page,
            limit,
            search,
        } => {
            let query = EntityQuery {
                page,
                limit,
                search,
                ..EntityQuery::new(type_uri)
            };
            print_json(&service.entities_by_type(&graph, &query).await?)?;
        }
    }

    Ok(())
}
