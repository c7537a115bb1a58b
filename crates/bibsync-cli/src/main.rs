//! bibsync: mirror a reference store, search it, merge regenerated notes

mod output;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use bibsync_core::config::PolicyKind;
use bibsync_core::{merge, BibsyncConfig, Library, MergeOptions};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use output::Markers;

#[derive(Parser)]
#[command(name = "bibsync", version, about = "Reference store mirror and note merge")]
struct Cli {
    /// Config file (default: $BIBSYNC_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bring the cache up to date with the source
    Sync {
        /// Re-read everything instead of only what changed
        #[arg(long)]
        full: bool,
    },
    /// Ranked search over the cached entries
    Search {
        /// Query keywords
        #[arg(required = true)]
        query: Vec<String>,
        /// Maximum number of hits to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge regenerated note text into an existing note
    Merge {
        /// Note as the user last saved it
        existing: PathBuf,
        /// Freshly generated note text
        generated: PathBuf,
        /// Override the configured preservation policy
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
        /// Write the result back to EXISTING instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// List collections with their full paths
    Collections,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum PolicyArg {
    OverwriteAll,
    PreserveAll,
    PreserveSection,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::OverwriteAll => PolicyKind::OverwriteAll,
            PolicyArg::PreserveAll => PolicyKind::PreserveAll,
            PolicyArg::PreserveSection => PolicyKind::PreserveSection,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Sync { full } => {
            let mut library = Library::open(&config);
            let outcome = if full {
                library.resync().await?
            } else {
                library.refresh().await?
            };
            println!("{outcome}");
        }
        Command::Search { query, limit, json } => {
            let mut library = Library::open(&config);
            library.refresh().await?;
            let mut hits = library.search(&query.join(" "));
            if let Some(limit) = limit {
                hits.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&output::hits_to_json(&hits))?);
            } else if hits.is_empty() {
                eprintln!("No matches");
            } else {
                let markers = if std::io::stdout().is_terminal() {
                    Markers::ansi()
                } else {
                    Markers::plain()
                };
                for hit in &hits {
                    println!("{}", output::format_hit(hit, markers));
                }
            }
        }
        Command::Merge {
            existing,
            generated,
            policy,
            write,
        } => {
            let options = config.merge.to_options(policy.map(PolicyKind::from));
            let fresh = tokio::fs::read_to_string(&generated).await?;
            let merged = merge_note(&existing, &fresh, &options).await?;

            if write {
                tokio::fs::write(&existing, merged).await?;
                tracing::info!(path = %existing.display(), "Merged note written");
            } else {
                print!("{merged}");
            }
        }
        Command::Collections => {
            let mut library = Library::open(&config);
            library.refresh().await?;
            match library.collections() {
                Some(collections) if !collections.is_empty() => {
                    for line in output::collection_lines(collections) {
                        println!("{line}");
                    }
                }
                _ => eprintln!("No collections"),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BibsyncConfig, bibsync_core::ConfigError> {
    match path {
        Some(path) => BibsyncConfig::load_from(path),
        None => BibsyncConfig::load_standard(),
    }
}

/// Merge `generated` into the note at `path`; a note that does not exist
/// yet is created from the generated text as-is
async fn merge_note(path: &Path, generated: &str, options: &MergeOptions) -> std::io::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(current) => Ok(merge(&current, generated, options)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no existing note, taking generated text");
            Ok(generated.to_string())
        }
        Err(e) => Err(e),
    }
}
