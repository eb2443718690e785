use blockpress::assets::StaticDir;
use blockpress::batch;
use blockpress::cache::DiskCache;
use blockpress::ingest::Collaborators;
use blockpress::store::DocumentStore;
use blockpress::{config, output, toc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockpress")]
#[command(about = "Turn exported page trees into publishable documents")]
#[command(long_about = "\
Turn exported page trees into publishable documents

Each page export is a JSON block tree. Leading text blocks carrying
`key: value` directives become document metadata:

  id: 1234                 # integer ids are shortened (1234 -> JI)
  tags: go, web
  date: 2020-05-17         # also: createdat, publishedon, updatedat
  status: draft            # idea | draft | revise | published
  collection: go-cookbook
  @series: concurrency     # free-form directive

In the body, `#gallery` before two or more images groups them, and
`#url <href>` before an image makes it a link. Images are served from the
media cache as /img/<sha256>.<ext>.

Run 'blockpress gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml; relative paths in it resolve here
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every page export and write the document manifest
    Ingest {
        /// Manifest file to write
        #[arg(long, default_value = "documents.json")]
        out: PathBuf,
    },
    /// Ingest every page export without writing anything
    Check,
    /// Print the heading hierarchy of a markdown file
    Toc {
        /// Markdown file to read
        file: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest { out } => {
            let (store, _) = run_batch(&cli.config_dir, Some(&out))?;
            info!(documents = store.len(), manifest = %out.display(), "manifest written");
        }
        Command::Check => {
            let (_, skipped) = run_batch(&cli.config_dir, None)?;
            if skipped > 0 {
                return Err(format!("{skipped} page(s) failed to ingest").into());
            }
            println!("==> Content is valid");
        }
        Command::Toc { file } => {
            let markdown = std::fs::read_to_string(&file)?;
            let events = toc::heading_events(&markdown);
            let tree = toc::build_hierarchy(&events)?;
            output::print_toc(&tree);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Discover and ingest all pages, print the report, and write the manifest
/// when `out` is given. Returns the documents and the number of skipped pages.
fn run_batch(
    config_dir: &Path,
    out: Option<&Path>,
) -> Result<(DocumentStore, usize), Box<dyn std::error::Error>> {
    let config = config::load_config(config_dir)?;
    let content_dir = config_dir.join(&config.content_dir);
    let cache = DiskCache::new(config_dir.join(&config.cache_dir));
    let assets = StaticDir::new(config_dir.join(&config.static_dir));
    let threads = config::effective_threads(&config.processing);

    println!("==> Ingesting {}", content_dir.display());
    let paths = batch::discover_pages(&content_dir)?;
    let collaborators = Collaborators {
        fetcher: &cache,
        assets: &assets,
    };
    let report = batch::ingest_all(&paths, collaborators, threads, config.batch.on_error)?;

    let mut store = DocumentStore::new();
    store.extend(report.documents);
    output::print_ingest_output(&store, &report.failures, Some(&cache.stats()));

    if let Some(out) = out {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manifest = serde_json::json!({
            "documents": store.documents(),
            "tags": store.tags(),
        });
        std::fs::write(out, serde_json::to_string_pretty(&manifest)?)?;
    }

    Ok((store, report.failures.len()))
}
