use clap::{Parser, Subcommand};
use folder_linker::config::{self, LinkerConfig};
use folder_linker::engine::Engine;
use folder_linker::reconcile::Outcome;
use folder_linker::vault::DiskVault;
use folder_linker::{output, watch};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folder-linker")]
#[command(about = "Keep folder index notes in sync with their folder's contents")]
#[command(long_about = "\
Keep folder index notes in sync with their folder's contents

A folder containing a note with the folder's own name (Projects/Projects.md)
gets a generated list of links to every .md, .txt and .pdf file anywhere
below it. Text above the first '---' line in the note is never touched;
everything below it is rewritten.

Vault structure:

  vault/
  ├── folder-linker.toml           # Optional config (see gen-config)
  ├── vault.md                     # Index note for the vault root
  ├── Projects/
  │   ├── Projects.md              # Index note: lists everything below
  │   ├── budget.pdf
  │   └── Alpha/
  │       └── plan.md              # No Alpha.md, so Alpha gets no listing
  └── inbox.txt

Folders without an index note are skipped. Notes are never created or deleted.

Run 'folder-linker gen-config' to print a documented folder-linker.toml.")]
#[command(version)]
struct Cli {
    /// Vault directory
    #[arg(long, default_value = ".", global = true)]
    vault: PathBuf,

    /// Log the decision made for every folder
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-index every folder note in the vault
    Scan,
    /// Report folder notes that are out of date without changing them
    Check,
    /// Re-index once, then keep folder notes in sync as files change (Ctrl-C stops)
    Watch,
    /// Print a stock folder-linker.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan => {
            let (engine, _) = open_engine(&cli.vault)?;
            output::print_report(&engine.reindex_all());
        }
        Command::Check => {
            let (engine, _) = open_engine(&cli.vault)?;
            let report = engine.check_all();
            output::print_report(&report);
            if report.count(Outcome::Stale) > 0 || report.errors().next().is_some() {
                std::process::exit(1);
            }
        }
        Command::Watch => {
            let (engine, config) = open_engine(&cli.vault)?;
            let subscription = watch::subscribe(engine.vault())?;
            let shutdown = subscription.shutdown_handle();
            std::thread::spawn(move || match wait_for_interrupt() {
                Ok(()) => {
                    info!("Interrupted, shutting down");
                    shutdown.trigger();
                }
                Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
            });
            std::thread::scope(|s| {
                s.spawn(|| output::print_report(&engine.on_ready()));
                watch::run(
                    &engine,
                    &subscription,
                    config.watch.debounce(),
                    output::print_report,
                );
            });
            subscription.unsubscribe()?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the vault's config and open it.
fn open_engine(
    root: &Path,
) -> Result<(Engine<DiskVault>, LinkerConfig), Box<dyn std::error::Error>> {
    let config = config::load_config(root)?;
    init_thread_pool(&config.processing);
    let vault = DiskVault::open(root)?.with_skip_hidden(config.scan.skip_hidden);
    Ok((Engine::new(vault), config))
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "folder_linker=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Block until the process receives Ctrl-C.
fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(tokio::signal::ctrl_c())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
