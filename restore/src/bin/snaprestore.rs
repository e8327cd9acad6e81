use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use snaprestore::{include_prefixes, Options, OverwriteBehavior, Restorer};
use snaprestore_castore::{blobservice, treeservice, B3Digest};
use snaprestore_tracing::{LogFormat, TracingBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A global log level to use when printing logs.
    /// It's also possible to set `RUST_LOG` according to
    /// `tracing_subscriber::filter::EnvFilter`, which will always have
    /// priority.
    #[arg(long, default_value_t=Level::INFO)]
    log_level: Level,

    /// Whether to log in JSON
    #[arg(long)]
    json: bool,

    /// Don't draw progress bars.
    #[arg(long)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RestoreArgs {
    /// Digest of the snapshot's root tree.
    #[arg(long)]
    tree: B3Digest,

    /// Directory to restore into. Created if missing.
    #[arg(long)]
    target: PathBuf,

    #[arg(long, env, default_value = "simplefs:///var/lib/snaprestore/blobs")]
    blob_service_addr: String,

    #[arg(long, env, default_value = "simplefs:///var/lib/snaprestore/trees")]
    tree_service_addr: String,

    /// What to do with entries already present in the target.
    #[arg(long, default_value_t = OverwriteBehavior::default())]
    overwrite: OverwriteBehavior,

    /// Write runs of zeros as holes.
    #[arg(long)]
    sparse: bool,

    /// Only restore these locations inside the snapshot, like `/etc/ssh`.
    #[arg(long = "include", value_name = "LOCATION")]
    includes: Vec<String>,

    /// Keep going after errors concerning single entries.
    #[arg(long)]
    keep_going: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Restores a snapshot into a directory.
    Restore(RestoreArgs),
    /// Restores a snapshot, then checks the restored files against the store.
    Verify {
        #[command(flatten)]
        args: RestoreArgs,

        /// Number of files checked concurrently.
        #[arg(long, default_value_t = 4)]
        verify_workers: usize,
    },
}

async fn run(
    args: RestoreArgs,
    verify_workers: Option<usize>,
    cancel: CancellationToken,
) -> Result<usize, Box<dyn std::error::Error>> {
    let blob_service = blobservice::from_addr(&args.blob_service_addr).await?;
    let tree_service = treeservice::from_addr(&args.tree_service_addr).await?;

    let mut options = Options {
        sparse: args.sparse,
        overwrite: args.overwrite,
        ..Default::default()
    };
    if let Some(verify_workers) = verify_workers {
        options.verify_workers = verify_workers;
    }

    let mut restorer = Restorer::new(blob_service, tree_service, args.tree, options);
    if !args.includes.is_empty() {
        restorer.set_select_filter(include_prefixes(args.includes));
    }

    let errors = Arc::new(AtomicUsize::new(0));
    if args.keep_going {
        let errors = errors.clone();
        restorer.set_error_hook(move |location, err| {
            error!(location, err = %err, "skipping entry");
            errors.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
    }

    restorer.restore_to(&cancel, &args.target).await?;
    info!(stats = %restorer.stats(), "restored");

    if verify_workers.is_some() {
        let verified = restorer.verify_files(&cancel, &args.target).await?;
        info!(verified, "verified");
    }

    Ok(errors.load(Ordering::Relaxed))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut tracing_builder = TracingBuilder::default().level(cli.log_level);
    if cli.json {
        tracing_builder = tracing_builder.format(LogFormat::Json);
    }
    if !cli.no_progress {
        tracing_builder = tracing_builder.enable_progressbar();
    }
    tracing_builder.build()?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let errors = match cli.command {
        Commands::Restore(args) => run(args, None, cancel).await?,
        Commands::Verify {
            args,
            verify_workers,
        } => run(args, Some(verify_workers), cancel).await?,
    };

    if errors > 0 {
        error!(errors, "finished with errors");
        std::process::exit(1);
    }

    Ok(())
}
