use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use octo_config::{parse_concurrency, DEFAULT_CONCURRENCY};
use octo_core::SyncPlan;
use octo_cli::{commands, init_logging, watch_interrupts, ServerArgs};
use tokio_util::sync::CancellationToken;

/// Timelapse tools for OctoPrint.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(flatten)]
    server: ServerArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List timelapse videos on the server
    Ls,
    /// Mirror timelapse videos into a local directory
    Dl {
        dest: Utf8PathBuf,
        /// How many concurrent downloads to perform
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
        concurrency: usize,
        /// Delete already synced items from the server
        #[arg(long)]
        rm: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let client = cli.server.client()?;

    match cli.command {
        Commands::Ls => commands::cmd_ls(&client).await?,
        Commands::Dl {
            dest,
            concurrency,
            rm,
        } => {
            let plan = SyncPlan::new(concurrency, rm)?;
            let cancel = CancellationToken::new();
            let interrupt = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
                        std::process::exit(130);
                    }
                }
            });
            let result = commands::cmd_dl(&client, dest, plan, cancel).await;
            interrupt.abort();
            result?;
        }
    }

    Ok(())
}
