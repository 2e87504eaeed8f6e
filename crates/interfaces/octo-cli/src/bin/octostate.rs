use clap::{Parser, Subcommand};
use octo_cli::{commands, init_logging, ServerArgs, StateFormat};

/// Printer state tools for OctoPrint.
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
    /// Show printer state and temperatures
    State {
        /// How many temperature history samples to fetch
        #[arg(long, default_value_t = 0)]
        history: usize,
        #[arg(long, value_enum, default_value_t = StateFormat::Plain)]
        format: StateFormat,
    },
    /// Show the current print job
    Job,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let client = cli.server.client()?;

    match cli.command {
        Commands::State { history, format } => {
            commands::cmd_state(&client, history, format).await?
        }
        Commands::Job => commands::cmd_job(&client).await?,
    }

    Ok(())
}
