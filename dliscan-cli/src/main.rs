mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dliscan")]
#[command(about = "Dliscan - Inspect RP66V1 (DLIS) well-log files", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the Logical Record structure of a file
    Scan {
        /// Input DLIS file
        #[arg(short, long)]
        input: String,

        /// Output JSON file for the record summary
        #[arg(short, long)]
        output: Option<String>,

        /// Continue past records that fail to decode
        #[arg(long)]
        keep_going: bool,
    },

    /// Dump the contents of EFLR metadata records
    Dump {
        /// Input DLIS file
        #[arg(short, long)]
        input: String,

        /// Only dump Sets of this Type (e.g. CHANNEL, FRAME, PARAMETER)
        #[arg(long)]
        set_type: Option<String>,

        /// Output JSON file instead of a table on stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Materialize numeric curves from the first log pass
    Curves {
        /// Input DLIS file
        #[arg(short, long)]
        input: String,

        /// Restrict decoding to these channels (index is always kept)
        #[arg(short, long)]
        channel: Vec<String>,

        /// Output JSON file with the decoded values
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Scan {
            input,
            output,
            keep_going,
        } => commands::scan::execute(&input, output.as_deref(), keep_going),

        Commands::Dump {
            input,
            set_type,
            output,
        } => commands::dump::execute(&input, set_type.as_deref(), output.as_deref()),

        Commands::Curves {
            input,
            channel,
            output,
        } => commands::curves::execute(&input, &channel, output.as_deref()),
    }
}
