//! gradeboard CLI: grade model answers and inspect the shared ledger.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gradeboard",
    version,
    about = "Collaborative grading of model answers"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reviewer name to act as
    #[arg(long, global = true)]
    reviewer: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and sample corpus
    Init,

    /// Remember a reviewer name for later commands
    Login {
        #[arg(long)]
        name: String,
    },

    /// Set or clear the grade of one model answer
    Grade {
        #[arg(long)]
        batch: u32,

        /// Zero-based question index within the batch
        #[arg(long)]
        question: u32,

        #[arg(long)]
        model: String,

        /// correct, somewhat_correct, wrong, no_answer, or none to clear
        #[arg(long)]
        grade: String,
    },

    /// Show per-model reliability metrics
    Metrics {
        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show how much of the corpus is fully graded
    Progress,

    /// Show reviewer contribution counts
    Reviewers,

    /// Write the corpus joined with all grades to a JSON file
    Export {
        /// Output file (default: timestamped name in the current directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// PIN-protected maintenance
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Keep syncing with the store until interrupted
    Watch,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Remove a reviewer's counter and attributions
    DeleteReviewer {
        #[arg(long)]
        name: String,

        #[arg(long)]
        pin: String,
    },

    /// Reset the ledger to empty
    Wipe {
        #[arg(long)]
        pin: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gradeboard=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Login { name } => commands::login::execute(name),
        Commands::Grade {
            batch,
            question,
            model,
            grade,
        } => commands::grade::execute(config, cli.reviewer, batch, question, model, grade).await,
        Commands::Metrics { format } => commands::metrics::execute(config, format).await,
        Commands::Progress => commands::progress::execute(config).await,
        Commands::Reviewers => commands::reviewers::execute(config).await,
        Commands::Export { output } => commands::export::execute(config, output).await,
        Commands::Admin { command } => match command {
            AdminCommands::DeleteReviewer { name, pin } => {
                commands::admin::delete_reviewer(config, name, pin).await
            }
            AdminCommands::Wipe { pin } => commands::admin::wipe(config, pin).await,
        },
        Commands::Watch => commands::watch::execute(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
