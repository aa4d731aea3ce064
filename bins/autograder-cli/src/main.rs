mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autograder-cli")]
#[command(about = "Autograder CLI - Grade C submissions locally and manage grader configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a C source file
    Grade {
        /// Path to the .c file
        #[arg(short, long)]
        file: String,

        /// Program title / problem description
        #[arg(short, long)]
        title: String,

        /// JSON file with test cases ([{"input": "...", "expected": "..."}])
        #[arg(long)]
        tests: Option<String>,

        /// Scoring profile (artifact, reasoning)
        #[arg(short, long)]
        profile: Option<String>,

        /// Print the full evaluation as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Show the active scoring rubric
    Rubric,

    /// Write a default grader configuration
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grade {
            file,
            title,
            tests,
            profile,
            json,
        } => {
            commands::grade_file(&file, &title, tests.as_deref(), profile.as_deref(), json).await?;
        }
        Commands::Rubric => {
            commands::show_rubric()?;
        }
        Commands::Init { path } => {
            commands::init_project(&path)?;
        }
    }

    Ok(())
}
