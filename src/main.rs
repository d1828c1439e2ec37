//! CLI for condition mutation testing

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use mutest::{run_mutation_tests, scan, Config, SourceUnit};

#[derive(Parser)]
#[command(name = "mutest")]
#[command(author, version, about = "Condition mutation testing for Rust", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mutate a source file and run its tests against every mutant
    Test {
        /// The path to the code file to mutate
        #[arg(short, long)]
        code: PathBuf,

        /// The test file(s) to run against each mutant; the first one is
        /// the harness entry point
        #[arg(short, long, required = true)]
        test: Vec<PathBuf>,

        /// Optional settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List mutation candidates without running anything
    List {
        /// The path to the code file to scan
        #[arg(short, long)]
        code: PathBuf,
    },

    /// Show example configuration
    Example,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Test {
            code,
            test,
            config,
            verbose,
        } => {
            init_logging(verbose);
            run_tests(&code, &test, config.as_deref())
        }
        Commands::List { code } => {
            init_logging(false);
            list_candidates(&code)
        }
        Commands::Example => {
            print_example();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mutest=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_tests(code: &Path, tests: &[PathBuf], config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => {
            println!("{}", "Loading configuration...".dimmed());
            Config::load(path)?
        }
        None => Config::default(),
    };

    println!(
        "{} {} against {}",
        "Mutating".dimmed(),
        code.display(),
        tests
            .iter()
            .map(|t| t.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = run_mutation_tests(code, tests, &config.settings)
        .with_context(|| format!("mutation run on '{}' aborted", code.display()))?;
    report.print();

    // A completed run exits 0 whatever the mutants did
    Ok(())
}

fn list_candidates(code: &Path) -> anyhow::Result<()> {
    let unit = SourceUnit::load(code)?;
    let candidates = scan(unit.tree());

    if candidates.is_empty() {
        println!("{}", "No mutable conditions found.".dimmed());
        return Ok(());
    }

    for candidate in &candidates {
        println!(
            "{} {} {}",
            format!("{}:{}:{}", code.display(), candidate.line, candidate.column).dimmed(),
            candidate.snippet,
            format!("({})", candidate.context).dimmed()
        );
    }
    println!();
    println!("{} candidate(s)", candidates.len());
    Ok(())
}

fn print_example() {
    let example = r#"# Example mutest.yaml configuration file
version: "1.0"

settings:
  # Seconds per harness step; omit to wait forever
  timeout: 60

  # A failing run counts as "killed" only when its last non-empty
  # output line starts with this
  failure_marker: "test result: FAILED"

  # Run the unmutated code first and abort if its tests fail
  baseline: true

  # Compile the first test file with `rustc --test` and run it.
  # The test file pulls in the code under test, e.g. `mod max;`
  harness:
    kind: rustc
    edition: "2021"

  # Or run any command inside the workspace:
  # harness:
  #   kind: command
  #   program: sh
  #   args: ["-c", "rustc --test max_test.rs -o t && ./t"]
"#;

    println!("{}", example);
}
