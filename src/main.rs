use clap::{Parser, Subcommand, ValueEnum};
use inkpress::pipeline::{self, BuildOptions};
use inkpress::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(about = "Incremental publisher for a markdown site")]
#[command(long_about = "\
Incremental publisher for a markdown site

Every markdown file under the content directory becomes one HTML page.
What has been published is recorded in site.toml at the content root, so
each run only renders documents that have never been published. Pass
--republish to render everything again; first-publication dates survive.

Content structure:

  content/
  ├── site.toml                    # [config] + publish records (managed)
  ├── hello-world.md               # → hello-world.html
  ├── posts/
  │   └── on-writing.md            # → on-writing.html
  └── templates/output/            # Scaffold copied into the output root
      ├── index.html               # {{ .site_title }} is filled in
      └── etc/menu.js              # built-in copy used when absent

Front matter (optional):

  ---
  name: Custom Title               # default: title-cased file name
  published: 2024-03-05 09:30      # default: time of first publish
  draft: true                      # never published
  ---

Run 'inkpress gen-config' to generate a documented site.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "output", global = true)]
    output: PathBuf,

    /// Log verbosity (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish new documents (all documents with --republish)
    Build {
        /// Report what would be published without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Re-render every non-draft document and overwrite its page
        #[arg(long)]
        republish: bool,
    },
    /// Show how every document would be treated by the next build
    Status,
    /// Print a stock site.toml with all options documented
    GenConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Logs go to stderr; stdout carries the report.
fn initialize_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_level);

    match cli.command {
        Command::Build { dry_run, republish } => {
            let mut options = BuildOptions::new(&cli.source, &cli.output);
            options.dry_run = dry_run;
            options.force_republish = republish;

            tracing::info!(
                source = %cli.source.display(),
                output = %cli.output.display(),
                republish,
                dry_run,
                "starting build"
            );
            let report = pipeline::build(&options)?;
            output::print_build_report(&report, &cli.source);
            if report.has_failures() {
                std::process::exit(1);
            }
        }
        Command::Status => {
            let options = BuildOptions::new(&cli.source, &cli.output);
            let plan = pipeline::plan(&options)?;
            output::print_status(&plan, &cli.source);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
