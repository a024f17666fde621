//! apicheck CLI - Contract verification for the user-directory API

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use apicheck_core::{Config, Fixtures, RunReport, VerdictStatus};
use apicheck_runner::ScenarioRunner;

const CONFIG_PATH: &str = ".apicheck.toml";

#[derive(Parser)]
#[command(name = "apicheck")]
#[command(about = "Contract verification for a read-only user-directory API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario catalog
    Run {
        /// Config file (default: .apicheck.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// Only run scenarios whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Show execution plan without sending requests
        #[arg(long)]
        dry_run: bool,
    },

    /// Initialize config file
    Init,

    /// List scenarios in the catalog
    List,

    /// Export JSON Schema for the run report
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.output);

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool, output: OutputFormat) {
    let default = match (verbose, output) {
        (true, _) => "apicheck=debug,apicheck_runner=debug",
        (false, OutputFormat::Silent) => "off",
        (false, _) => "error",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&str>) -> Result<Config> {
    Ok(match path {
        Some(p) => Config::load(Path::new(p))?,
        None => Config::load_default()?,
    })
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            filter,
            dry_run,
        } => {
            let cfg = load_config(config.as_deref())?;

            // Dry run: show plan and exit
            if dry_run {
                let plan = apicheck_runner::plan(&cfg, filter.as_deref());
                match cli.output {
                    OutputFormat::Terminal => println!("{}", plan.to_terminal()),
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                    OutputFormat::Silent => {}
                }
                return Ok(i32::from(plan.has_errors()));
            }

            let fixtures = Fixtures::load(&cfg.fixtures)?;
            let runner = ScenarioRunner::new(&cfg, &fixtures)?.with_filter(filter.as_deref())?;

            if cli.output == OutputFormat::Terminal {
                eprintln!("Config:");
                eprintln!("  base_url: {}", cfg.base_url);
                eprintln!(
                    "  fixtures: {} (id = {})",
                    fixtures.source().display(),
                    runner.fixture_id()
                );
                if !cfg.headers.is_empty() {
                    eprintln!("  headers:  {} configured", cfg.headers.len());
                }
                eprintln!("  sla:      {} ms", cfg.response_time_limit_ms);
                if cfg.effective_retries() > 0 {
                    eprintln!("  retries:  {}", cfg.effective_retries());
                }
                eprintln!();
            }

            let start = Instant::now();
            let outcomes = runner.run().await;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let report = RunReport::new(&cfg.base_url, runner.fixture_id(), outcomes, duration_ms);

            match cli.output {
                OutputFormat::Terminal => print_terminal(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Silent => {}
            }

            Ok(report.verdict.exit_code)
        }

        Commands::Init => {
            if Path::new(CONFIG_PATH).exists() {
                eprintln!("{CONFIG_PATH} already exists");
                return Ok(1);
            }

            std::fs::write(CONFIG_PATH, Config::example())?;
            println!("Created {CONFIG_PATH}");
            println!("\nEdit the file to configure:");
            println!("  - base_url: server to check");
            println!("  - fixtures: file holding a known-valid user id");
            println!("  - response_time_limit_ms: per-call SLA");
            Ok(0)
        }

        Commands::List => {
            let scenarios = apicheck_runner::catalog();
            match cli.output {
                OutputFormat::Json => {
                    let list: Vec<_> = scenarios
                        .iter()
                        .map(|s| {
                            serde_json::json!({
                                "name": s.name,
                                "endpoint": s.endpoint,
                                "calls": s.calls,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&list)?);
                }
                OutputFormat::Terminal => {
                    let mut endpoint = "";
                    for s in &scenarios {
                        if s.endpoint != endpoint {
                            endpoint = s.endpoint;
                            println!("{endpoint}:");
                        }
                        println!("  {}", s.name);
                    }
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Schema => {
            let schema = apicheck_core::report::generate_schema()?;
            println!("{schema}");
            Ok(0)
        }
    }
}

fn print_terminal(report: &RunReport) {
    for s in &report.scenarios {
        println!("  [{}] {} ({} ms)", s.status, s.name, s.duration_ms);
    }

    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() {
        println!("\nFailures ({}):", failed.len());
        for s in failed {
            if let Some(f) = &s.failure {
                println!("  {} [{}]", s.name, f.kind);
                println!("         {}", f.message);
            }
        }
    }

    let icon = if report.verdict.status == VerdictStatus::Pass {
        "PASS"
    } else {
        "FAIL"
    };
    println!("\n{icon}: {}", report.verdict.reason);
    println!(
        "  Scenarios: {} total, {} failed ({} ms)",
        report.scenarios.len(),
        report.scenarios.iter().filter(|s| !s.passed()).count(),
        report.duration_ms
    );
    println!("  Exit code: {}", report.verdict.exit_code);
}
