//! Arbiter CLI
//!
//! A command-line front end for the execution core: run a single program
//! against custom input, or judge it against a test-case file and stream
//! the verdict events.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arbiter::{
    Config, EXAMPLE_CONFIG, ExecutionMode, Judge, StreamEvent, TestCase, VerdictStatus,
    sse_frame, stream_execution,
};
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "Run and judge code submissions in isolate sandboxes")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the CPU time limit in seconds
    #[arg(short = 't', long, global = true)]
    time_limit: Option<f64>,

    /// Override the memory limit in KB
    #[arg(short = 'm', long, global = true)]
    memory_limit: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: arbiter.toml)
        #[arg(short, long, default_value = "arbiter.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a program once against custom input
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (e.g., python, cpp, java)
        #[arg(short, long)]
        language: String,

        /// Input file fed to stdin (default: empty input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Expected-output file; when given, the run is graded AC/WA
        #[arg(short, long)]
        expected: Option<PathBuf>,

        /// Emit protocol events (SSE frames) instead of human output
        #[arg(long)]
        sse: bool,
    },

    /// Judge a program against a JSON test-case file, streaming events
    Judge {
        /// Source file to judge
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language tag (e.g., python, cpp, java)
        #[arg(short, long)]
        language: String,

        /// JSON file with an array of {input, expected, is_sample} objects
        #[arg(short = 'T', long)]
        tests: PathBuf,

        /// Custom-run mode: report stdout instead of grading
        #[arg(long)]
        custom: bool,
    },

    /// List available languages
    Languages,

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    // Per-invocation limit overrides layer onto the defaults
    if let Some(time_limit) = cli.time_limit {
        config.default_limits.time_limit = Some(time_limit);
    }
    if let Some(memory_limit) = cli.memory_limit {
        config.default_limits.memory_limit = Some(memory_limit);
    }

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            input,
            expected,
            sse,
        } => run_single(config, &source, &language, input.as_deref(), expected.as_deref(), sse).await,
        Commands::Judge {
            source,
            language,
            tests,
            custom,
        } => run_judge(config, &source, &language, &tests, custom).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_single(
    config: Config,
    source: &std::path::Path,
    language: &str,
    input: Option<&std::path::Path>,
    expected: Option<&std::path::Path>,
    sse: bool,
) -> Result<()> {
    // Fail on bad tags before touching a sandbox
    config
        .get_language(language)
        .context("unknown language")?;

    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;
    let input = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context("failed to read input file")?,
        None => String::new(),
    };
    let expected = match expected {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context("failed to read expected-output file")?,
        None => String::new(),
    };

    info!(language, "running program");
    let judge = Judge::new(config);
    let verdict = judge.execute_code(language, &code, &input, &expected).await;

    if sse {
        let mut stdout = std::io::stdout().lock();
        let event = if verdict.status == VerdictStatus::NeedsInput {
            StreamEvent::NeedsInput {
                index: 0,
                message: verdict
                    .message
                    .clone()
                    .unwrap_or_else(|| "program is waiting for input".to_string()),
            }
        } else {
            StreamEvent::Custom {
                index: 0,
                status: verdict.status,
                time: verdict.time,
                memory: verdict.memory,
                stdout: verdict.stdout.clone(),
                stderr: verdict.stderr.clone(),
                exit_code: verdict.exit_code,
                message: verdict.message.clone(),
            }
        };
        write!(stdout, "{}", sse_frame(&event))?;
        write!(stdout, "{}", sse_frame(&StreamEvent::Complete { summary: None }))?;
        stdout.flush()?;
    } else {
        if !verdict.stdout.is_empty() {
            println!("{}", verdict.stdout);
        }
        if !verdict.stderr.is_empty() {
            eprintln!("{}", verdict.stderr);
        }
        info!(
            status = %verdict.status,
            time = format_args!("{:.3}s", verdict.time),
            memory = format_args!("{} KB", verdict.memory),
            exit_code = verdict.exit_code,
            "execution result"
        );
        if let Some(ref message) = verdict.message {
            info!(message, "diagnostic");
        }
    }

    match verdict.status {
        VerdictStatus::Accepted | VerdictStatus::Ok => Ok(()),
        _ => std::process::exit(1),
    }
}

async fn run_judge(
    config: Config,
    source: &std::path::Path,
    language: &str,
    tests: &std::path::Path,
    custom: bool,
) -> Result<()> {
    config
        .get_language(language)
        .context("unknown language")?;

    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;
    let tests_json = tokio::fs::read_to_string(tests)
        .await
        .context("failed to read test-case file")?;
    let test_cases: Vec<TestCase> =
        serde_json::from_str(&tests_json).context("failed to parse test-case file")?;

    let mode = if custom {
        ExecutionMode::CustomRun
    } else {
        ExecutionMode::Submit
    };

    info!(language, tests = test_cases.len(), "judging submission");
    let judge = Arc::new(Judge::new(config));
    let mut events = stream_execution(Arc::clone(&judge), language, code, test_cases, mode);

    let mut all_passed = true;
    let mut stdout = std::io::stdout().lock();
    while let Some(event) = events.recv().await {
        if let StreamEvent::Complete {
            summary: Some(ref summary),
        } = event
        {
            all_passed = summary.failed == 0 && summary.total > 0;
        }
        write!(stdout, "{}", sse_frame(&event))?;
        stdout.flush()?;
    }

    let pool = judge.pool().stats();
    let counts = judge.run_counts();
    info!(
        boxes_free = pool.free,
        boxes_total = pool.total,
        runs = counts.total,
        passed = counts.passed,
        failed = counts.failed,
        "judging complete"
    );

    if custom || all_passed {
        Ok(())
    } else {
        std::process::exit(1)
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(tag, _)| *tag);

    for (tag, lang) in languages {
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        println!("  {:<13} {} ({})", tag, lang.name, lang_type);
    }
}

fn show_config(config: &Config) {
    println!("Default resource limits:");
    println!("  Time limit: {:?}", config.default_limits.time_limit);
    println!(
        "  Wall time limit: {:?}",
        config.default_limits.wall_time_limit
    );
    println!(
        "  Memory limit: {:?} KB",
        config.default_limits.memory_limit
    );
    println!("  Stack limit: {:?} KB", config.default_limits.stack_limit);
    println!("  Output limit: {:?} KB", config.default_limits.max_output);
    println!("  Max processes: {:?}", config.default_limits.max_processes);
    println!();
    println!("Isolate binary: {}", config.isolate_binary().display());
    println!(
        "Box id range: {}..={}",
        config.box_min_id, config.box_max_id
    );
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
