//! Dvorak CLI
//!
//! A command-line tool for running the judge worker and judging submissions
//! locally in Docker sandboxes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dvorak::{
    Config, DockerRuntime, EXAMPLE_CONFIG, FsProblemLoader, Judge, RedisQueue, RedisResultStore,
    ResultStore, Submission, Worker,
};
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dvorak")]
#[command(about = "A judge worker for sandboxed online judge submissions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

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
        /// Output path (default: dvorak.toml)
        #[arg(short, long, default_value = "dvorak.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Consume judge jobs from the Redis queue until interrupted
    Worker,

    /// Judge a local source file against a problem
    Judge {
        /// Source file to judge
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Problem ID (a file <ID>.json in the problems directory)
        #[arg(short, long)]
        problem: String,

        /// Language ID (e.g., python, cpp)
        #[arg(short, long)]
        language: String,
    },

    /// Print the published result of a job
    Result {
        /// Job ID
        #[arg(value_name = "JOB_ID")]
        job_id: String,
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
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::from_env().context("failed to load configuration")?
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Worker => run_worker(config).await,
        Commands::Judge {
            source,
            problem,
            language,
        } => run_judge(config, &source, problem, language).await,
        Commands::Result { job_id } => show_result(&config, &job_id).await,
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

fn build_judge(config: Config) -> Judge {
    let runtime = Arc::new(DockerRuntime::new(
        config.docker_binary(),
        config.sandbox.clone(),
    ));
    let problems = Arc::new(FsProblemLoader::new(&config.problems_dir));
    Judge::new(Arc::new(config), runtime, problems)
}

async fn run_worker(config: Config) -> Result<()> {
    let queue = RedisQueue::connect(&config.queue.redis_url, &config.queue.queue_key)
        .await
        .context("failed to connect to job queue")?;
    let store = RedisResultStore::connect(&config.queue.redis_url, &config.queue.result_prefix)
        .await
        .context("failed to connect to result store")?;

    info!(
        redis = %config.queue.redis_url,
        queue = %config.queue.queue_key,
        "connected"
    );

    let worker = Worker::new(build_judge(config), Arc::new(queue), Arc::new(store));

    // The job in progress finishes before the worker returns
    worker
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupted, finishing current job"),
                Err(e) => {
                    error!(error = %e, "failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    Ok(())
}

async fn run_judge(config: Config, source: &Path, problem: String, language: String) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let submission = Submission {
        problem_id: problem,
        language,
        code,
    };

    info!(
        problem = %submission.problem_id,
        language = %submission.language,
        "judging submission"
    );

    let verdict = build_judge(config).judge(&submission).await;

    // Verdict on stdout, logs on stderr
    println!(
        "{}",
        serde_json::to_string_pretty(&verdict).context("failed to serialize verdict")?
    );

    if verdict.is_accepted() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

async fn show_result(config: &Config, job_id: &str) -> Result<()> {
    let store = RedisResultStore::connect(&config.queue.redis_url, &config.queue.result_prefix)
        .await
        .context("failed to connect to result store")?;

    let record = store
        .fetch(job_id)
        .await
        .context("failed to read result")?;

    match record {
        Some(record) => println!(
            "{}",
            serde_json::to_string_pretty(&record).context("failed to serialize result")?
        ),
        None => println!("{}", serde_json::json!({ "done": false })),
    }

    Ok(())
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(id, _)| *id);

    for (id, lang) in languages {
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        println!("  {:<15} {} ({}, {})", id, lang.name, lang_type, lang.image);
    }
}

fn show_config(config: &Config) {
    let limits = &config.sandbox.limits;
    println!("Sandbox limits:");
    println!("  CPUs: {}", limits.cpus);
    println!("  Memory limit: {} MB", limits.memory_limit);
    println!("  Max processes: {}", limits.max_processes);
    println!("  Tmpfs mounts: {}", limits.tmpfs.join(", "));
    println!("  Network: disabled");
    println!();
    println!("Docker binary: {}", config.docker_binary().display());
    println!("Work dir: {}", config.sandbox.work_dir);
    println!("Execution user: {}", config.sandbox.user);
    println!("Grace period: {}s", config.sandbox.grace_period);
    println!("Compile timeout: {}s", config.judge.compile_timeout);
    println!();
    println!("Problems directory: {}", config.problems_dir.display());
    println!("Redis: {}", config.queue.redis_url);
    println!("Queue key: {}", config.queue.queue_key);
    println!("Result TTL: {}s", config.queue.result_ttl);
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
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
