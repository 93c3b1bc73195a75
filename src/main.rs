//! YaoXiang Platform - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam::channel;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use yaoxiang_platform::runtime::scheduler::hardware_parallelism;
use yaoxiang_platform::trace::{LogTracingController, TracePhase};
use yaoxiang_platform::util::config::CONFIG_FILE_NAME;
use yaoxiang_platform::util::logger::{self, LogLevel};
use yaoxiang_platform::{
    resolve_thread_pool_size, ContextId, DefaultPlatform, ExpectedRuntime, PlatformConfig,
    TraceEvent, NAME, VERSION,
};

/// Drive the YaoXiang task platform from the command line
#[derive(Parser, Debug)]
#[command(name = "yaoxiang-platform")]
#[command(author = "YaoXiang Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Background worker count (0 = auto)
    #[arg(short, long, global = true, allow_negative_numbers = true)]
    threads: Option<i32>,

    /// Config file (defaults to ./yaoxiang-platform.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved platform configuration
    Info,

    /// Run a synthetic workload and report how it was disposed
    Run {
        /// Background tasks to post
        #[arg(short, long, default_value_t = 16)]
        background: usize,

        /// Execution contexts to pump
        #[arg(long, default_value_t = 2)]
        contexts: usize,

        /// Foreground tasks per context
        #[arg(short, long, default_value_t = 8)]
        foreground: usize,

        /// Delayed tasks per context
        #[arg(short, long, default_value_t = 4)]
        delayed: usize,

        /// Delay of each delayed task, in milliseconds
        #[arg(long, default_value_t = 10)]
        delay_ms: u64,
    },
}

fn load_config(args: &Args) -> Result<PlatformConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut config = match &args.config {
        Some(_) => PlatformConfig::load(&path),
        None => PlatformConfig::load_or_default(&path),
    }
    .with_context(|| format!("Failed to load config: {}", path.display()))?
    .with_env()
    .context("Invalid environment override")?;

    if let Some(threads) = args.threads {
        config.thread_pool_size = threads;
    }
    if args.verbose {
        config.log_level = LogLevel::Debug;
    }
    config.validate().context("Invalid configuration")
}

fn print_info(config: &PlatformConfig) {
    let hardware = hardware_parallelism();
    println!("{} {}", NAME, VERSION);
    println!("hardware parallelism: {}", hardware);
    println!("requested pool size:  {}", config.thread_pool_size);
    println!(
        "resolved pool size:   {}",
        resolve_thread_pool_size(config.thread_pool_size, hardware)
    );
    println!("worker name prefix:   {}", config.thread_name_prefix);
    match config.stack_size {
        Some(size) => println!("worker stack size:    {} bytes", size),
        None => println!("worker stack size:    default"),
    }
    println!("log level:            {:?}", config.log_level);
    if config.trace_categories.is_empty() {
        println!("trace categories:     none");
    } else {
        println!("trace categories:     {}", config.trace_categories.join(","));
    }
}

fn run_workload(
    config: &PlatformConfig,
    background: usize,
    contexts: usize,
    foreground: usize,
    delayed: usize,
    delay_ms: u64,
) -> Result<()> {
    let mut platform = DefaultPlatform::with_config(config);
    if !config.trace_categories.is_empty() {
        platform.set_tracing_controller(Box::new(LogTracingController::new(
            config.trace_categories.iter().cloned(),
        )));
    }
    platform
        .ensure_initialized()
        .context("Failed to start worker pool")?;

    let category = platform.get_category_group_enabled("platform");
    let handle = platform.add_trace_event(&TraceEvent::new(TracePhase::Begin, &category, "run"));
    let start = Instant::now();

    let (tx, rx) = channel::unbounded();
    for id in 0..background {
        let tx = tx.clone();
        platform.call_on_background_thread(
            move || {
                let sum: u64 = (0..10_000u64).map(|n| n.wrapping_mul(id as u64 + 1)).sum();
                let _ = tx.send(sum);
            },
            ExpectedRuntime::Short,
        )?;
    }
    drop(tx);

    let delay = delay_ms as f64 / 1000.0;
    let ids: Vec<_> = (0..contexts).map(|_| ContextId::next()).collect();
    for context in &ids {
        for _ in 0..foreground {
            platform.call_on_foreground_thread(*context, || {});
        }
        for _ in 0..delayed {
            platform.call_delayed_on_foreground_thread(*context, || {}, delay);
        }
    }

    let mut pumped = 0usize;
    loop {
        let mut ran = false;
        for context in &ids {
            while platform.pump_message_loop(*context) {
                pumped += 1;
                ran = true;
            }
        }
        let waiting: usize = ids
            .iter()
            .map(|context| platform.pending_delayed_tasks(*context))
            .sum();
        if waiting == 0 {
            break;
        }
        if !ran {
            thread::sleep(Duration::from_millis(1));
        }
    }

    let finished = rx
        .iter()
        .take(background)
        .count();
    platform.update_trace_event_duration(&category, "run", handle);
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "workload drained");

    let stats = platform.pool_stats();
    let report = platform.shutdown();
    println!("background tasks finished: {}/{}", finished, background);
    if let Some(stats) = stats {
        println!(
            "worker stats: {} completed, {} panicked",
            stats.completed(),
            stats.panicked()
        );
    }
    println!("foreground tasks pumped:   {}", pumped);
    println!("disposed at teardown:      {}", report.total());
    println!("elapsed:                   {:?}", start.elapsed());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    logger::init_with_level(config.log_level);

    if args.verbose {
        eprintln!("YaoXiang Platform version: {}", VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    }

    match args.command {
        Commands::Info => print_info(&config),
        Commands::Run {
            background,
            contexts,
            foreground,
            delayed,
            delay_ms,
        } => {
            info!(background, contexts, foreground, delayed, delay_ms, "running workload");
            run_workload(&config, background, contexts, foreground, delayed, delay_ms)
                .context("Workload failed")?;
        }
    }

    Ok(())
}
