use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use libc::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use philo::{Config, Console, Simulation};

#[derive(Parser)]
#[command(name = "philo")]
#[command(version)]
#[command(about = "Dining philosophers simulation")]
struct Cli {
    #[arg(help = "Number of philosophers (and forks)")]
    number_of_philosophers: usize,

    #[arg(help = "Milliseconds a philosopher survives after the start of its last meal")]
    time_to_die: u64,

    #[arg(help = "Milliseconds spent eating, holding both forks")]
    time_to_eat: u64,

    #[arg(help = "Milliseconds spent sleeping")]
    time_to_sleep: u64,

    #[arg(help = "Stop once every philosopher has eaten this many times")]
    number_of_times_each_philosopher_must_eat: Option<u64>,

    // 色付きがデフォルト
    #[arg(long = "no-color", help = "Print event lines without ANSI colors")]
    no_color: bool,

    #[arg(long = "poll-us", help = "Polling granularity in microseconds")]
    poll_us: Option<u64>,

    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ログは stderr へ。stdout はイベント出力専用
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let mut config = Config::new(
        cli.number_of_philosophers,
        cli.time_to_die,
        cli.time_to_eat,
        cli.time_to_sleep,
        cli.number_of_times_each_philosopher_must_eat,
    )?;
    if let Some(us) = cli.poll_us {
        config = config.with_poll_interval(Duration::from_micros(us))?;
    }

    let sim = Simulation::new(config, Console::new(io::stdout(), !cli.no_color));

    // Ctrl-C などを受けたら終了フラグを立てて、各スレッドに後始末させる
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handler")?;
    let signal_handle = signals.handle();
    let stop = sim.stop_handle();
    let signal_thread = thread::spawn(move || {
        for sig in signals.forever() {
            if stop.interrupt() {
                info!(signal = sig, "interrupted");
            }
        }
    });

    let summary = sim.run();

    signal_handle.close();
    if signal_thread.join().is_err() {
        warn!("signal thread panicked");
    }

    let summary = summary?;
    info!(
        outcome = ?summary.outcome,
        meals = ?summary.meals,
        elapsed_ms = summary.elapsed_ms,
        "done"
    );
    Ok(())
}
