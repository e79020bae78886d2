//! # HGKit Countdown Demo
//!
//! Runs one or more countdowns on a shared shard timer and prints every
//! tick until all of them reach zero.
//!
//! ## Usage
//!
//! ```bash
//! hgkit --countdown sms=10 --countdown promo=3 --period-ms 250
//! ```
//!
//! Set `RUST_LOG=hgkit_timer=debug` to see the tick source lifecycle.

#![deny(missing_docs)]
#![deny(unsafe_code)]

mod args;
mod error;

use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;

use hgkit_timer::{ChannelListener, ShardTimer, TickEvent, TimerConfig};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, USAGE};
use crate::error::{CliError, CliResult};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Args::parse(std::env::args().skip(1)).and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            if matches!(e, CliError::Usage(_)) {
                eprintln!("{USAGE}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CliResult<()> {
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => TimerConfig::load(path)?,
        None => TimerConfig::default(),
    };
    if let Some(period_ms) = args.period_ms {
        config.period_ms = period_ms;
    }

    let timer = ShardTimer::spawn(config)?;
    let (tx, rx) = crossbeam_channel::unbounded::<TickEvent>();

    let mut pending = HashSet::new();
    for (name, secs) in &args.countdowns {
        let listener = ChannelListener::new(name.clone(), tx.clone());
        timer.start_listener(name.clone(), *secs, Arc::new(listener));
        pending.insert(name.clone());
        tracing::info!("Started countdown {} ({}s)", name, secs);
    }
    drop(tx);

    while !pending.is_empty() {
        let Ok(event) = rx.recv() else {
            break;
        };
        println!("{:>12}  {:>4}s", event.identifier, event.remaining);
        if event.is_final() {
            pending.remove(&event.identifier);
            tracing::info!("Countdown {} finished", event.identifier);
        }
    }

    timer.shutdown();
    Ok(())
}
