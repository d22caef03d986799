//! P0 greets the group, everyone else broadcasts a reply, and the group runs
//! to quiescence. Replies that overtake the greeting are held back; the
//! event log and final clocks are printed.
//!
//! Usage: `causal-demo [config.json]`. Set `RUST_LOG=debug` to see the
//! delivery layer's own tracing.

use std::time::Duration;

use causal_core::events::{EventKind, ProcessEvent};
use causal_core::transport::SimulatedNetwork;
use causal_core::{CausalResult, GroupConfig, ProcessId};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    if let Err(err) = run() {
        tracing::error!(error = %err, "demo failed");
        std::process::exit(1);
    }
}

fn run() -> CausalResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => GroupConfig::from_path(path)?,
        None => GroupConfig::default(),
    };
    let n = config.num_processes;
    let mut net: SimulatedNetwork<String> = SimulatedNetwork::new(&config)?;

    // P0's greeting reaches P1 quickly and everyone else slowly. P1 answers
    // as soon as it has P0's message, so P1's reply overtakes the greeting
    // elsewhere and has to be held back.
    let fast = config.default_delay;
    let routes: Vec<(ProcessId, Duration)> = ProcessId::all(n)
        .skip(1)
        .map(|p| (p, if p == ProcessId(1) { fast } else { fast * 4 }))
        .collect();
    net.send_with_delays(ProcessId(0), &routes, "Message from P0".to_string())?;
    net.run_until(fast);

    for id in ProcessId::all(n).skip(1) {
        net.broadcast(id, format!("Message from {}", id))?;
    }

    let stats = net.run();
    for event in net.take_events() {
        print_event(&event);
    }
    for process in net.processes() {
        println!("{:<17} {} final clock: {}", "[FINAL]", process.id(), process.clock());
    }
    tracing::info!(?stats, quiescent = net.is_quiescent(), "run complete");
    Ok(())
}

fn print_event(event: &ProcessEvent<String>) {
    let ProcessEvent { kind, process, peer, clock, payload, .. } = event;
    let tag = format!("[{}]", kind.tag());
    match kind {
        EventKind::Sent => println!("{:<17} {} -> {}: '{}' {}", tag, process, peer, payload, clock),
        EventKind::Delivered => println!("{:<17} {} got '{}' from {}, clock {}", tag, process, payload, peer, clock),
        EventKind::Queued => println!("{:<17} {} held '{}' from {}, clock {}", tag, process, payload, peer, clock),
        EventKind::DelayedDelivered => {
            println!("{:<17} {} released held '{}' from {}, clock {}", tag, process, payload, peer, clock)
        }
    }
}
