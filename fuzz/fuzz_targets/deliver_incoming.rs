#![no_main]

// Harness: arbitrary arrivals at one process. Rejections are fine; panics
// and clock regressions are not.

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use std::time::Duration;
use causal_core::time::{compare, PartialOrder};
use causal_core::{CausalProcess, GroupConfig, Message, ProcessId, VectorClock};

#[derive(Arbitrary, Debug, Clone)]
struct ArrivalFrame {
    sender: u8,
    recipients: Vec<u8>,
    snapshot: Vec<u16>,
}

fuzz_target!(|frames: Vec<ArrivalFrame>| {
    let config = GroupConfig::new(4).with_pending_capacity(64);
    let Ok(mut process) = CausalProcess::<u8>::new(ProcessId(1), &config) else {
        return;
    };

    for frame in frames {
        let before = process.clock().clone();
        let message = Message::new(
            ProcessId(frame.sender as usize),
            frame.recipients.iter().map(|r| ProcessId(*r as usize)).collect(),
            VectorClock::from_entries(frame.snapshot.iter().map(|v| *v as u64).collect()),
            0u8,
            Duration::ZERO,
        );
        let _ = process.deliver_incoming(message);
        let order = compare(&before, process.clock());
        assert!(order == PartialOrder::Equal || order == PartialOrder::LessThan);
    }
});
