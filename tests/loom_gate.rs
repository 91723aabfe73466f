//! Model-checked interleavings of the gate's fast path.
//!
//! Run with: RUSTFLAGS="--cfg loom" cargo test --release --test loom_gate
#![cfg(loom)]

use std::time::Duration;
use windowgate::{AdmissionGate, GateConfig, ManualClock};

fn gate(limit: u32, clock: ManualClock) -> AdmissionGate {
    let config = GateConfig::new(limit, Duration::from_millis(100), Duration::ZERO).unwrap();
    AdmissionGate::with_clock(config, clock)
}

#[test]
fn racing_callers_never_share_the_last_permit() {
    loom::model(|| {
        let gate = gate(1, ManualClock::new());
        let other = gate.clone();
        let handle = loom::thread::spawn(move || other.acquire().is_ok());

        let mine = gate.acquire().is_ok();
        let theirs = handle.join().unwrap();
        assert!(mine ^ theirs, "exactly one caller must win (mine={mine}, theirs={theirs})");
        assert_eq!(gate.snapshot().granted, 1);
    });
}

#[test]
fn reset_and_grant_are_atomic() {
    loom::model(|| {
        let clock = ManualClock::new();
        let gate = gate(2, clock.clone());
        let _ = gate.acquire().unwrap();
        let _ = gate.acquire().unwrap();
        clock.advance(Duration::from_millis(100));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let gate = gate.clone();
                loom::thread::spawn(move || gate.acquire().map(|p| p.window_start_millis()))
            })
            .collect();
        let windows: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(windows, vec![Ok(100), Ok(100)]);
        assert_eq!(gate.snapshot().granted, 2);
    });
}
