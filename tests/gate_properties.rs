//! Real-clock properties of the admission gate under concurrent callers.
use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use windowgate::{AcquireTimeout, AdmissionGate, GateConfig, Permit};

fn gate(limit: u32, period: Duration, timeout: Duration) -> AdmissionGate {
    AdmissionGate::new(GateConfig::new(limit, period, timeout).expect("valid config"))
}

fn simultaneous(gate: &AdmissionGate, callers: usize) -> Vec<Result<Permit, AcquireTimeout>> {
    let barrier = Arc::new(Barrier::new(callers));
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let gate = gate.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                gate.acquire()
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().expect("caller panicked")).collect()
}

#[test]
fn zero_budget_admits_exactly_limit_of_simultaneous_callers() {
    for _ in 0..20 {
        let gate = gate(2, Duration::from_secs(1), Duration::ZERO);
        let outcomes = simultaneous(&gate, 3);

        let granted = outcomes.iter().filter(|o| o.is_ok()).count();
        let timed_out = outcomes.iter().filter(|o| o.is_err()).count();
        assert_eq!((granted, timed_out), (2, 1));
    }
}

#[test]
fn excess_callers_are_granted_in_later_windows_or_time_out() {
    let limit = 3;
    let gate = gate(limit, Duration::from_millis(100), Duration::from_millis(250));
    let outcomes = simultaneous(&gate, 10);

    let mut per_window: HashMap<u64, u32> = HashMap::new();
    for permit in outcomes.iter().flatten() {
        *per_window.entry(permit.window_start_millis()).or_default() += 1;
    }
    assert!(per_window.values().all(|&n| n <= limit), "per-window grants: {:?}", per_window);

    let immediate = outcomes.iter().flatten().filter(|p| p.waited().is_zero()).count();
    assert_eq!(immediate, limit as usize);

    let timed_out = outcomes.iter().filter(|o| o.is_err()).count();
    let granted = outcomes.len() - timed_out;
    assert!(granted >= limit as usize * 2, "at least one reset within 250ms, got {granted}");
}

#[test]
fn calls_spaced_past_the_period_are_both_immediate() {
    let gate = gate(1, Duration::from_millis(100), Duration::from_millis(500));

    let first = gate.acquire().expect("first");
    thread::sleep(Duration::from_millis(150));
    let second = gate.acquire().expect("second");

    assert_eq!(second.waited(), Duration::ZERO);
    assert!(second.window_start_millis() >= first.window_start_millis() + 100);
}

#[test]
fn close_calls_wait_for_the_window_to_reset() {
    let gate = gate(1, Duration::from_millis(100), Duration::from_millis(500));

    let _ = gate.acquire().expect("first");
    thread::sleep(Duration::from_millis(10));

    let start = Instant::now();
    let second = gate.acquire().expect("second granted after reset");
    let elapsed = start.elapsed();

    assert!(second.waited() >= Duration::from_millis(60), "waited {:?}", second.waited());
    assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
}

#[test]
fn timed_out_callers_do_not_hold_up_others() {
    let gate = gate(1, Duration::from_millis(200), Duration::from_millis(50));
    let _ = gate.acquire().expect("first");

    let start = Instant::now();
    let err = gate.acquire().expect_err("next window is beyond the budget");
    assert!(start.elapsed() < Duration::from_millis(50));
    assert_eq!(err.timeout, Duration::from_millis(50));

    thread::sleep(Duration::from_millis(210));
    let permit = gate.acquire().expect("refused caller consumed nothing");
    assert_eq!(permit.waited(), Duration::ZERO);
    assert_eq!(gate.snapshot().granted, 1);
}

#[test]
fn stress_never_exceeds_limit_per_window() {
    let limit = 5;
    let period = Duration::from_millis(100);
    let timeout = Duration::from_millis(300);
    let gate = gate(limit, period, timeout);
    let run_for = Duration::from_millis(800);
    let threads = 8;

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let gate = gate.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let mut waits: Histogram<u64> = Histogram::new(3).unwrap();
                let mut grants = Vec::new();
                barrier.wait();
                let start = Instant::now();
                while start.elapsed() < run_for {
                    let called = Instant::now();
                    if let Ok(permit) = gate.acquire() {
                        let granted_at = Instant::now();
                        grants.push((granted_at, permit.window_start_millis()));
                        waits.record((granted_at - called).as_micros() as u64).unwrap();
                    }
                }
                (grants, waits)
            })
        })
        .collect();

    let mut grants: Vec<(Instant, u64)> = Vec::new();
    let mut waits: Histogram<u64> = Histogram::new(3).unwrap();
    for handle in handles {
        let (sub_grants, sub_waits) = handle.join().expect("worker panicked");
        grants.extend(sub_grants);
        waits += sub_waits;
    }
    assert!(!grants.is_empty());
    grants.sort_by_key(|&(at, _)| at);

    // Fixed windows allow at most two windows' worth of grants in any span of one period.
    // The span is trimmed to absorb millisecond clock truncation and reporting latency.
    let span = period - Duration::from_millis(20);
    let mut per_span: Histogram<u64> = Histogram::new(3).unwrap();
    let mut end = 0;
    for (start, &(opened, _)) in grants.iter().enumerate() {
        while end < grants.len() && grants[end].0 < opened + span {
            end += 1;
        }
        per_span.record((end - start) as u64).unwrap();
    }
    assert!(
        per_span.max() <= 2 * u64::from(limit),
        "{} grants within {:?}",
        per_span.max(),
        span
    );

    // Grants the gate attributes to one window all land within a period of its first grant.
    let slack = Duration::from_millis(30);
    let mut windows: HashMap<u64, (Instant, Instant, u32)> = HashMap::new();
    for &(at, window) in &grants {
        let entry = windows.entry(window).or_insert((at, at, 0));
        entry.0 = entry.0.min(at);
        entry.1 = entry.1.max(at);
        entry.2 += 1;
    }
    for (window, (first, last, count)) in &windows {
        assert!(*count <= limit, "window {window} granted {count}");
        assert!(*last - *first <= period + slack, "window {window} spread over {:?}", *last - *first);
    }

    // Granted callers are admitted within the budget, give or take scheduler latency.
    let max_wait = Duration::from_micros(waits.max());
    assert!(max_wait <= timeout + Duration::from_millis(100), "max wait {:?}", max_wait);
}
