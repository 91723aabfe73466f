//! Demonstrates a burst of threads queuing behind a full window.
use std::time::{Duration, Instant};
use windowgate::{AdmissionGate, GateConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let gate = AdmissionGate::new(GateConfig::new(
        3,
        Duration::from_millis(200),
        Duration::from_millis(500),
    )?);
    let start = Instant::now();

    let workers: Vec<_> = (0..10)
        .map(|id| {
            let gate = gate.clone();
            std::thread::spawn(move || (id, gate.acquire()))
        })
        .collect();

    for worker in workers {
        let (id, outcome) = worker.join().map_err(|_| "worker panicked")?;
        match outcome {
            Ok(permit) => println!(
                "worker {id:>2}: admitted at {:>4?} after waiting {:?}",
                start.elapsed(),
                permit.waited()
            ),
            Err(timeout) => println!("worker {id:>2}: {timeout}"),
        }
    }
    Ok(())
}
