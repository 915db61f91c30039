//! Basic retry and circuit breaker usage example
//!
//! Run with `RUST_LOG=failover_machines=debug` to see transition logs.

use failover_machines::{CircuitBreaker, Context, retry};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Circuit Breaker Basic Example ===\n");

    let circuit = CircuitBreaker::builder("payment_api")
        .failure_threshold(3)
        .success_threshold(2)
        .open_timeout(Duration::from_millis(500))
        .on_open(|name| println!("🔴 Circuit '{}' opened!", name))
        .on_close(|name| println!("🟢 Circuit '{}' closed!", name))
        .on_half_open(|name| println!("🟡 Circuit '{}' half-open, testing...", name))
        .build();

    println!("Initial state: {}\n", circuit.state_name());

    println!("--- Successful calls ---");
    for i in 1..=2 {
        match circuit.call(move || Ok::<_, String>(format!("Payment {}", i))) {
            Ok(result) => println!("✓ {}", result),
            Err(e) => println!("✗ Error: {}", e),
        }
    }
    println!("State: {}\n", circuit.state_name());

    println!("--- Triggering failures ---");
    for i in 1..=3 {
        match circuit.call(move || Err::<String, _>(format!("Payment failed {}", i))) {
            Ok(_) => println!("✓ Success"),
            Err(e) => println!("✗ {}", e),
        }
    }
    println!("State: {} (circuit opened)\n", circuit.state_name());

    println!("--- Attempting call while open ---");
    match circuit.call(|| Ok::<_, String>("Should be rejected")) {
        Ok(_) => println!("✓ Success"),
        Err(e) => println!("✗ {}", e),
    }
    println!();

    // Retry the guarded call; the first attempts are rejected until the cooldown elapses
    println!("--- Retrying through the breaker ---");
    let ctx = Context::new().with_timeout(Duration::from_secs(5));
    let attempts = AtomicU32::new(0);
    let result = retry(&ctx, 6, Duration::from_millis(100), || async {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = circuit.call(|| Ok::<_, String>("Payment successful"));
        if let Err(e) = &outcome {
            println!("  attempt {}: {}", attempt, e);
        }
        outcome
    })
    .await;

    match result {
        Ok(value) => println!("✓ {} after {} attempts", value, attempts.load(Ordering::SeqCst)),
        Err(e) => println!("✗ {}", e),
    }
    println!("State: {}\n", circuit.state_name());

    println!("--- Closing the circuit ---");
    let _ = circuit.call(|| Ok::<_, String>("Payment successful"));
    println!("State: {}", circuit.state_name());
    println!("Stats: {:?}", circuit.stats());
}
