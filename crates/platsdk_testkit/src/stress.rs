//! Stress tests for the SDK bridge.
//!
//! These tests verify behavior under concurrent access, including a
//! session closed while calls are in flight.

use crate::fixtures::TestPlatform;
use platsdk_bridge::{ErrorKind, Sdk};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Operations rejected because the session was closed.
    pub rejected_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, rejected: usize, duration: Duration) -> Self {
        let total = successful + failed + rejected;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            rejected_ops: rejected,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Rejected after close: {}", self.rejected_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform, across all threads.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
        }
    }
}

#[derive(Default)]
struct Counters {
    successful: AtomicUsize,
    failed: AtomicUsize,
    rejected: AtomicUsize,
}

impl Counters {
    fn record<T>(&self, result: &platsdk_bridge::SdkResult<T>) -> bool {
        match result {
            Ok(_) => {
                self.successful.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) if e.kind() == ErrorKind::ContextClosed => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    fn finish(&self, start: Instant) -> StressTestResult {
        StressTestResult::new(
            self.successful.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.rejected.load(Ordering::Relaxed),
            start.elapsed(),
        )
    }
}

/// Run concurrent balance reads on clones of one session.
pub fn stress_concurrent_reads(platform: &TestPlatform, config: &StressConfig) -> StressTestResult {
    let owner = platform.owner_id();
    let counters = Arc::new(Counters::default());
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let sdk = platform.sdk.clone();
            let counters = Arc::clone(&counters);
            thread::spawn(move || {
                for _ in 0..ops_per_thread {
                    counters.record(&sdk.identities().fetch_balance(&owner));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    counters.finish(start)
}

/// Run concurrent identity creation. Created identities are dropped at once.
pub fn stress_concurrent_creates(sdk: &Sdk, config: &StressConfig) -> StressTestResult {
    let counters = Arc::new(Counters::default());
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let sdk = sdk.clone();
            let counters = Arc::clone(&counters);
            thread::spawn(move || {
                for _ in 0..ops_per_thread {
                    counters.record(&sdk.identities().create());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    counters.finish(start)
}

/// Close the session while reader threads are calling it.
///
/// Readers loop until they see `ContextClosed`; the calling thread closes
/// the session once all readers have completed `warmup` reads each.
/// Every reader ends with exactly one rejected call.
pub fn stress_close_under_load(platform: &TestPlatform, config: &StressConfig, warmup: usize) -> StressTestResult {
    let owner = platform.owner_id();
    let counters = Arc::new(Counters::default());
    let ready = Arc::new(Barrier::new(config.threads + 1));

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let sdk = platform.sdk.clone();
            let counters = Arc::clone(&counters);
            let ready = Arc::clone(&ready);
            thread::spawn(move || {
                for _ in 0..warmup {
                    counters.record(&sdk.identities().fetch_balance(&owner));
                }
                ready.wait();
                while counters.record(&sdk.identities().fetch_balance(&owner)) {}
            })
        })
        .collect();

    ready.wait();
    platform.sdk.close();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    counters.finish(start)
}
