//! Default process metrics.
//!
//! Sampled on a fixed interval by a background task. Sources that are not
//! available on the current platform are skipped.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;

use faultline_core::error::Result;

use crate::obs::metrics::MetricsRegistry;

pub const PROCESS_CPU_USER_SECONDS_TOTAL: &str = "process_cpu_user_seconds_total";
pub const PROCESS_CPU_SYSTEM_SECONDS_TOTAL: &str = "process_cpu_system_seconds_total";
pub const PROCESS_CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";
pub const PROCESS_RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
pub const PROCESS_VIRTUAL_MEMORY_BYTES: &str = "process_virtual_memory_bytes";
pub const PROCESS_OPEN_FDS: &str = "process_open_fds";
pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";
pub const RUNTIME_SCHEDULER_LAG_SECONDS: &str = "runtime_scheduler_lag_seconds";

const COUNTERS: [(&str, &str); 3] = [
    (PROCESS_CPU_USER_SECONDS_TOTAL, "Total user CPU time spent in seconds"),
    (PROCESS_CPU_SYSTEM_SECONDS_TOTAL, "Total system CPU time spent in seconds"),
    (PROCESS_CPU_SECONDS_TOTAL, "Total user and system CPU time spent in seconds"),
];

const GAUGES: [(&str, &str); 5] = [
    (PROCESS_RESIDENT_MEMORY_BYTES, "Resident memory size in bytes"),
    (PROCESS_VIRTUAL_MEMORY_BYTES, "Virtual memory size in bytes"),
    (PROCESS_OPEN_FDS, "Number of open file descriptors"),
    (PROCESS_START_TIME_SECONDS, "Start time of the process since unix epoch in seconds"),
    (RUNTIME_SCHEDULER_LAG_SECONDS, "Delay between yielding to the async runtime and being polled again"),
];

/// Register the process counters and gauges.
pub fn register(registry: &MetricsRegistry) -> Result<()> {
    for (name, help) in COUNTERS {
        registry.register_float_counter(name, help, &[])?;
    }
    for (name, help) in GAUGES {
        registry.register_gauge(name, help, &[])?;
    }
    Ok(())
}

pub struct ProcessCollector {
    registry: Arc<MetricsRegistry>,
    start_time: f64,
}

impl ProcessCollector {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self { registry, start_time }
    }

    /// Take one sample of every available source.
    pub async fn collect(&self) -> Result<()> {
        let r = &self.registry;
        r.set(PROCESS_START_TIME_SECONDS, &[], self.start_time)?;

        match cpu_times() {
            Some((user, system)) => {
                r.set_total(PROCESS_CPU_USER_SECONDS_TOTAL, &[], user)?;
                r.set_total(PROCESS_CPU_SYSTEM_SECONDS_TOTAL, &[], system)?;
                r.set_total(PROCESS_CPU_SECONDS_TOTAL, &[], user + system)?;
            }
            None => tracing::debug!("cpu times unavailable"),
        }

        match tokio::fs::read_to_string("/proc/self/status").await {
            Ok(status) => {
                if let Some(kb) = status_kb(&status, "VmRSS") {
                    r.set(PROCESS_RESIDENT_MEMORY_BYTES, &[], (kb * 1024) as f64)?;
                }
                if let Some(kb) = status_kb(&status, "VmSize") {
                    r.set(PROCESS_VIRTUAL_MEMORY_BYTES, &[], (kb * 1024) as f64)?;
                }
            }
            Err(e) => tracing::debug!(error = %e, "memory stats unavailable"),
        }

        match open_fds().await {
            Ok(n) => r.set(PROCESS_OPEN_FDS, &[], n as f64)?,
            Err(e) => tracing::debug!(error = %e, "fd count unavailable"),
        }

        let lag = scheduler_lag().await;
        r.set(RUNTIME_SCHEDULER_LAG_SECONDS, &[], lag.as_secs_f64())?;
        Ok(())
    }

    /// Sample immediately, then every `interval`, until the task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.collect().await {
                    tracing::warn!(error = %e, "process metrics collection failed");
                }
            }
        })
    }
}

/// Parse a `Key:   1234 kB` line from `/proc/self/status`.
pub fn status_kb(status: &str, key: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let (k, rest) = line.split_once(':')?;
        if k != key {
            return None;
        }
        rest.split_whitespace().next()?.parse().ok()
    })
}

async fn open_fds() -> std::io::Result<usize> {
    let mut dir = tokio::fs::read_dir("/proc/self/fd").await?;
    let mut n = 0;
    while dir.next_entry().await?.is_some() {
        n += 1;
    }
    Ok(n)
}

async fn scheduler_lag() -> Duration {
    let start = Instant::now();
    tokio::task::yield_now().await;
    start.elapsed()
}

#[cfg(unix)]
fn cpu_times() -> Option<(f64, f64)> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage fills the whole struct on success; we only read it then.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0, so the struct was initialized.
    let usage = unsafe { usage.assume_init() };
    let secs = |t: libc::timeval| t.tv_sec as f64 + t.tv_usec as f64 / 1_000_000.0;
    Some((secs(usage.ru_utime), secs(usage.ru_stime)))
}

#[cfg(not(unix))]
fn cpu_times() -> Option<(f64, f64)> {
    None
}
