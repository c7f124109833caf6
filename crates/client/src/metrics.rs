//! Gateway metrics: single reads, bounded time series, and a polling loop.
//!
//! Mirrors the dashboard's monitor cards: CPU, process RAM, host RAM in use,
//! total host RAM, response time and open connections, each capped at
//! [`MAX_POINTS`] with the oldest points evicted first.

use crate::guarded::GuardedClient;
use gerbang_core::error::{GerbangError, GerbangResult};
use gerbang_core::protocol::METRICS_PATH;
use gerbang_core::MetricsSnapshot;
use gerbang_provider::Transport;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime};
use tokio::time::{Interval, MissedTickBehavior};

/// Points kept per series.
pub const MAX_POINTS: usize = 100;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shorter periods are clamped up to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One `/metrics` read with its round-trip time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSample {
    /// Unix time in milliseconds.
    pub at_ms: u64,
    pub response_ms: u64,
    pub snapshot: MetricsSnapshot,
}

/// A bounded `(unix_ms, value)` series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    points: VecDeque<(u64, f64)>,
    capacity: usize,
}

impl Series {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at_ms: u64, value: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back((at_ms, value));
    }

    pub fn points(&self) -> impl Iterator<Item = &(u64, f64)> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<(u64, f64)> {
        self.points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsHistory {
    /// Process CPU, percent, one decimal.
    pub cpu: Series,
    /// Process RAM in MB.
    pub process_ram: Series,
    /// Host RAM in use, MB.
    pub os_ram: Series,
    /// Installed host RAM, MB.
    pub total_ram: Series,
    /// Round-trip of the metrics call, ms.
    pub response_time: Series,
    pub connections: Series,
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new(MAX_POINTS)
    }
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: Series::new(capacity),
            process_ram: Series::new(capacity),
            os_ram: Series::new(capacity),
            total_ram: Series::new(capacity),
            response_time: Series::new(capacity),
            connections: Series::new(capacity),
        }
    }

    pub fn record(&mut self, sample: &MetricsSample) {
        let at = sample.at_ms;
        let m = &sample.snapshot;
        self.cpu.push(at, round_to(m.pid.cpu, 1));
        self.process_ram.push(at, megabytes(m.pid.ram));
        self.os_ram.push(at, megabytes(m.os.ram));
        self.total_ram.push(at, megabytes(m.os.total_ram));
        self.response_time.push(at, sample.response_ms as f64);
        self.connections.push(at, m.pid.conns as f64);
    }

    pub fn series(&self) -> [&Series; 6] {
        [
            &self.cpu,
            &self.process_ram,
            &self.os_ram,
            &self.total_ram,
            &self.response_time,
            &self.connections,
        ]
    }
}

impl<T: Transport> GuardedClient<T> {
    /// Reads `/metrics` once, timing the round trip.
    pub async fn fetch_metrics(&self) -> GerbangResult<MetricsSample> {
        let started = Instant::now();
        let response = self.get(self.base().endpoint(METRICS_PATH)).await?;
        let elapsed = started.elapsed();

        if !response.is_success() {
            return Err(GerbangError::Rejected(format!(
                "metrics unavailable (HTTP {})",
                response.status
            )));
        }

        let snapshot: MetricsSnapshot = response
            .json()
            .map_err(|e| GerbangError::Decode(format!("metrics: {e}")))?;

        Ok(MetricsSample {
            at_ms: unix_ms(),
            response_ms: elapsed.as_millis() as u64,
            snapshot,
        })
    }
}

/// Polls `/metrics` on a fixed period and keeps the history.
///
/// ```ignore
/// let mut poller = MetricsPoller::new(&client, DEFAULT_POLL_INTERVAL);
/// loop {
///     let sample = poller.next().await?;
///     println!("cpu {}", sample.snapshot.pid.cpu);
/// }
/// ```
pub struct MetricsPoller<'a, T> {
    client: &'a GuardedClient<T>,
    interval: Interval,
    history: MetricsHistory,
}

impl<'a, T: Transport> MetricsPoller<'a, T> {
    pub fn new(client: &'a GuardedClient<T>, period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(MIN_POLL_INTERVAL));
        // A slow gateway must not cause a burst of catch-up reads.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            client,
            interval,
            history: MetricsHistory::default(),
        }
    }

    /// Waits for the next tick (the first one is immediate), then reads and
    /// records one sample. Failed reads leave the history untouched.
    pub async fn next(&mut self) -> GerbangResult<MetricsSample> {
        self.interval.tick().await;
        let sample = self.client.fetch_metrics().await?;
        self.history.record(&sample);
        Ok(sample)
    }

    /// Runs `ticks` polls, logging and skipping failed reads.
    pub async fn run(mut self, ticks: usize) -> MetricsHistory {
        for tick in 0..ticks {
            if let Err(e) = self.next().await {
                tracing::warn!(tick, error = %e, "metrics poll failed");
            }
        }
        self.history
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }
}

/// Human-readable size in 1024 steps with at most one decimal, e.g.
/// `1.5 KB`. Zero is `0 Bytes`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", round_to(value, 1), UNITS[unit])
}

fn megabytes(bytes: u64) -> f64 {
    round_to(bytes as f64 / 1e6, 2)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, json, ScriptedTransport};
    use gerbang_provider::HttpResponse;
    use serde_json::json as j;

    fn monitor_body(cpu: f64, conns: u64) -> serde_json::Value {
        j!({
            "pid": { "cpu": cpu, "ram": 52_428_800u64, "conns": conns },
            "os": { "cpu": 12.5, "ram": 4_000_000_000u64, "total_ram": 16_000_000_000u64,
                    "load_avg": 0.42, "conns": 120 }
        })
    }

    #[test]
    fn series_evicts_oldest() {
        let mut s = Series::new(3);
        for i in 0..5 {
            s.push(i, i as f64);
        }
        assert_eq!(s.len(), 3);
        assert_eq!(s.points().next(), Some(&(2, 2.0)));
        assert_eq!(s.latest(), Some((4, 4.0)));
    }

    #[test]
    fn history_caps_every_series() {
        let mut history = MetricsHistory::default();
        let sample = MetricsSample {
            at_ms: 0,
            response_ms: 3,
            snapshot: serde_json::from_value(monitor_body(1.26, 4)).unwrap(),
        };
        for _ in 0..(MAX_POINTS + 20) {
            history.record(&sample);
        }
        assert!(history.series().iter().all(|s| s.len() == MAX_POINTS));
        assert_eq!(history.cpu.latest().map(|p| p.1), Some(1.3));
        assert_eq!(history.process_ram.latest().map(|p| p.1), Some(52.43));
        assert_eq!(history.total_ram.latest().map(|p| p.1), Some(16000.0));
        assert_eq!(history.connections.latest().map(|p| p.1), Some(4.0));
    }

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(52_428_800), "50 MB");
        assert_eq!(format_bytes(16 * 1024 * 1024 * 1024), "16 GB");
    }

    #[tokio::test]
    async fn fetch_metrics_parses_monitor() {
        let c = client(ScriptedTransport::new([json(200, monitor_body(3.0, 7))]));
        let sample = c.fetch_metrics().await.unwrap();
        assert_eq!(sample.snapshot.pid.conns, 7);
        assert_eq!(sample.snapshot.os.load_avg, 0.42);
        assert!(sample.at_ms > 0);
        assert_eq!(c.transport().token_fetches(), 0);
    }

    #[tokio::test]
    async fn fetch_metrics_rejects_error_status() {
        let c = client(ScriptedTransport::new([Ok(HttpResponse::new(503, ""))]));
        assert!(matches!(
            c.fetch_metrics().await,
            Err(GerbangError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn poller_skips_failed_reads() {
        let c = client(ScriptedTransport::new([
            json(200, monitor_body(1.0, 1)),
            Ok(HttpResponse::new(500, "")),
            json(200, monitor_body(2.0, 2)),
        ]));

        let history = MetricsPoller::new(&c, Duration::ZERO).run(3).await;

        assert_eq!(history.cpu.len(), 2);
        assert_eq!(history.connections.latest().map(|p| p.1), Some(2.0));
        assert_eq!(c.transport().requests().len(), 3);
    }
}
