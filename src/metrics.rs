//! Prometheus-compatible metrics endpoint
//!
//! Exposes arena counters in Prometheus text format and as JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::DecisionError;
use crate::game::game_loop::TickReport;

const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the arena server
#[derive(Debug)]
pub struct Metrics {
    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // World
    pub agents: AtomicU64,
    pub pickups_present: AtomicU64,
    pub pickups_spawned: AtomicU64,
    pub pickups_collected: AtomicU64,
    pub wall_contacts: AtomicU64,
    pub agent_contacts: AtomicU64,

    // Decisions
    pub decisions_applied: AtomicU64,
    pub decisions_malformed: AtomicU64,
    pub decisions_transport: AtomicU64,
    pub decisions_rate_limited: AtomicU64,
    pub rate_limit_active: AtomicU64, // 0 or 1

    // Observers and supervision
    pub observers_connected: AtomicU64,
    pub task_failures: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            agents: AtomicU64::new(0),
            pickups_present: AtomicU64::new(0),
            pickups_spawned: AtomicU64::new(0),
            pickups_collected: AtomicU64::new(0),
            wall_contacts: AtomicU64::new(0),
            agent_contacts: AtomicU64::new(0),
            decisions_applied: AtomicU64::new(0),
            decisions_malformed: AtomicU64::new(0),
            decisions_transport: AtomicU64::new(0),
            decisions_rate_limited: AtomicU64::new(0),
            rate_limit_active: AtomicU64::new(0),
            observers_connected: AtomicU64::new(0),
            task_failures: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Fold one tick's counters into the registry
    pub fn record_tick(&self, report: &TickReport, agents: usize, pickups: usize) {
        self.agents.store(agents as u64, Ordering::Relaxed);
        self.pickups_present.store(pickups as u64, Ordering::Relaxed);
        self.pickups_collected.fetch_add(report.collected as u64, Ordering::Relaxed);
        self.wall_contacts.fetch_add(report.wall_contacts as u64, Ordering::Relaxed);
        self.agent_contacts.fetch_add(report.agent_contacts as u64, Ordering::Relaxed);
        if report.spawned.is_some() {
            self.pickups_spawned.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one decision attempt by outcome
    pub fn record_decision(&self, outcome: Result<(), &DecisionError>) {
        let counter = match outcome {
            Ok(()) => &self.decisions_applied,
            Err(DecisionError::RateLimited) => &self.decisions_rate_limited,
            Err(DecisionError::MalformedResponse(_)) => &self.decisions_malformed,
            Err(DecisionError::Transport(_)) => &self.decisions_transport,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_rate_limited(&self, active: bool) {
        self.rate_limit_active.store(active as u64, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Performance metrics
        metric!("llm_arena_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("llm_arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("llm_arena_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("llm_arena_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("llm_arena_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        // World metrics
        metric!("llm_arena_agents", "Number of agents in the arena", "gauge",
            self.agents.load(Ordering::Relaxed));
        metric!("llm_arena_pickups", "Pickups currently in the arena", "gauge",
            self.pickups_present.load(Ordering::Relaxed));
        metric!("llm_arena_pickups_spawned_total", "Pickups spawned", "counter",
            self.pickups_spawned.load(Ordering::Relaxed));
        metric!("llm_arena_pickups_collected_total", "Pickups collected", "counter",
            self.pickups_collected.load(Ordering::Relaxed));
        metric!("llm_arena_wall_contacts_total", "Wall bounces", "counter",
            self.wall_contacts.load(Ordering::Relaxed));
        metric!("llm_arena_agent_contacts_total", "Agent-agent contacts", "counter",
            self.agent_contacts.load(Ordering::Relaxed));

        // Decision metrics
        output.push_str(
            "# HELP llm_arena_decisions_total Direction decisions by outcome\n# TYPE llm_arena_decisions_total counter\n",
        );
        for (outcome, counter) in [
            ("applied", &self.decisions_applied),
            ("malformed", &self.decisions_malformed),
            ("transport", &self.decisions_transport),
            ("rate_limited", &self.decisions_rate_limited),
        ] {
            output.push_str(&format!(
                "llm_arena_decisions_total{{outcome=\"{}\"}} {}\n",
                outcome,
                counter.load(Ordering::Relaxed)
            ));
        }
        metric!("llm_arena_rate_limit_active", "Completion rate-limit cooldown active (0/1)", "gauge",
            self.rate_limit_active.load(Ordering::Relaxed));

        // Server
        metric!("llm_arena_observers_connected", "Connected observer feeds", "gauge",
            self.observers_connected.load(Ordering::Relaxed));
        metric!("llm_arena_task_failures_total", "Failures reported by periodic tasks", "counter",
            self.task_failures.load(Ordering::Relaxed));
        metric!("llm_arena_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics (alternative for direct API access)
    pub fn to_json(&self) -> String {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        serde_json::json!({
            "performance": {
                "tick_time_us": load(&self.tick_time_us),
                "tick_time_p95_us": load(&self.tick_time_p95_us),
                "tick_time_p99_us": load(&self.tick_time_p99_us),
                "tick_time_max_us": load(&self.tick_time_max_us),
                "tick_count": load(&self.tick_count),
            },
            "world": {
                "agents": load(&self.agents),
                "pickups": load(&self.pickups_present),
                "pickups_spawned": load(&self.pickups_spawned),
                "pickups_collected": load(&self.pickups_collected),
                "wall_contacts": load(&self.wall_contacts),
                "agent_contacts": load(&self.agent_contacts),
            },
            "decisions": {
                "applied": load(&self.decisions_applied),
                "malformed": load(&self.decisions_malformed),
                "transport": load(&self.decisions_transport),
                "rate_limited": load(&self.decisions_rate_limited),
                "rate_limit_active": load(&self.rate_limit_active) == 1,
            },
            "server": {
                "observers": load(&self.observers_connected),
                "task_failures": load(&self.task_failures),
                "uptime_seconds": self.uptime_seconds(),
            },
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the HTTP response for one request
fn respond(metrics: &Metrics, request: &str) -> String {
    let (content_type, body) = if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        ("application/json", metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        ("text/plain; version=0.0.4", metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        ("text/plain", "OK".to_string())
    } else {
        return "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
    };

    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, address: IpAddr, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::new(address, port);
    let listener = TcpListener::bind(addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = respond(&metrics, &request);

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.agents.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_tick_time() {
        let metrics = Metrics::new();

        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert!(metrics.tick_time_p95_us.load(Ordering::Relaxed) > 0);
        assert!(metrics.tick_time_p99_us.load(Ordering::Relaxed) > 0);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
    }

    #[test]
    fn test_record_tick_counters() {
        let metrics = Metrics::new();
        let report = TickReport {
            tick: 1,
            wall_contacts: 2,
            agent_contacts: 1,
            collected: 1,
            spawned: Some(4),
        };

        metrics.record_tick(&report, 3, 2);
        metrics.record_tick(&TickReport::default(), 3, 1);

        assert_eq!(metrics.agents.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.pickups_present.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.pickups_spawned.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.wall_contacts.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_record_decision_outcomes() {
        let metrics = Metrics::new();
        metrics.record_decision(Ok(()));
        metrics.record_decision(Err(&DecisionError::RateLimited));
        metrics.record_decision(Err(&DecisionError::RateLimited));
        metrics.record_decision(Err(&DecisionError::Transport("status 500".into())));

        assert_eq!(metrics.decisions_applied.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.decisions_rate_limited.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.decisions_transport.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.decisions_malformed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.agents.store(3, Ordering::Relaxed);
        metrics.decisions_applied.store(7, Ordering::Relaxed);

        let output = metrics.to_prometheus();

        assert!(output.contains("llm_arena_agents 3"));
        assert!(output.contains("llm_arena_decisions_total{outcome=\"applied\"} 7"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.pickups_collected.store(12, Ordering::Relaxed);
        metrics.set_rate_limited(true);

        let value: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();

        assert_eq!(value["world"]["pickups_collected"], 12);
        assert_eq!(value["decisions"]["rate_limit_active"], true);
    }

    #[test]
    fn test_routes() {
        let metrics = Metrics::new();

        assert!(respond(&metrics, "GET /metrics HTTP/1.1\r\n").contains("llm_arena_tick_count"));
        assert!(respond(&metrics, "GET /json HTTP/1.1\r\n").contains("application/json"));
        assert!(respond(&metrics, "GET /metrics/json HTTP/1.1\r\n").contains("application/json"));
        assert!(respond(&metrics, "GET /health HTTP/1.1\r\n").ends_with("OK"));
        assert!(respond(&metrics, "GET /nope HTTP/1.1\r\n").starts_with("HTTP/1.1 404"));
    }
}
