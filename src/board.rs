// src/board.rs - The board task: owns the scanner and reporter
use embedded_hal::delay::DelayNs;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::config::{Config, MacAddress};
use crate::hardware::SensorMatrix;
use crate::reporter::{ReportRoute, StateReporter};
use crate::scanner::{GridConfig, GridScanner, GridSnapshot, Multiplexer, ScanOutcome};
use crate::web::models::BoardStatusResponse;

pub use crate::web::board_channel::BoardRequest;

/// Static identity reported by the status endpoint.
#[derive(Debug, Clone)]
pub struct BoardIdentity {
    pub name: String,
    pub mac: MacAddress,
    pub ip: std::net::Ipv4Addr,
}

impl BoardIdentity {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.board.name.clone(),
            mac: config.network.mac,
            ip: config.network.ip,
        }
    }
}

/// Single owner of all mutable board state.
///
/// Every scan and every query goes through `&mut self`, so queries are always
/// answered from a fully settled snapshot.
pub struct Board<M, D> {
    identity: BoardIdentity,
    scanner: GridScanner<M, D>,
    reporter: StateReporter,
    routes: Vec<ReportRoute>,
    interval: Duration,
}

impl<M: SensorMatrix, D: DelayNs> Board<M, D> {
    pub fn new(
        identity: BoardIdentity,
        scanner: GridScanner<M, D>,
        reporter: StateReporter,
        routes: Vec<ReportRoute>,
        interval: Duration,
    ) -> Self {
        Self {
            identity,
            scanner,
            reporter,
            routes,
            interval,
        }
    }

    /// Wires a board from validated configuration.
    pub fn from_config(
        config: &Config,
        grid: &GridConfig,
        matrix: M,
        delay: D,
        routes: Vec<ReportRoute>,
    ) -> Self {
        let multiplexer = Multiplexer::new(grid, matrix, delay);
        let scanner = GridScanner::new(grid, multiplexer);
        let reporter = StateReporter::new(config.scan.outbox_capacity)
            .with_full_report_every(config.scan.full_report_every);
        Self::new(
            BoardIdentity::from_config(config),
            scanner,
            reporter,
            routes,
            config.scan.interval(),
        )
    }

    /// One scan cycle: scan, hand off, then push whatever the reporter queued.
    pub async fn tick(&mut self) -> ScanOutcome {
        let outcome = self.scanner.trigger_scan(&mut self.reporter);
        if self.reporter.pending() > 0 {
            self.reporter.publish(&self.routes).await;
        }
        outcome
    }

    pub fn handle_request(&mut self, request: BoardRequest) {
        match request {
            BoardRequest::Query { format, respond_to } => {
                let result = self
                    .reporter
                    .answer_query(self.scanner.current(), format)
                    .map_err(|e| e.to_string());
                if respond_to.send(result).is_err() {
                    tracing::debug!("Query requester went away before the answer");
                }
            }
            BoardRequest::Status { respond_to } => {
                if respond_to.send(self.status()).is_err() {
                    tracing::debug!("Status requester went away before the answer");
                }
            }
        }
    }

    pub fn status(&self) -> BoardStatusResponse {
        let snapshot = self.scanner.current();
        BoardStatusResponse {
            name: self.identity.name.clone(),
            mac: self.identity.mac.to_string(),
            ip: self.identity.ip.to_string(),
            rows: snapshot.rows(),
            columns: snapshot.columns(),
            sequence: snapshot.sequence(),
            filled: snapshot.filled_count(),
            state: self.scanner.state(),
            scan: self.scanner.stats().clone(),
            reporter: self.reporter.stats().clone(),
        }
    }

    pub fn snapshot(&self) -> &GridSnapshot {
        self.scanner.current()
    }

    pub fn reporter(&self) -> &StateReporter {
        &self.reporter
    }

    pub fn scanner_mut(&mut self) -> &mut GridScanner<M, D> {
        &mut self.scanner
    }

    /// Runs until shutdown or until every request sender is gone.
    ///
    /// Ticks that fall due while a cycle is still running are skipped rather
    /// than queued and counted as dropped triggers. Pending requests are
    /// served before the next tick.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<BoardRequest>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(
            "Scanning {}x{} grid every {:?}",
            self.scanner.current().rows(),
            self.scanner.current().columns(),
            self.interval
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let period = self.interval.as_nanos().max(1);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Board loop shutting down");
                    break;
                }
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        tracing::info!("Request channel closed, stopping board loop");
                        break;
                    }
                },
                scheduled = interval.tick() => {
                    // every whole period between the deadline and now was a skipped tick
                    let late = Instant::now().saturating_duration_since(scheduled);
                    self.scanner.record_dropped_triggers((late.as_nanos() / period) as u64);
                    self.tick().await;
                }
            }
        }
        let stats = self.scanner.stats();
        tracing::info!(
            "Stopped after {} passes ({} failed), last snapshot #{}",
            stats.passes,
            stats.acquisition_errors,
            self.scanner.current().sequence()
        );
    }
}
