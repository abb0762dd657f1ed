//! Best-effort publication of grid state.
//!
//! The scanner hands each settled snapshot to [`StateReporter`] synchronously.
//! The reporter queues what needs publishing in a bounded outbox, and
//! [`StateReporter::publish`] later pushes the outbox down every configured
//! route, encoding each message in the format that route expects. A send
//! failure drops that message for that route and is counted; it never reaches
//! the scanner. The next change (or periodic full report) carries current truth.

pub mod wire;

use serde::Serialize;
use std::collections::VecDeque;

use crate::communication::Transport;
use crate::scanner::grid_scanner::ReportSink;
use crate::scanner::sample::{ChangeEvent, GridSnapshot};
use wire::{WireError, WireFormat, WireMessage};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReporterStats {
    /// Successful sends, counted per route.
    pub sent: u64,
    pub send_failures: u64,
    pub encode_failures: u64,
    /// Messages discarded because the outbox was full.
    pub overflowed: u64,
    pub queries: u64,
}

/// A transport paired with the encoding its receiver expects.
pub struct ReportRoute {
    format: WireFormat,
    transport: Box<dyn Transport>,
}

impl ReportRoute {
    pub fn new(format: WireFormat, transport: impl Transport + 'static) -> Self {
        Self::boxed(format, Box::new(transport))
    }

    pub fn boxed(format: WireFormat, transport: Box<dyn Transport>) -> Self {
        Self { format, transport }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

pub struct StateReporter {
    outbox: VecDeque<WireMessage>,
    outbox_capacity: usize,
    full_report_every: u64,
    stats: ReporterStats,
}

impl StateReporter {
    pub fn new(outbox_capacity: usize) -> Self {
        let outbox_capacity = outbox_capacity.max(1);
        Self {
            outbox: VecDeque::with_capacity(outbox_capacity),
            outbox_capacity,
            full_report_every: 0,
            stats: ReporterStats::default(),
        }
    }

    /// Also push the full grid every `passes` snapshots (0 disables).
    pub fn with_full_report_every(mut self, passes: u64) -> Self {
        self.full_report_every = passes;
        self
    }

    pub fn stats(&self) -> &ReporterStats {
        &self.stats
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// On-demand pull: the full current grid, whether or not anything changed.
    pub fn answer_query(
        &mut self,
        snapshot: &GridSnapshot,
        format: WireFormat,
    ) -> Result<Vec<u8>, WireError> {
        self.stats.queries += 1;
        wire::encode(&WireMessage::snapshot(snapshot), format)
    }

    /// Sends everything queued so far down every route and empties the outbox.
    ///
    /// Returns the number of successful sends across all routes.
    pub async fn publish(&mut self, routes: &[ReportRoute]) -> usize {
        let mut delivered = 0;
        while let Some(message) = self.outbox.pop_front() {
            for route in routes {
                if self.deliver(&message, route).await {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    async fn deliver(&mut self, message: &WireMessage, route: &ReportRoute) -> bool {
        let bytes = match wire::encode(message, route.format) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.encode_failures += 1;
                tracing::error!("Failed to encode report #{}: {}", message.sequence(), e);
                return false;
            }
        };
        match route.transport.send(&bytes).await {
            Ok(()) => {
                self.stats.sent += 1;
                true
            }
            Err(e) => {
                self.stats.send_failures += 1;
                tracing::warn!(
                    "Dropping report #{} via {} ({} failures so far): {}",
                    message.sequence(),
                    route.transport.name(),
                    self.stats.send_failures,
                    e
                );
                false
            }
        }
    }

    fn enqueue(&mut self, message: WireMessage) {
        if self.outbox.len() >= self.outbox_capacity {
            self.outbox.pop_front();
            self.stats.overflowed += 1;
            tracing::warn!("Report outbox full, discarding oldest message");
        }
        self.outbox.push_back(message);
    }
}

impl ReportSink for StateReporter {
    fn hand_off(&mut self, snapshot: &GridSnapshot, change: Option<&ChangeEvent>) {
        if let Some(change) = change {
            self.enqueue(WireMessage::change(change, snapshot.rows(), snapshot.columns()));
        }
        if self.full_report_every > 0 && snapshot.sequence() % self.full_report_every == 0 {
            self.enqueue(WireMessage::snapshot(snapshot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::memory::MemoryTransport;
    use std::sync::Arc;
    use crate::scanner::sample::CellState;

    fn snapshots() -> (GridSnapshot, GridSnapshot) {
        let before = GridSnapshot::initial(2, 2);
        let after = GridSnapshot::from_cells(
            1,
            2,
            2,
            vec![CellState::Off, CellState::On, CellState::Off, CellState::Off],
        );
        (before, after)
    }

    #[test]
    fn pushes_only_on_change() {
        let (before, after) = snapshots();
        let mut reporter = StateReporter::new(8);
        reporter.hand_off(&before, None);
        assert_eq!(reporter.pending(), 0);

        let change = before.diff(&after);
        reporter.hand_off(&after, Some(&change));
        assert_eq!(reporter.pending(), 1);
    }

    #[test]
    fn periodic_full_report() {
        let (_, after) = snapshots();
        let mut reporter = StateReporter::new(8).with_full_report_every(1);
        reporter.hand_off(&after, None);
        assert_eq!(reporter.pending(), 1);
    }

    #[test]
    fn query_returns_full_grid() {
        let (_, after) = snapshots();
        let mut reporter = StateReporter::new(8);
        let bytes = reporter.answer_query(&after, WireFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["sequence"], 1);
        assert_eq!(value["filled"], serde_json::json!([[0, 1], [0, 0]]));
        assert_eq!(reporter.stats().queries, 1);
    }

    #[test]
    fn outbox_discards_oldest_when_full() {
        let (before, after) = snapshots();
        let change = before.diff(&after);
        let mut reporter = StateReporter::new(2);
        for _ in 0..3 {
            reporter.hand_off(&after, Some(&change));
        }
        assert_eq!(reporter.pending(), 2);
        assert_eq!(reporter.stats().overflowed, 1);
    }

    #[test]
    fn failed_send_is_counted_and_dropped() {
        let (before, after) = snapshots();
        let change = before.diff(&after);
        let transport = Arc::new(MemoryTransport::new());
        transport.set_failing(true);
        let routes = vec![ReportRoute::new(WireFormat::Binary, transport.clone())];

        let mut reporter = StateReporter::new(8);
        reporter.hand_off(&after, Some(&change));
        let delivered = tokio_test::block_on(reporter.publish(&routes));

        assert_eq!(delivered, 0);
        assert_eq!(reporter.pending(), 0);
        assert_eq!(reporter.stats().send_failures, 1);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn each_route_gets_its_own_encoding() {
        let (before, after) = snapshots();
        let change = before.diff(&after);
        let udp = Arc::new(MemoryTransport::new());
        let serial = Arc::new(MemoryTransport::new());
        serial.set_failing(true);
        let routes = vec![
            ReportRoute::new(WireFormat::Binary, udp.clone()),
            ReportRoute::new(WireFormat::Lines, serial.clone()),
        ];

        let mut reporter = StateReporter::new(8);
        reporter.hand_off(&after, Some(&change));
        let delivered = tokio_test::block_on(reporter.publish(&routes));

        assert_eq!(delivered, 1);
        assert_eq!(reporter.stats().sent, 1);
        assert_eq!(reporter.stats().send_failures, 1);
        let frames = udp.sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], wire::KIND_CHANGE);
    }
}
