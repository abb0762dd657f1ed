//! Scan orchestration and the current grid snapshot.

use embedded_hal::delay::DelayNs;
use serde::Serialize;

use crate::hardware::SensorMatrix;
use crate::scanner::AcquisitionError;
use crate::scanner::grid::GridConfig;
use crate::scanner::multiplexer::Multiplexer;
use crate::scanner::sample::{ChangeEvent, GridSnapshot, RawSample};
use crate::scanner::thresholder::Thresholder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Scanning,
    Settled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Passes that produced a new snapshot.
    pub passes: u64,
    pub acquisition_errors: u64,
    /// Passes whose snapshot differed from the previous one.
    pub changed_passes: u64,
    /// Triggers that fell due while a pass was still running and were dropped.
    pub dropped_triggers: u64,
}

/// Receives each settled snapshot and, when cells flipped, the change event.
///
/// Called synchronously while the scanner is `Settled`; the references are
/// only valid for the duration of the call.
pub trait ReportSink {
    fn hand_off(&mut self, snapshot: &GridSnapshot, change: Option<&ChangeEvent>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new snapshot is current.
    Completed { sequence: u64, changed_cells: usize },
    /// The pass failed; the previous snapshot is still current.
    Failed(AcquisitionError),
}

/// Drives scan passes and owns the single current snapshot.
///
/// Each trigger runs Idle -> Scanning -> Settled -> Idle to completion. A
/// failed pass goes straight back to Idle and leaves the current snapshot
/// untouched. The scanner is only reachable through `&mut self`, so a second
/// trigger can never start while a pass is in progress.
pub struct GridScanner<M, D> {
    multiplexer: Multiplexer<M, D>,
    thresholder: Thresholder,
    current: GridSnapshot,
    state: ScanState,
    stats: ScanStats,
}

impl<M: SensorMatrix, D: DelayNs> GridScanner<M, D> {
    pub fn new(config: &GridConfig, multiplexer: Multiplexer<M, D>) -> Self {
        Self {
            multiplexer,
            thresholder: Thresholder::new(config.thresholds()),
            current: GridSnapshot::initial(config.rows(), config.columns()),
            state: ScanState::Idle,
            stats: ScanStats::default(),
        }
    }

    pub fn trigger_scan(&mut self, sink: &mut impl ReportSink) -> ScanOutcome {
        self.state = ScanState::Scanning;
        let sample = match self.multiplexer.acquire() {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.acquisition_errors += 1;
                self.state = ScanState::Idle;
                tracing::warn!(
                    "Scan failed, keeping snapshot #{} ({} errors so far): {}",
                    self.current.sequence(),
                    self.stats.acquisition_errors,
                    e
                );
                return ScanOutcome::Failed(e);
            }
        };

        let next = self.next_snapshot(&sample);
        let change = self.current.diff(&next);
        self.current = next;
        self.stats.passes += 1;
        self.state = ScanState::Settled;

        let changed_cells = change.len();
        if change.is_empty() {
            sink.hand_off(&self.current, None);
        } else {
            self.stats.changed_passes += 1;
            tracing::debug!("Snapshot #{}: {} cell(s) changed", change.sequence(), changed_cells);
            sink.hand_off(&self.current, Some(&change));
        }
        self.state = ScanState::Idle;

        ScanOutcome::Completed {
            sequence: self.current.sequence(),
            changed_cells,
        }
    }

    /// Records triggers the tick source dropped because a pass was in progress.
    pub fn record_dropped_triggers(&mut self, count: u64) {
        if count > 0 {
            self.stats.dropped_triggers += count;
            tracing::debug!("Dropped {} redundant scan trigger(s)", count);
        }
    }

    fn next_snapshot(&self, sample: &RawSample) -> GridSnapshot {
        let cells = sample
            .readings()
            .iter()
            .zip(self.current.cells())
            .map(|(&reading, &prior)| self.thresholder.next_state(reading, Some(prior)))
            .collect();
        GridSnapshot::from_cells(
            self.current.sequence() + 1,
            self.current.rows(),
            self.current.columns(),
            cells,
        )
    }

    pub fn current(&self) -> &GridSnapshot {
        &self.current
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn multiplexer_mut(&mut self) -> &mut Multiplexer<M, D> {
        &mut self.multiplexer
    }
}
