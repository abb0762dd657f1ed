//! Multiplexed scanning: acquisition, thresholding and change detection.

pub mod grid;
pub mod grid_scanner;
pub mod multiplexer;
pub mod sample;
pub mod thresholder;

use thiserror::Error;

use crate::hardware::HardwareError;

pub use grid::GridConfig;
pub use grid_scanner::{GridScanner, ReportSink, ScanOutcome, ScanState, ScanStats};
pub use multiplexer::Multiplexer;
pub use sample::{CellChange, CellState, ChangeEvent, GridSnapshot, RawSample};
pub use thresholder::{Thresholder, Thresholds};

/// A scan pass that could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("failed to release row lines before scanning: {0}")]
    Reset(#[source] HardwareError),
    #[error("scan aborted at row {row}: {source}")]
    Row { row: usize, source: HardwareError },
}
