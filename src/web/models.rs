//! Contains the data models for API requests and responses.

use serde::{Deserialize, Serialize};

use crate::reporter::ReporterStats;
use crate::reporter::wire::WireFormat;
use crate::scanner::{ScanState, ScanStats};

/// Represents the current status of the board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardStatusResponse {
    pub name: String,
    pub mac: String,
    pub ip: String,
    pub rows: usize,
    pub columns: usize,
    pub sequence: u64,
    pub filled: usize,
    pub state: ScanState,
    pub scan: ScanStats,
    pub reporter: ReporterStats,
}

/// Query parameters for `GET /api/v1/snapshot`.
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    #[serde(default)]
    pub format: Option<WireFormat>,
}
