//! Wire format serialization for grid reports
//!
//! Every message carries the snapshot sequence number and the grid
//! dimensions. Three encodings are supported:
//!
//! ## Binary
//!
//! ```text
//! ┌──────────┬──────────────────┬──────────┬─────────────┬──────────────┐
//! │ Kind (1) │ Sequence (8, BE) │ Rows (1) │ Columns (1) │ Body         │
//! └──────────┴──────────────────┴──────────┴─────────────┴──────────────┘
//! ```
//!
//! - Kind `0x01` (snapshot): body is `ceil(rows * columns / 8)` bytes. Cell
//!   `i` (row-major) is bit `i % 8` of byte `i / 8`; 1 means filled.
//! - Kind `0x02` (change): body is a big-endian `u16` count followed by
//!   `count` triples `(row, column, flags)` where bit 0 of `flags` is the old
//!   state and bit 1 the new state.
//!
//! ## JSON
//!
//! A tagged object. Snapshots carry `filled`, a matrix of 0/1 per row, which
//! is what the lab-side client reads from `GET /update`.
//!
//! ## Lines
//!
//! Plain text for the serial console: one `seq=N row=R col=C state=S` line
//! per reported cell. Every line stands on its own, since the console client
//! parses `row=`, `col=` and `state=` out of each line it receives.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

use crate::scanner::sample::{ChangeEvent, GridSnapshot};

pub const KIND_SNAPSHOT: u8 = 0x01;
pub const KIND_CHANGE: u8 = 0x02;
pub const HEADER_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Binary,
    Json,
    Lines,
}

impl WireFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Binary => "application/octet-stream",
            WireFormat::Json => "application/json",
            WireFormat::Lines => "text/plain; charset=utf-8",
        }
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("dimension {0} does not fit in one byte")]
    DimensionOverflow(usize),
    #[error("{0} changes do not fit in one message")]
    TooManyChanges(usize),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message truncated: need {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("unknown message kind {0:#04x}")]
    UnknownKind(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCellChange {
    pub row: usize,
    pub col: usize,
    pub old: u8,
    pub state: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Snapshot {
        sequence: u64,
        rows: usize,
        columns: usize,
        filled: Vec<Vec<u8>>,
    },
    Change {
        sequence: u64,
        rows: usize,
        columns: usize,
        changes: Vec<WireCellChange>,
    },
}

impl WireMessage {
    pub fn snapshot(snapshot: &GridSnapshot) -> Self {
        let filled = snapshot
            .cells()
            .chunks(snapshot.columns().max(1))
            .map(|row| row.iter().map(|cell| cell.as_bit()).collect())
            .collect();
        WireMessage::Snapshot {
            sequence: snapshot.sequence(),
            rows: snapshot.rows(),
            columns: snapshot.columns(),
            filled,
        }
    }

    pub fn change(change: &ChangeEvent, rows: usize, columns: usize) -> Self {
        WireMessage::Change {
            sequence: change.sequence(),
            rows,
            columns,
            changes: change
                .changes()
                .iter()
                .map(|c| WireCellChange {
                    row: c.row,
                    col: c.column,
                    old: c.old.as_bit(),
                    state: c.new.as_bit(),
                })
                .collect(),
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            WireMessage::Snapshot { sequence, .. } | WireMessage::Change { sequence, .. } => {
                *sequence
            }
        }
    }
}

pub fn encode(message: &WireMessage, format: WireFormat) -> Result<Vec<u8>, WireError> {
    match format {
        WireFormat::Binary => encode_binary(message),
        WireFormat::Json => Ok(serde_json::to_vec(message)?),
        WireFormat::Lines => Ok(encode_lines(message).into_bytes()),
    }
}

fn dimension(value: usize) -> Result<u8, WireError> {
    u8::try_from(value).map_err(|_| WireError::DimensionOverflow(value))
}

fn encode_binary(message: &WireMessage) -> Result<Vec<u8>, WireError> {
    let (kind, sequence, rows, columns) = match message {
        WireMessage::Snapshot { sequence, rows, columns, .. } => {
            (KIND_SNAPSHOT, *sequence, *rows, *columns)
        }
        WireMessage::Change { sequence, rows, columns, .. } => {
            (KIND_CHANGE, *sequence, *rows, *columns)
        }
    };
    let mut out = Vec::with_capacity(HEADER_LEN + (rows * columns).div_ceil(8));
    out.push(kind);
    out.extend_from_slice(&sequence.to_be_bytes());
    out.push(dimension(rows)?);
    out.push(dimension(columns)?);

    match message {
        WireMessage::Snapshot { filled, .. } => {
            let mut bits = vec![0u8; (rows * columns).div_ceil(8)];
            for (i, bit) in filled.iter().flatten().enumerate() {
                if *bit != 0 {
                    bits[i / 8] |= 1 << (i % 8);
                }
            }
            out.extend_from_slice(&bits);
        }
        WireMessage::Change { changes, .. } => {
            let count = u16::try_from(changes.len())
                .map_err(|_| WireError::TooManyChanges(changes.len()))?;
            out.extend_from_slice(&count.to_be_bytes());
            for change in changes {
                out.push(dimension(change.row)?);
                out.push(dimension(change.col)?);
                out.push((change.old & 1) | ((change.state & 1) << 1));
            }
        }
    }
    Ok(out)
}

fn encode_lines(message: &WireMessage) -> String {
    let mut out = String::new();
    match message {
        WireMessage::Snapshot { sequence, filled, .. } => {
            for (row, cells) in filled.iter().enumerate() {
                for (col, state) in cells.iter().enumerate() {
                    let _ = writeln!(out, "seq={sequence} row={row} col={col} state={state}");
                }
            }
        }
        WireMessage::Change { sequence, changes, .. } => {
            for c in changes {
                let _ = writeln!(
                    out,
                    "seq={sequence} row={} col={} state={}",
                    c.row, c.col, c.state
                );
            }
        }
    }
    out
}

/// Decodes a binary frame produced by [`encode`].
pub fn decode_binary(bytes: &[u8]) -> Result<WireMessage, WireError> {
    if bytes.len() < HEADER_LEN {
        return Err(WireError::Truncated { expected: HEADER_LEN, got: bytes.len() });
    }
    let kind = bytes[0];
    let mut seq = [0u8; 8];
    seq.copy_from_slice(&bytes[1..9]);
    let sequence = u64::from_be_bytes(seq);
    let rows = usize::from(bytes[9]);
    let columns = usize::from(bytes[10]);
    let body = &bytes[HEADER_LEN..];

    match kind {
        KIND_SNAPSHOT => {
            let expected = (rows * columns).div_ceil(8);
            if body.len() < expected {
                return Err(WireError::Truncated {
                    expected: HEADER_LEN + expected,
                    got: bytes.len(),
                });
            }
            let filled = (0..rows)
                .map(|row| {
                    (0..columns)
                        .map(|col| {
                            let i = row * columns + col;
                            (body[i / 8] >> (i % 8)) & 1
                        })
                        .collect()
                })
                .collect();
            Ok(WireMessage::Snapshot { sequence, rows, columns, filled })
        }
        KIND_CHANGE => {
            if body.len() < 2 {
                return Err(WireError::Truncated { expected: HEADER_LEN + 2, got: bytes.len() });
            }
            let count = usize::from(u16::from_be_bytes([body[0], body[1]]));
            let entries = &body[2..];
            if entries.len() < count * 3 {
                return Err(WireError::Truncated {
                    expected: HEADER_LEN + 2 + count * 3,
                    got: bytes.len(),
                });
            }
            let changes = entries
                .chunks_exact(3)
                .take(count)
                .map(|e| WireCellChange {
                    row: usize::from(e[0]),
                    col: usize::from(e[1]),
                    old: e[2] & 1,
                    state: (e[2] >> 1) & 1,
                })
                .collect();
            Ok(WireMessage::Change { sequence, rows, columns, changes })
        }
        other => Err(WireError::UnknownKind(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::sample::{CellState, GridSnapshot};

    fn snapshot() -> GridSnapshot {
        // 3x3, cells (0,0), (1,1) and (2,2) filled
        let mut cells = vec![CellState::Off; 9];
        cells[0] = CellState::On;
        cells[4] = CellState::On;
        cells[8] = CellState::On;
        GridSnapshot::from_cells(258, 3, 3, cells)
    }

    #[test]
    fn binary_snapshot_layout() {
        let bytes = encode(&WireMessage::snapshot(&snapshot()), WireFormat::Binary).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 2);
        assert_eq!(bytes[0], KIND_SNAPSHOT);
        assert_eq!(&bytes[1..9], &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!((bytes[9], bytes[10]), (3, 3));
        // bits 0, 4 and 8 set
        assert_eq!(&bytes[11..], &[0b0001_0001, 0b0000_0001]);
    }

    #[test]
    fn binary_change_layout() {
        let message = WireMessage::Change {
            sequence: 7,
            rows: 6,
            columns: 6,
            changes: vec![
                WireCellChange { row: 2, col: 3, old: 0, state: 1 },
                WireCellChange { row: 5, col: 0, old: 1, state: 0 },
            ],
        };
        let bytes = encode(&message, WireFormat::Binary).unwrap();
        assert_eq!(bytes[0], KIND_CHANGE);
        assert_eq!(&bytes[11..13], &[0, 2]);
        assert_eq!(&bytes[13..], &[2, 3, 0b10, 5, 0, 0b01]);
        assert_eq!(decode_binary(&bytes).unwrap(), message);
    }

    #[test]
    fn binary_snapshot_decodes() {
        let message = WireMessage::snapshot(&snapshot());
        let bytes = encode(&message, WireFormat::Binary).unwrap();
        assert_eq!(decode_binary(&bytes).unwrap(), message);
    }

    #[test]
    fn decode_rejects_short_and_unknown_frames() {
        assert!(matches!(decode_binary(&[1, 2, 3]), Err(WireError::Truncated { .. })));
        let mut bytes = encode(&WireMessage::snapshot(&snapshot()), WireFormat::Binary).unwrap();
        bytes.pop();
        assert!(matches!(decode_binary(&bytes), Err(WireError::Truncated { .. })));
        bytes[0] = 0x7f;
        assert!(matches!(decode_binary(&bytes), Err(WireError::UnknownKind(0x7f))));
    }

    #[test]
    fn json_snapshot_has_filled_matrix() {
        let bytes = encode(&WireMessage::snapshot(&snapshot()), WireFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["sequence"], 258);
        assert_eq!(value["filled"], serde_json::json!([[1, 0, 0], [0, 1, 0], [0, 0, 1]]));
    }

    #[test]
    fn lines_match_console_protocol() {
        let message = WireMessage::Change {
            sequence: 4,
            rows: 6,
            columns: 6,
            changes: vec![WireCellChange { row: 2, col: 3, old: 0, state: 1 }],
        };
        let text = String::from_utf8(encode(&message, WireFormat::Lines).unwrap()).unwrap();
        assert_eq!(text, "seq=4 row=2 col=3 state=1\n");
    }

    /// Pulls `key=<digits>` out of a line the way the console client does.
    fn field(line: &str, key: &str) -> Option<u32> {
        let start = line.find(&format!("{key}="))? + key.len() + 1;
        let digits: String = line[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    #[test]
    fn every_snapshot_line_carries_a_full_cell() {
        let bytes = encode(&WireMessage::snapshot(&snapshot()), WireFormat::Lines).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        for line in &lines {
            assert!(field(line, "row").is_some(), "no row in {line:?}");
            assert!(field(line, "col").is_some(), "no col in {line:?}");
            assert!(field(line, "state").is_some(), "no state in {line:?}");
            assert_eq!(field(line, "seq"), Some(258));
        }
        assert_eq!(lines[4], "seq=258 row=1 col=1 state=1");
        assert_eq!(lines[5], "seq=258 row=1 col=2 state=0");
    }

    #[test]
    fn oversized_dimension_is_rejected() {
        let message = WireMessage::Change { sequence: 1, rows: 300, columns: 1, changes: vec![] };
        assert!(matches!(
            encode(&message, WireFormat::Binary),
            Err(WireError::DimensionOverflow(300))
        ));
    }
}
