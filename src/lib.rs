// photogrid: phototransistor grid scanner for consumable boards

pub mod board;
pub mod communication;
pub mod config;
pub mod hardware;
pub mod reporter;
pub mod scanner;
pub mod simulator;
pub mod web;

pub use board::{Board, BoardRequest};
pub use config::{Config, ConfigError};
pub use reporter::{ReportRoute, StateReporter};
pub use scanner::{
    AcquisitionError, CellChange, CellState, ChangeEvent, GridConfig, GridScanner, GridSnapshot,
    Multiplexer, RawSample, ScanOutcome, ScanState, Thresholder, Thresholds,
};
