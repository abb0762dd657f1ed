// src/hardware/mod.rs - Physical I/O boundary for the sensor matrix
pub mod pins;

#[cfg(test)]
mod test;

use embedded_hal::delay::DelayNs;
use thiserror::Error;

use crate::scanner::grid::PinId;

pub use pins::{AnalogInput, PinMatrix};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("row {0} is out of range")]
    RowOutOfRange(usize),
    #[error("column {0} is out of range")]
    ColumnOutOfRange(usize),
    #[error("failed to drive row pin {0}")]
    Drive(PinId),
    #[error("failed to read column pin {0}")]
    Read(PinId),
    #[error("expected {expected} {kind} lines, got {got}")]
    LineCountMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("read mechanism unavailable: {0}")]
    Unavailable(String),
}

/// The only place raw pins are touched.
///
/// Indices are positions in the grid, not pin numbers; implementations map
/// them onto their own pins. Activating a row does not deactivate the others,
/// callers are expected to call [`SensorMatrix::set_all_rows_inactive`] first.
pub trait SensorMatrix {
    fn set_row_active(&mut self, row: usize) -> Result<(), HardwareError>;
    fn set_all_rows_inactive(&mut self) -> Result<(), HardwareError>;
    fn read_column(&mut self, column: usize) -> Result<u8, HardwareError>;
}

impl<T: SensorMatrix + ?Sized> SensorMatrix for &mut T {
    fn set_row_active(&mut self, row: usize) -> Result<(), HardwareError> {
        (**self).set_row_active(row)
    }

    fn set_all_rows_inactive(&mut self) -> Result<(), HardwareError> {
        (**self).set_all_rows_inactive()
    }

    fn read_column(&mut self, column: usize) -> Result<u8, HardwareError> {
        (**self).read_column(column)
    }
}

impl<T: SensorMatrix + ?Sized> SensorMatrix for Box<T> {
    fn set_row_active(&mut self, row: usize) -> Result<(), HardwareError> {
        (**self).set_row_active(row)
    }

    fn set_all_rows_inactive(&mut self) -> Result<(), HardwareError> {
        (**self).set_all_rows_inactive()
    }

    fn read_column(&mut self, column: usize) -> Result<u8, HardwareError> {
        (**self).read_column(column)
    }
}

/// Blocking delay on the host thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns.into()));
    }
}
