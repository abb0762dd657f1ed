//! `embedded-hal` backed matrix: one output pin per row, one analog input per column.

use embedded_hal::digital::{OutputPin, PinState};
use heapless::Vec as PinList;

use super::{HardwareError, SensorMatrix};
use crate::scanner::grid::{GridConfig, MAX_LINES, PinId};

/// An 8-bit analog channel (an ADC input scaled to 0-255).
pub trait AnalogInput {
    type Error: core::fmt::Debug;

    fn read_level(&mut self) -> Result<u8, Self::Error>;
}

/// Drives real row pins and samples real column inputs.
pub struct PinMatrix<O, A> {
    rows: PinList<(PinId, O), MAX_LINES>,
    columns: PinList<(PinId, A), MAX_LINES>,
    active: PinState,
}

impl<O: OutputPin, A: AnalogInput> PinMatrix<O, A> {
    /// Pairs each configured pin id with its driver, in configuration order.
    ///
    /// `active_high` selects whether a row conducts when its pin is high.
    pub fn new(
        config: &GridConfig,
        rows: impl IntoIterator<Item = O>,
        columns: impl IntoIterator<Item = A>,
        active_high: bool,
    ) -> Result<Self, HardwareError> {
        let rows = pair_lines("row", config.row_pins(), rows)?;
        let columns = pair_lines("column", config.column_pins(), columns)?;
        Ok(Self {
            rows,
            columns,
            active: PinState::from(active_high),
        })
    }

    fn inactive(&self) -> PinState {
        !self.active
    }
}

fn pair_lines<T>(
    kind: &'static str,
    pins: &[PinId],
    drivers: impl IntoIterator<Item = T>,
) -> Result<PinList<(PinId, T), MAX_LINES>, HardwareError> {
    let mut lines = PinList::new();
    let mut drivers = drivers.into_iter();
    for &pin in pins {
        let driver = drivers.next().ok_or(HardwareError::LineCountMismatch {
            kind,
            expected: pins.len(),
            got: lines.len(),
        })?;
        lines
            .push((pin, driver))
            .map_err(|_| HardwareError::LineCountMismatch {
                kind,
                expected: MAX_LINES,
                got: pins.len(),
            })?;
    }
    let extra = drivers.count();
    if extra > 0 {
        return Err(HardwareError::LineCountMismatch {
            kind,
            expected: pins.len(),
            got: pins.len() + extra,
        });
    }
    Ok(lines)
}

impl<O: OutputPin, A: AnalogInput> SensorMatrix for PinMatrix<O, A> {
    fn set_row_active(&mut self, row: usize) -> Result<(), HardwareError> {
        let active = self.active;
        let (pin, output) = self
            .rows
            .get_mut(row)
            .ok_or(HardwareError::RowOutOfRange(row))?;
        output.set_state(active).map_err(|e| {
            tracing::debug!("Row pin {} drive error: {:?}", pin, e);
            HardwareError::Drive(*pin)
        })
    }

    fn set_all_rows_inactive(&mut self) -> Result<(), HardwareError> {
        let inactive = self.inactive();
        for (pin, output) in self.rows.iter_mut() {
            output.set_state(inactive).map_err(|e| {
                tracing::debug!("Row pin {} release error: {:?}", pin, e);
                HardwareError::Drive(*pin)
            })?;
        }
        Ok(())
    }

    fn read_column(&mut self, column: usize) -> Result<u8, HardwareError> {
        let (pin, input) = self
            .columns
            .get_mut(column)
            .ok_or(HardwareError::ColumnOutOfRange(column))?;
        input.read_level().map_err(|e| {
            tracing::debug!("Column pin {} read error: {:?}", pin, e);
            HardwareError::Read(*pin)
        })
    }
}
