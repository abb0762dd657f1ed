//! Row-by-row acquisition of a full raw sample.

use embedded_hal::delay::DelayNs;

use crate::hardware::{HardwareError, SensorMatrix};
use crate::scanner::AcquisitionError;
use crate::scanner::grid::GridConfig;
use crate::scanner::sample::RawSample;

/// Owns the matrix and is the only component allowed to drive row pins.
pub struct Multiplexer<M, D> {
    matrix: M,
    delay: D,
    rows: usize,
    columns: usize,
    settle_delay_us: u32,
}

impl<M: SensorMatrix, D: DelayNs> Multiplexer<M, D> {
    pub fn new(config: &GridConfig, matrix: M, delay: D) -> Self {
        Self {
            matrix,
            delay,
            rows: config.rows(),
            columns: config.columns(),
            settle_delay_us: config.settle_delay_us(),
        }
    }

    /// Runs one full pass.
    ///
    /// Rows are lit one at a time in ascending order, each held for the settle
    /// delay before its columns are read, and released before the next row.
    /// On any pin fault the pass is abandoned and all rows are released.
    pub fn acquire(&mut self) -> Result<RawSample, AcquisitionError> {
        self.matrix
            .set_all_rows_inactive()
            .map_err(AcquisitionError::Reset)?;

        let mut sample = RawSample::new(self.rows, self.columns);
        for row in 0..self.rows {
            if let Err(source) = self.scan_row(row, &mut sample) {
                if let Err(e) = self.matrix.set_all_rows_inactive() {
                    tracing::warn!("Failed to release rows after aborted pass: {}", e);
                }
                return Err(AcquisitionError::Row { row, source });
            }
        }
        Ok(sample)
    }

    fn scan_row(&mut self, row: usize, sample: &mut RawSample) -> Result<(), HardwareError> {
        self.matrix.set_row_active(row)?;
        self.delay.delay_us(self.settle_delay_us);
        for column in 0..self.columns {
            let reading = self.matrix.read_column(column)?;
            sample.set(row, column, reading);
        }
        self.matrix.set_all_rows_inactive()
    }

    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut M {
        &mut self.matrix
    }
}
