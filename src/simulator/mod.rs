// src/simulator/mod.rs - Software sensor matrix for hosts without GPIO
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulatorConfig;
use crate::hardware::{HardwareError, SensorMatrix};
use crate::scanner::grid::GridConfig;

/// One observable interaction with the matrix, recorded when tracing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixEvent {
    RowActive(usize),
    AllInactive,
    Read { column: usize },
}

/// Simulated phototransistor grid.
///
/// Each cell has a true light level. Reading a column returns the level of
/// that column in every active row (the brightest wins, the way real rows
/// bleed into each other), plus bounded noise. With no row active the
/// column reads dark.
pub struct SimulatedMatrix {
    rows: usize,
    columns: usize,
    levels: Vec<u8>,
    active: Vec<bool>,
    noise: u8,
    fault_rate: f64,
    toggle_rate: f64,
    on_level: u8,
    off_level: u8,
    pending_faults: u32,
    max_active: usize,
    events: Option<Vec<MatrixEvent>>,
    rng: StdRng,
}

impl SimulatedMatrix {
    /// Dark, noiseless matrix.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            levels: vec![0; rows * columns],
            active: vec![false; rows],
            noise: 0,
            fault_rate: 0.0,
            toggle_rate: 0.0,
            on_level: 220,
            off_level: 40,
            pending_faults: 0,
            max_active: 0,
            events: None,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Matrix populated from the `[simulator]` scene.
    pub fn from_config(grid: &GridConfig, scene: &SimulatorConfig) -> Self {
        let mut matrix = Self::new(grid.rows(), grid.columns());
        matrix.noise = scene.noise;
        matrix.fault_rate = scene.fault_rate;
        matrix.toggle_rate = scene.toggle_rate;
        matrix.on_level = scene.on_level;
        matrix.off_level = scene.off_level;
        matrix.rng = match scene.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        matrix.levels.fill(scene.off_level);
        for &(row, column) in &scene.filled {
            if row < matrix.rows && column < matrix.columns {
                matrix.set_level(row, column, scene.on_level);
            } else {
                tracing::warn!("Ignoring simulated slot ({}, {}) outside the grid", row, column);
            }
        }
        matrix
    }

    pub fn with_noise(mut self, noise: u8, seed: u64) -> Self {
        self.noise = noise;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Starts recording every matrix interaction.
    pub fn with_event_log(mut self) -> Self {
        self.events = Some(Vec::new());
        self
    }

    pub fn set_level(&mut self, row: usize, column: usize, level: u8) {
        self.levels[row * self.columns + column] = level;
    }

    pub fn set_all(&mut self, level: u8) {
        self.levels.fill(level);
    }

    pub fn level(&self, row: usize, column: usize) -> u8 {
        self.levels[row * self.columns + column]
    }

    /// Makes the next `count` column reads fail.
    pub fn inject_read_faults(&mut self, count: u32) {
        self.pending_faults += count;
    }

    /// Highest number of rows that were ever active at the same time.
    pub fn max_active_rows(&self) -> usize {
        self.max_active
    }

    pub fn active_rows(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    pub fn events(&self) -> &[MatrixEvent] {
        self.events.as_deref().unwrap_or(&[])
    }

    pub fn clear_events(&mut self) {
        if let Some(events) = self.events.as_mut() {
            events.clear();
        }
    }

    fn record(&mut self, event: MatrixEvent) {
        if let Some(events) = self.events.as_mut() {
            events.push(event);
        }
    }

    /// Fills or empties one random slot, emulating a consumable being placed or taken.
    fn maybe_toggle_slot(&mut self) {
        if self.toggle_rate > 0.0 && self.rng.random_bool(self.toggle_rate) {
            let row = self.rng.random_range(0..self.rows);
            let column = self.rng.random_range(0..self.columns);
            let level = if self.level(row, column) >= self.on_level {
                self.off_level
            } else {
                self.on_level
            };
            tracing::debug!("Simulated slot ({}, {}) now at level {}", row, column, level);
            self.set_level(row, column, level);
        }
    }
}

impl SensorMatrix for SimulatedMatrix {
    fn set_row_active(&mut self, row: usize) -> Result<(), HardwareError> {
        if row >= self.rows {
            return Err(HardwareError::RowOutOfRange(row));
        }
        if row == 0 {
            self.maybe_toggle_slot();
        }
        self.active[row] = true;
        self.max_active = self.max_active.max(self.active_rows());
        self.record(MatrixEvent::RowActive(row));
        Ok(())
    }

    fn set_all_rows_inactive(&mut self) -> Result<(), HardwareError> {
        self.active.fill(false);
        self.record(MatrixEvent::AllInactive);
        Ok(())
    }

    fn read_column(&mut self, column: usize) -> Result<u8, HardwareError> {
        if column >= self.columns {
            return Err(HardwareError::ColumnOutOfRange(column));
        }
        if self.pending_faults > 0 {
            self.pending_faults -= 1;
            return Err(HardwareError::Unavailable("injected read fault".to_string()));
        }
        if self.fault_rate > 0.0 && self.rng.random_bool(self.fault_rate) {
            return Err(HardwareError::Unavailable("simulated ADC timeout".to_string()));
        }
        self.record(MatrixEvent::Read { column });

        let lit = (0..self.rows)
            .filter(|&row| self.active[row])
            .map(|row| self.levels[row * self.columns + column])
            .max();
        let Some(level) = lit else {
            return Ok(0);
        };
        if self.noise == 0 {
            return Ok(level);
        }
        let noise = i16::from(self.noise);
        let jitter = self.rng.random_range(-noise..=noise);
        Ok((i16::from(level) + jitter).clamp(0, 255) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_when_no_row_active() {
        let mut matrix = SimulatedMatrix::new(2, 2);
        matrix.set_all(200);
        assert_eq!(matrix.read_column(1).unwrap(), 0);
    }

    #[test]
    fn crosstalk_when_two_rows_active() {
        let mut matrix = SimulatedMatrix::new(2, 1);
        matrix.set_level(1, 0, 210);
        matrix.set_row_active(0).unwrap();
        assert_eq!(matrix.read_column(0).unwrap(), 0);
        matrix.set_row_active(1).unwrap();
        assert_eq!(matrix.read_column(0).unwrap(), 210);
        assert_eq!(matrix.max_active_rows(), 2);
    }

    #[test]
    fn noise_stays_within_bound() {
        let mut matrix = SimulatedMatrix::new(1, 1).with_noise(5, 7);
        matrix.set_level(0, 0, 100);
        matrix.set_row_active(0).unwrap();
        for _ in 0..200 {
            let reading = matrix.read_column(0).unwrap();
            assert!((95..=105).contains(&reading), "reading {reading} out of bounds");
        }
    }

    #[test]
    fn noise_saturates_at_range_limits() {
        let mut matrix = SimulatedMatrix::new(1, 1).with_noise(20, 3);
        matrix.set_level(0, 0, 250);
        matrix.set_row_active(0).unwrap();
        for _ in 0..100 {
            assert!(matrix.read_column(0).unwrap() >= 230);
        }
    }

    #[test]
    fn injected_faults_are_consumed() {
        let mut matrix = SimulatedMatrix::new(1, 1);
        matrix.inject_read_faults(2);
        assert!(matrix.read_column(0).is_err());
        assert!(matrix.read_column(0).is_err());
        assert!(matrix.read_column(0).is_ok());
    }

    #[test]
    fn scene_sets_levels() {
        let grid = GridConfig::new(
            &[2, 3],
            &[8, 9, 10],
            crate::scanner::thresholder::Thresholds::new(150, 130).unwrap(),
            10,
        )
        .unwrap();
        let scene = SimulatorConfig {
            filled: vec![(1, 2), (5, 5)],
            seed: Some(1),
            ..SimulatorConfig::default()
        };
        let matrix = SimulatedMatrix::from_config(&grid, &scene);
        assert_eq!(matrix.level(1, 2), scene.on_level);
        assert_eq!(matrix.level(0, 0), scene.off_level);
    }
}
