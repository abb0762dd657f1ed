//! Reading-to-state conversion with hysteresis.
//!
//! A cell turns on once its reading reaches the on threshold and only turns
//! off again when the reading falls below the (strictly lower) off threshold.
//! Readings between the two keep whatever state the cell already had.

use crate::config::ConfigError;
use crate::scanner::sample::CellState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    on: u8,
    off: u8,
}

impl Thresholds {
    pub fn new(on: u8, off: u8) -> Result<Self, ConfigError> {
        if off >= on {
            return Err(ConfigError::InvalidHysteresis { on, off });
        }
        Ok(Self { on, off })
    }

    /// Minimum reading for an off cell to turn on.
    pub fn on(&self) -> u8 {
        self.on
    }

    /// Readings below this turn an on cell off.
    pub fn off(&self) -> u8 {
        self.off
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Thresholder {
    thresholds: Thresholds,
}

impl Thresholder {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Next state for one cell. A cell with no prior state is treated as off.
    pub fn next_state(&self, reading: u8, prior: Option<CellState>) -> CellState {
        match prior.unwrap_or(CellState::Off) {
            CellState::Off if reading >= self.thresholds.on => CellState::On,
            CellState::On if reading < self.thresholds.off => CellState::Off,
            unchanged => unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholder() -> Thresholder {
        Thresholder::new(Thresholds::new(150, 130).unwrap())
    }

    #[test]
    fn off_cell_needs_on_threshold() {
        let t = thresholder();
        assert_eq!(t.next_state(140, Some(CellState::Off)), CellState::Off);
        assert_eq!(t.next_state(149, Some(CellState::Off)), CellState::Off);
        assert_eq!(t.next_state(150, Some(CellState::Off)), CellState::On);
        assert_eq!(t.next_state(151, Some(CellState::Off)), CellState::On);
    }

    #[test]
    fn on_cell_holds_until_below_off_threshold() {
        let t = thresholder();
        assert_eq!(t.next_state(140, Some(CellState::On)), CellState::On);
        assert_eq!(t.next_state(130, Some(CellState::On)), CellState::On);
        assert_eq!(t.next_state(129, Some(CellState::On)), CellState::Off);
        assert_eq!(t.next_state(120, Some(CellState::On)), CellState::Off);
    }

    #[test]
    fn first_read_uses_on_threshold() {
        let t = thresholder();
        assert_eq!(t.next_state(140, None), CellState::Off);
        assert_eq!(t.next_state(200, None), CellState::On);
    }

    #[test]
    fn noise_around_boundary_does_not_chatter() {
        let t = thresholder();
        let mut state = None;
        let mut flips = 0;
        for reading in [151, 145, 149, 138, 152, 131, 147, 150] {
            let next = t.next_state(reading, state);
            if state.is_some_and(|s| s != next) {
                flips += 1;
            }
            state = Some(next);
        }
        assert_eq!(flips, 0);
        assert_eq!(state, Some(CellState::On));
    }

    #[test]
    fn thresholds_must_leave_a_gap() {
        assert!(Thresholds::new(150, 150).is_err());
        assert!(Thresholds::new(150, 160).is_err());
        assert!(Thresholds::new(0, 0).is_err());
        assert!(Thresholds::new(1, 0).is_ok());
    }
}
