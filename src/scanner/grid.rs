//! Immutable sensor-matrix topology.

use heapless::Vec as PinList;

use crate::config::ConfigError;
use crate::scanner::thresholder::Thresholds;

/// Board-level identifier of a GPIO or analog pin.
pub type PinId = u8;

/// Maximum number of row or column lines a matrix may use.
pub const MAX_LINES: usize = 32;

/// Upper bound for the per-row settle delay (100 ms).
pub const MAX_SETTLE_DELAY_US: u32 = 100_000;

/// Row/column pin assignment, thresholds and timing for one sensor matrix.
///
/// Built once at start-up and never mutated; every other component takes
/// its dimensions from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    row_pins: PinList<PinId, MAX_LINES>,
    column_pins: PinList<PinId, MAX_LINES>,
    thresholds: Thresholds,
    settle_delay_us: u32,
}

impl GridConfig {
    pub fn new(
        row_pins: &[PinId],
        column_pins: &[PinId],
        thresholds: Thresholds,
        settle_delay_us: u32,
    ) -> Result<Self, ConfigError> {
        if row_pins.is_empty() {
            return Err(ConfigError::NoRows);
        }
        if column_pins.is_empty() {
            return Err(ConfigError::NoColumns);
        }
        let row_pins = pin_list("row", row_pins)?;
        let column_pins = pin_list("column", column_pins)?;
        if let Some(&pin) = row_pins.iter().find(|pin| column_pins.contains(pin)) {
            return Err(ConfigError::SharedPin(pin));
        }
        if settle_delay_us == 0 || settle_delay_us > MAX_SETTLE_DELAY_US {
            return Err(ConfigError::InvalidSettleDelay {
                got: settle_delay_us,
                max: MAX_SETTLE_DELAY_US,
            });
        }
        Ok(Self {
            row_pins,
            column_pins,
            thresholds,
            settle_delay_us,
        })
    }

    pub fn rows(&self) -> usize {
        self.row_pins.len()
    }

    pub fn columns(&self) -> usize {
        self.column_pins.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows() * self.columns()
    }

    pub fn row_pin(&self, row: usize) -> Option<PinId> {
        self.row_pins.get(row).copied()
    }

    pub fn column_pin(&self, column: usize) -> Option<PinId> {
        self.column_pins.get(column).copied()
    }

    pub fn row_pins(&self) -> &[PinId] {
        &self.row_pins
    }

    pub fn column_pins(&self) -> &[PinId] {
        &self.column_pins
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn on_threshold(&self) -> u8 {
        self.thresholds.on()
    }

    pub fn settle_delay_us(&self) -> u32 {
        self.settle_delay_us
    }
}

fn pin_list(kind: &'static str, pins: &[PinId]) -> Result<PinList<PinId, MAX_LINES>, ConfigError> {
    let mut list = PinList::new();
    for &pin in pins {
        if list.contains(&pin) {
            return Err(ConfigError::DuplicatePin { kind, pin });
        }
        list.push(pin).map_err(|_| ConfigError::TooManyPins {
            kind,
            count: pins.len(),
            max: MAX_LINES,
        })?;
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> Thresholds {
        Thresholds::new(150, 130).unwrap()
    }

    #[test]
    fn accessors_follow_pin_order() {
        let grid = GridConfig::new(&[2, 3, 4], &[8, 9], thresholds(), 500).unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.cell_count(), 6);
        assert_eq!(grid.row_pin(0), Some(2));
        assert_eq!(grid.row_pin(2), Some(4));
        assert_eq!(grid.row_pin(3), None);
        assert_eq!(grid.column_pin(1), Some(9));
        assert_eq!(grid.on_threshold(), 150);
    }

    #[test]
    fn rejects_empty_lines() {
        assert!(matches!(
            GridConfig::new(&[], &[8], thresholds(), 500),
            Err(ConfigError::NoRows)
        ));
        assert!(matches!(
            GridConfig::new(&[2], &[], thresholds(), 500),
            Err(ConfigError::NoColumns)
        ));
    }

    #[test]
    fn rejects_pin_used_as_row_and_column() {
        let err = GridConfig::new(&[2, 3, 8], &[8, 9], thresholds(), 500).unwrap_err();
        assert!(matches!(err, ConfigError::SharedPin(8)));
    }

    #[test]
    fn rejects_repeated_pin() {
        let err = GridConfig::new(&[2, 2], &[8], thresholds(), 500).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePin { kind: "row", pin: 2 }));
    }

    #[test]
    fn rejects_too_many_lines() {
        let rows: Vec<PinId> = (0..=MAX_LINES as PinId).collect();
        let err = GridConfig::new(&rows, &[200], thresholds(), 500).unwrap_err();
        assert!(matches!(err, ConfigError::TooManyPins { kind: "row", .. }));
    }

    #[test]
    fn settle_delay_must_be_bounded_and_non_zero() {
        assert!(GridConfig::new(&[2], &[8], thresholds(), 0).is_err());
        assert!(GridConfig::new(&[2], &[8], thresholds(), MAX_SETTLE_DELAY_US + 1).is_err());
        assert!(GridConfig::new(&[2], &[8], thresholds(), MAX_SETTLE_DELAY_US).is_ok());
    }
}
