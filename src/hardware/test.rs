// src/hardware/test.rs - Tests for the embedded-hal pin matrix
#[cfg(test)]
mod tests {
    use crate::hardware::{AnalogInput, HardwareError, PinMatrix, SensorMatrix};
    use crate::scanner::grid::GridConfig;
    use crate::scanner::thresholder::Thresholds;
    use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Output pin that mirrors its level into a shared board state.
    struct FakeOutput {
        index: usize,
        levels: Rc<RefCell<Vec<bool>>>,
        broken: bool,
    }

    #[derive(Debug)]
    struct FakePinError;

    impl embedded_hal::digital::Error for FakePinError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    impl ErrorType for FakeOutput {
        type Error = FakePinError;
    }

    impl OutputPin for FakeOutput {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            if self.broken {
                return Err(FakePinError);
            }
            self.levels.borrow_mut()[self.index] = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if self.broken {
                return Err(FakePinError);
            }
            self.levels.borrow_mut()[self.index] = true;
            Ok(())
        }
    }

    /// Column input that reads 200 when its lit row is high, 10 otherwise.
    struct FakeInput {
        lit_row: usize,
        levels: Rc<RefCell<Vec<bool>>>,
    }

    impl AnalogInput for FakeInput {
        type Error = ();

        fn read_level(&mut self) -> Result<u8, Self::Error> {
            Ok(if self.levels.borrow()[self.lit_row] { 200 } else { 10 })
        }
    }

    fn grid() -> GridConfig {
        GridConfig::new(&[2, 3, 4], &[8, 9], Thresholds::new(150, 130).unwrap(), 10).unwrap()
    }

    fn outputs(levels: &Rc<RefCell<Vec<bool>>>, broken_row: Option<usize>) -> Vec<FakeOutput> {
        (0..3)
            .map(|index| FakeOutput {
                index,
                levels: levels.clone(),
                broken: broken_row == Some(index),
            })
            .collect()
    }

    #[test]
    fn drives_rows_active_high() {
        let levels = Rc::new(RefCell::new(vec![true; 3]));
        let inputs = vec![
            FakeInput { lit_row: 0, levels: levels.clone() },
            FakeInput { lit_row: 2, levels: levels.clone() },
        ];
        let mut matrix = PinMatrix::new(&grid(), outputs(&levels, None), inputs, true).unwrap();

        matrix.set_all_rows_inactive().unwrap();
        assert_eq!(*levels.borrow(), vec![false, false, false]);

        matrix.set_row_active(2).unwrap();
        assert_eq!(*levels.borrow(), vec![false, false, true]);
        assert_eq!(matrix.read_column(0).unwrap(), 10);
        assert_eq!(matrix.read_column(1).unwrap(), 200);
    }

    #[test]
    fn active_low_inverts_levels() {
        let levels = Rc::new(RefCell::new(vec![false; 3]));
        let inputs: Vec<FakeInput> = (0..2)
            .map(|_| FakeInput { lit_row: 0, levels: levels.clone() })
            .collect();
        let mut matrix = PinMatrix::new(&grid(), outputs(&levels, None), inputs, false).unwrap();

        matrix.set_all_rows_inactive().unwrap();
        assert_eq!(*levels.borrow(), vec![true, true, true]);
        matrix.set_row_active(1).unwrap();
        assert_eq!(*levels.borrow(), vec![true, false, true]);
    }

    #[test]
    fn out_of_range_and_pin_faults_name_the_pin() {
        let levels = Rc::new(RefCell::new(vec![false; 3]));
        let inputs: Vec<FakeInput> = (0..2)
            .map(|_| FakeInput { lit_row: 0, levels: levels.clone() })
            .collect();
        let mut matrix = PinMatrix::new(&grid(), outputs(&levels, Some(1)), inputs, true).unwrap();

        assert_eq!(matrix.set_row_active(3), Err(HardwareError::RowOutOfRange(3)));
        assert_eq!(matrix.read_column(2), Err(HardwareError::ColumnOutOfRange(2)));
        assert_eq!(matrix.set_row_active(1), Err(HardwareError::Drive(3)));
    }

    #[test]
    fn line_count_must_match_config() {
        let levels = Rc::new(RefCell::new(vec![false; 3]));
        let one_input = vec![FakeInput { lit_row: 0, levels: levels.clone() }];
        let err = PinMatrix::new(&grid(), outputs(&levels, None), one_input, true)
            .err()
            .unwrap();
        assert_eq!(
            err,
            HardwareError::LineCountMismatch { kind: "column", expected: 2, got: 1 }
        );
    }
}
