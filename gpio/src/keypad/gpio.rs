use crate::keypad::{Key, Keypad};
use crate::{GpioBusInput, GpioBusOutput, GpioResult};
use log::trace;
use std::fmt::{Debug, Formatter};

/// The `GpioKeypad` struct represents a GPIO-based keypad with 3 columns and 4 rows.
///
/// Columns are outputs idling high. Rows are inputs with pull-ups, so a pressed key reads low
/// while its column is driven low.
pub struct GpioKeypad<'a> {
    cols: &'a dyn GpioBusOutput<3>,
    rows: &'a dyn GpioBusInput<4>,
}

impl Debug for GpioKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({:?}, {:?})", self.cols, self.rows)
    }
}

impl<'a> GpioKeypad<'a> {
    const COLS_IDLE: u8 = 0b111;
    const ROWS_MASK: u8 = 0b1111;

    /// Creates a new `GpioKeypad` and drives all columns to their idle (high) level.
    ///
    /// The row bus must already be requested with a pull-up bias.
    pub fn new(cols: &'a dyn GpioBusOutput<3>, rows: &'a dyn GpioBusInput<4>) -> GpioResult<Self> {
        cols.write_bits(Self::COLS_IDLE)?;
        Ok(GpioKeypad { cols, rows })
    }
}

impl Keypad for GpioKeypad<'_> {
    type Key = Key;

    /// Drives each column low in turn and looks for a single low row.
    ///
    /// A column with several rows low at once is ignored. When keys in several columns are down,
    /// the last column scanned wins.
    fn scan(&self) -> GpioResult<Option<Key>> {
        let mut found = None;

        for col in 0..Key::COLS {
            self.cols.write_bits(Self::COLS_IDLE & !(1 << col))?;
            let low_rows = !self.rows.read_bits()? & Self::ROWS_MASK;

            match low_rows.count_ones() {
                0 => {}
                1 => found = Key::from_position((low_rows.trailing_zeros() as usize, col)),
                _ => trace!("Column {} has several rows low: {:04b}", col, low_rows),
            }
        }

        self.cols.write_bits(Self::COLS_IDLE)?;
        Ok(found)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimKeypadMatrix;

    #[test]
    fn columns_idle_high_after_setup_and_scan() {
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();
        assert_eq!(matrix.columns(), [true; 3]);

        matrix.press(Key::Key5);
        keypad.scan().unwrap();
        assert_eq!(matrix.columns(), [true; 3]);
    }

    #[test]
    fn columns_are_driven_one_at_a_time_in_order() {
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();
        matrix.clear_drive_log();

        keypad.scan().unwrap();
        assert_eq!(
            matrix.drive_log(),
            vec![
                [false, true, true],
                [true, false, true],
                [true, true, false],
                [true, true, true],
            ]
        );
    }

    #[test]
    fn every_key_is_found_at_its_position() {
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();

        assert_eq!(keypad.scan().unwrap(), None);
        for key in Key::ALL {
            matrix.press(key);
            assert_eq!(keypad.scan().unwrap(), Some(key));
            matrix.release(key);
        }
    }

    #[test]
    fn last_scanned_column_wins() {
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();

        matrix.press(Key::Key1);
        matrix.press(Key::Key9);
        assert_eq!(keypad.scan().unwrap(), Some(Key::Key9));

        matrix.release_all();
        matrix.press(Key::Return);
        matrix.press(Key::Key2);
        assert_eq!(keypad.scan().unwrap(), Some(Key::Return));
    }

    #[test]
    fn several_rows_in_one_column_are_ignored() {
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();

        matrix.press(Key::Key1);
        matrix.press(Key::Key4);
        assert_eq!(keypad.scan().unwrap(), None);

        matrix.press(Key::Key2);
        assert_eq!(keypad.scan().unwrap(), Some(Key::Key2));
    }
}
