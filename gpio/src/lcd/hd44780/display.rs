use crate::lcd::hd44780::driver::HD44780Driver;
use crate::{GpioError, GpioResult};
use log::{trace, warn};
use std::ops::RangeInclusive;

/// Columns addressable on each line, 1-indexed.
pub const COLUMNS: RangeInclusive<u8> = 1..=40;
/// Display lines, 1-indexed.
pub const ROWS: RangeInclusive<u8> = 1..=2;
/// DDRAM address of the first cell of line 2.
pub const LINE_OFFSET: u8 = 0x40;

/// Text-level helpers for anything that speaks the HD44780 instruction set.
pub trait DisplayExt {
    /// Writes one character at the cursor. Anything that isn't ASCII is shown as `?`.
    fn print_char(&mut self, c: char) -> GpioResult<()>;

    /// Writes a string at the cursor.
    ///
    /// A `'\n'` moves the cursor to the start of line 2 and is not itself written.
    fn print_str(&mut self, s: &str) -> GpioResult<()>;

    /// Moves the cursor to `col`, `row`, both starting at 1.
    fn set_cursor(&mut self, col: u8, row: u8) -> GpioResult<()>;

    /// Moves the cursor to `col`, `row` and writes `s` from there.
    fn place_str(&mut self, s: &str, col: u8, row: u8) -> GpioResult<()>;

    /// Blanks the whole display and moves the cursor to 1, 1.
    fn clear_screen(&mut self) -> GpioResult<()>;

    /// Moves the cursor to 1, 1 without touching the contents or the display shift.
    fn cursor_home(&mut self) -> GpioResult<()>;
}

impl<T: ?Sized + HD44780Driver> DisplayExt for T {
    fn print_char(&mut self, c: char) -> GpioResult<()> {
        if c.is_ascii() {
            self.send_data(c as u8)
        } else {
            warn!("Non-ASCII character: {}", c);
            self.send_data(b'?')
        }
    }

    fn print_str(&mut self, s: &str) -> GpioResult<()> {
        trace!("Printing {:?}", s);
        for c in s.chars() {
            if c == '\n' {
                self.set_cursor(1, 2)?;
            } else {
                self.print_char(c)?;
            }
        }
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> GpioResult<()> {
        if !COLUMNS.contains(&col) || !ROWS.contains(&row) {
            return Err(GpioError::InvalidArgument);
        }
        self.set_ddram_address((col - 1) + (row - 1) * LINE_OFFSET)
    }

    fn place_str(&mut self, s: &str, col: u8, row: u8) -> GpioResult<()> {
        self.set_cursor(col, row)?;
        self.print_str(s)
    }

    fn clear_screen(&mut self) -> GpioResult<()> {
        self.clear_display()
    }

    fn cursor_home(&mut self) -> GpioResult<()> {
        self.set_cursor(1, 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lcd::hd44780::driver::{Font, GpioHD44780Driver, Lines, SettleStrategy};
    use crate::sim::{SimHd44780, Transfer};

    fn ready(lcd: &SimHd44780, driver: &mut GpioHD44780Driver) {
        driver.init(Lines::Two, Font::Small).unwrap();
        lcd.clear_log();
    }

    fn command(byte: u8) -> Transfer {
        Transfer { rs: false, byte }
    }

    fn data(byte: u8) -> Transfer {
        Transfer { rs: true, byte }
    }

    #[test]
    fn top_left_is_address_zero() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        ready(&lcd, &mut driver);

        driver.set_cursor(1, 1).unwrap();
        driver.print_char('X').unwrap();

        assert_eq!(lcd.transfers(), vec![command(0x80), data(b'X')]);
        assert_eq!(lcd.char_at(0x00), b'X');
    }

    #[test]
    fn second_line_starts_at_0x40() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        ready(&lcd, &mut driver);

        driver.set_cursor(1, 2).unwrap();
        driver.set_cursor(40, 2).unwrap();
        driver.set_cursor(5, 1).unwrap();

        assert_eq!(
            lcd.transfers(),
            vec![command(0xC0), command(0x80 + 0x40 + 39), command(0x84)]
        );
    }

    #[test]
    fn newline_moves_to_line_two_without_being_printed() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        ready(&lcd, &mut driver);

        driver.print_str("A\nB").unwrap();

        assert_eq!(lcd.transfers(), vec![data(b'A'), command(0xC0), data(b'B')]);
        assert!(!lcd.transfers().contains(&data(b'\n')));
        assert_eq!(lcd.line(1, 2), "A ");
        assert_eq!(lcd.line(2, 2), "B ");
    }

    #[test]
    fn non_ascii_is_replaced() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        ready(&lcd, &mut driver);

        driver.print_str("dé").unwrap();

        assert_eq!(lcd.line(1, 3), "d? ");
    }

    #[test]
    fn cursor_outside_the_display_is_rejected() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        ready(&lcd, &mut driver);

        for (col, row) in [(0, 1), (41, 1), (1, 0), (1, 3)] {
            assert!(matches!(
                driver.set_cursor(col, row),
                Err(GpioError::InvalidArgument)
            ));
        }
        assert!(lcd.transfers().is_empty());
    }

    #[test]
    fn place_str_and_home() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        ready(&lcd, &mut driver);

        driver.place_str("Hi", 3, 2).unwrap();
        driver.cursor_home().unwrap();
        driver.print_char('>').unwrap();

        assert_eq!(lcd.line(1, 1), ">");
        assert_eq!(lcd.line(2, 4), "  Hi");

        driver.clear_screen().unwrap();
        assert_eq!(lcd.line(2, 4), "    ");
        assert_eq!(lcd.address(), 0);
    }
}
