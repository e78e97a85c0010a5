//! The module for the text entry state and logic.

use crate::config::{Config, InputMode};
use log::{debug, info};
use padlcd_gpio::GpioResult;
use padlcd_gpio::keypad::{Key, KeyCode, Keypad, KeypadScanner};
use padlcd_gpio::lcd::hd44780::DisplayExt;
use padlcd_gpio::lcd::hd44780::driver::HD44780Driver;

/// What the display is currently showing.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AppState {
    /// Nothing drawn yet.
    #[default]
    Starting,
    /// The greeting, until the first key.
    Greeting,
    /// Typed text, with the cursor at `col`, `row` (1-indexed).
    Entry { col: u8, row: u8 },
}

/// The main app state struct.
pub struct App<'a> {
    config: Config,
    state: AppState,
    lcd: &'a mut dyn HD44780Driver,
    scanner: KeypadScanner<'a>,
}

impl<'a> App<'a> {
    pub fn new(
        config: Config,
        lcd: &'a mut dyn HD44780Driver,
        keypad: &'a dyn Keypad<Key = Key>,
    ) -> App<'a> {
        let mut scanner =
            KeypadScanner::new(keypad).with_repeat_timeout(config.repeat_timeout_ticks);
        scanner.set_case(config.case());
        App {
            config,
            state: AppState::default(),
            lcd,
            scanner,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Clears the display and shows the greeting.
    pub fn start(&mut self) -> GpioResult<()> {
        self.lcd.clear_screen()?;
        self.lcd.print_str(&self.config.greeting)?;
        self.state = AppState::Greeting;
        info!("Showing greeting.");
        Ok(())
    }

    /// Scans the keypad once and applies whatever key it reports.
    ///
    /// Meant to be called once per keypad tick.
    pub fn update(&mut self) -> GpioResult<()> {
        let code = match self.config.input_mode {
            InputMode::Numeric => self.scanner.scan_numeric()?,
            InputMode::Alphanumeric => self.scanner.scan_alphanumeric()?,
        };
        match code {
            Some(code) => self.handle_key(code),
            None => Ok(()),
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> GpioResult<()> {
        let (col, row) = match self.state {
            AppState::Entry { col, row } => (col, row),
            AppState::Starting | AppState::Greeting => {
                debug!("First key, leaving greeting.");
                self.lcd.clear_screen()?;
                (1, 1)
            }
        };

        let (col, row) = match code {
            KeyCode::Return => self.next_line(row)?,
            KeyCode::Backspace => self.erase(col, row)?,
            _ => {
                let Some(c) = code.to_char() else {
                    return Ok(());
                };
                self.type_char(c, col, row)?
            }
        };

        self.state = AppState::Entry { col, row };
        Ok(())
    }

    /// Moves to the start of the next line, clearing the display when there isn't one.
    fn next_line(&mut self, row: u8) -> GpioResult<(u8, u8)> {
        if row < self.config.lines {
            self.lcd.set_cursor(1, row + 1)?;
            Ok((1, row + 1))
        } else {
            self.lcd.clear_screen()?;
            Ok((1, 1))
        }
    }

    fn erase(&mut self, col: u8, row: u8) -> GpioResult<(u8, u8)> {
        if col == 1 {
            debug!("Nothing to erase on line {}.", row);
            return Ok((col, row));
        }
        let col = col - 1;
        self.lcd.place_str(" ", col, row)?;
        self.lcd.set_cursor(col, row)?;
        Ok((col, row))
    }

    fn type_char(&mut self, c: char, col: u8, row: u8) -> GpioResult<(u8, u8)> {
        let repeated = self.config.input_mode == InputMode::Alphanumeric
            && self.scanner.state().last_repeated
            && col > 1;

        if repeated {
            // Replace the character the previous tap of this key wrote.
            self.lcd.place_str(&c.to_string(), col - 1, row)?;
            return Ok((col, row));
        }

        let (col, row) = if col > self.config.columns {
            self.next_line(row)?
        } else {
            (col, row)
        };
        self.lcd.print_char(c)?;
        Ok((col + 1, row))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use padlcd_gpio::keypad::GpioKeypad;
    use padlcd_gpio::lcd::hd44780::driver::{Font, Lines, SettleStrategy};
    use padlcd_gpio::sim::{SimHd44780, SimKeypadMatrix};

    fn tap(matrix: &SimKeypadMatrix, app: &mut App, key: Key) {
        matrix.press(key);
        app.update().unwrap();
        matrix.release(key);
        app.update().unwrap();
    }

    fn config(input_mode: InputMode) -> Config {
        Config {
            input_mode,
            columns: 4,
            greeting: "Hi\nthere".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn greeting_gives_way_to_typed_text() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        driver.init(Lines::Two, Font::Small).unwrap();
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();
        let mut app = App::new(config(InputMode::Numeric), &mut driver, &keypad);

        app.start().unwrap();
        assert_eq!(app.state(), AppState::Greeting);
        assert_eq!(lcd.line(1, 3), "Hi ");
        assert_eq!(lcd.line(2, 5), "there");

        tap(&matrix, &mut app, Key::Key4);
        tap(&matrix, &mut app, Key::Key2);

        assert_eq!(lcd.line(1, 3), "42 ");
        assert_eq!(lcd.line(2, 5), "     ");
        assert_eq!(app.state(), AppState::Entry { col: 3, row: 1 });
    }

    #[test]
    fn repeated_taps_overwrite_in_place() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        driver.init(Lines::Two, Font::Small).unwrap();
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();
        let mut app = App::new(config(InputMode::Alphanumeric), &mut driver, &keypad);

        tap(&matrix, &mut app, Key::Key2);
        tap(&matrix, &mut app, Key::Key2);
        tap(&matrix, &mut app, Key::Key3);

        assert_eq!(lcd.line(1, 3), "EG ");
        assert_eq!(app.state(), AppState::Entry { col: 3, row: 1 });
    }

    #[test]
    fn backspace_and_return() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        driver.init(Lines::Two, Font::Small).unwrap();
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();
        let mut app = App::new(config(InputMode::Numeric), &mut driver, &keypad);

        for key in [Key::Key1, Key::Key2, Key::Backspace, Key::Return, Key::Key9] {
            tap(&matrix, &mut app, key);
        }
        assert_eq!(lcd.line(1, 2), "1 ");
        assert_eq!(lcd.line(2, 2), "9 ");

        tap(&matrix, &mut app, Key::Return);
        assert_eq!(lcd.line(1, 2), "  ");
        assert_eq!(lcd.line(2, 2), "  ");
        assert_eq!(app.state(), AppState::Entry { col: 1, row: 1 });
    }

    #[test]
    fn typing_past_the_last_column_wraps() {
        let lcd = SimHd44780::new();
        let mut wiring = lcd.wiring();
        let mut driver = wiring.driver(SettleStrategy::fixed_delay());
        driver.init(Lines::Two, Font::Small).unwrap();
        let matrix = SimKeypadMatrix::new();
        let (cols, rows) = (matrix.cols(), matrix.rows());
        let keypad = GpioKeypad::new(&cols, &rows).unwrap();
        let mut app = App::new(config(InputMode::Numeric), &mut driver, &keypad);

        for key in [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5] {
            tap(&matrix, &mut app, key);
        }

        assert_eq!(lcd.line(1, 5), "1234 ");
        assert_eq!(lcd.line(2, 2), "5 ");
        assert_eq!(app.state(), AppState::Entry { col: 2, row: 2 });
    }
}
