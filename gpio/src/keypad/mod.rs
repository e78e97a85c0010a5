mod decoder;
mod gpio;
mod scanner;
mod table;

use crate::GpioResult;
pub use decoder::*;
pub use gpio::*;
pub use scanner::*;
use std::fmt::Debug;
pub use table::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Runs one full scan of the device and returns the key found pressed, if any.
    fn scan(&self) -> GpioResult<Option<Self::Key>>;
}

/// Represents the keys on a 4x3 keypad.
///
/// ```text
/// |   1   |  2  |   3    |
/// |   4   |  5  |   6    |
/// |   7   |  8  |   9    |
/// | BKSPC |  0  | RETURN |
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Key {
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Key0,
    Backspace,
    Return,
}

impl Key {
    pub const ROWS: usize = 4;
    pub const COLS: usize = 3;

    const LAYOUT: [[Key; Key::COLS]; Key::ROWS] = {
        use Key::*;
        [
            [Key1, Key2, Key3],
            [Key4, Key5, Key6],
            [Key7, Key8, Key9],
            [Backspace, Key0, Return],
        ]
    };

    /// All keys in scan order: column by column, top to bottom.
    pub const ALL: [Key; 12] = {
        use Key::*;
        [Key1, Key4, Key7, Backspace, Key2, Key5, Key8, Key0, Key3, Key6, Key9, Return]
    };

    /// Converts a position tuple (row, column) to a [Key].
    pub fn from_position(pos: (usize, usize)) -> Option<Key> {
        Self::LAYOUT.get(pos.0)?.get(pos.1).copied()
    }

    /// Gets the (row, column) position of the key in the matrix.
    pub fn position(self) -> (usize, usize) {
        let index = Self::ALL
            .iter()
            .position(|&key| key == self)
            .unwrap_or_default();
        (index % Self::ROWS, index / Self::ROWS)
    }

    /// Gets the digit printed on the key, if it has one.
    pub fn digit(self) -> Option<u8> {
        use Key::*;

        match self {
            Key1 => Some(1),
            Key2 => Some(2),
            Key3 => Some(3),
            Key4 => Some(4),
            Key5 => Some(5),
            Key6 => Some(6),
            Key7 => Some(7),
            Key8 => Some(8),
            Key9 => Some(9),
            Key0 => Some(0),
            Backspace | Return => None,
        }
    }
}

/// A decoded keypad input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyCode {
    /// A digit, produced in numeric mode.
    Digit(u8),
    /// A character, produced in alphanumeric mode.
    Char(char),
    Backspace,
    Return,
}

impl KeyCode {
    /// Gets the character this code would print, if it prints one.
    pub fn to_char(self) -> Option<char> {
        match self {
            KeyCode::Digit(digit) => char::from_digit(digit as u32, 10),
            KeyCode::Char(c) => Some(c),
            KeyCode::Backspace | KeyCode::Return => None,
        }
    }
}
