use crate::keypad::Key;
use log::debug;

/// Letter case of the characters produced by multi-tap decoding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Case {
    #[default]
    Upper,
    Lower,
}

/// Candidate characters for each of the keys `1`-`9`.
///
/// Row `n` belongs to the key labelled `n + 1`. Key `0` only ever produces `'0'`, and the control
/// keys produce no characters at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CharacterTable {
    rows: [[u8; 4]; 9],
    case: Case,
}

impl CharacterTable {
    pub const DEFAULT_ROWS: [[u8; 4]; 9] = [
        *b"1ABC",
        *b"2DEF",
        *b"3GHI",
        *b"4JKL",
        *b"5MNO",
        *b"6PQR",
        *b"7STU",
        *b"8VWX",
        *b"9YZ.",
    ];

    /// Distance between an ASCII capital and its small letter.
    const CASE_OFFSET: u8 = 0x20;

    /// Creates a table from uppercase rows.
    pub fn new(rows: [[u8; 4]; 9]) -> Self {
        Self {
            rows,
            case: Case::Upper,
        }
    }

    pub fn case(&self) -> Case {
        self.case
    }

    /// Shifts every letter in the table to the given case. Calling it with the current case does
    /// nothing.
    pub fn set_case(&mut self, case: Case) {
        if self.case == case {
            return;
        }

        for c in self.rows.iter_mut().flatten() {
            match case {
                Case::Lower if c.is_ascii_uppercase() => *c += Self::CASE_OFFSET,
                Case::Upper if c.is_ascii_lowercase() => *c -= Self::CASE_OFFSET,
                _ => {}
            }
        }
        self.case = case;
        debug!("Keypad table switched to {:?}", case);
    }

    /// Gets the characters a key cycles through, or `None` for the control keys.
    pub fn candidates(&self, key: Key) -> Option<&[u8]> {
        match key {
            Key::Key0 => Some(&b"0"[..]),
            Key::Backspace | Key::Return => None,
            _ => {
                let row = key.digit()? as usize - 1;
                Some(&self.rows[row][..])
            }
        }
    }
}

impl Default for CharacterTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROWS)
    }
}
