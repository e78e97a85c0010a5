//! Turns raw scan samples into key codes.
//!
//! A key is reported once, when it is released. Holding a key down produces nothing until it is
//! let go, so a key held across many ticks still yields a single code.
use crate::keypad::{CharacterTable, Key, KeyCode};
use log::{debug, trace};

/// Multi-tap repeats are only honoured this many ticks after the previous submission, about a
/// second at the default poll rate.
pub const DEFAULT_REPEAT_TIMEOUT_TICKS: u32 = 12;

/// What the decoder remembers between scans.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanState {
    /// The key most recently reported.
    pub last_submitted: Option<Key>,
    /// Which candidate of `last_submitted` was reported, 0 for the first.
    pub cycle_index: usize,
    /// Whether the last report replaced the previous character instead of adding one.
    pub last_repeated: bool,
    /// The key seen pressed and not released yet.
    pub pending: Option<Key>,
    /// Whether `pending` continues the tap cycle of `last_submitted`.
    pub pending_repeat: bool,
    /// Scans since the last report.
    pub idle_ticks: u32,
}

#[derive(Clone, Debug)]
pub struct KeyDecoder {
    state: ScanState,
    repeat_timeout: Option<u32>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            state: ScanState::default(),
            repeat_timeout: Some(DEFAULT_REPEAT_TIMEOUT_TICKS),
        }
    }

    /// Sets how many idle ticks end a tap cycle. `None` lets a cycle continue indefinitely.
    pub fn with_repeat_timeout(mut self, ticks: Option<u32>) -> Self {
        self.repeat_timeout = ticks;
        self
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    fn continues_cycle(&self, key: Key) -> bool {
        self.state.last_submitted == Some(key)
            && self
                .repeat_timeout
                .is_none_or(|timeout| self.state.idle_ticks <= timeout)
    }

    /// Tracks the pressed key and returns it on the scan where it is found released.
    fn release_edge(&mut self, sample: Option<Key>) -> Option<Key> {
        self.state.idle_ticks = self.state.idle_ticks.saturating_add(1);

        match sample {
            Some(key) => {
                if self.state.pending != Some(key) {
                    trace!("{:?} pressed", key);
                    self.state.pending = Some(key);
                    self.state.pending_repeat = self.continues_cycle(key);
                }
                None
            }
            None => {
                let key = self.state.pending.take()?;
                trace!("{:?} released", key);
                self.state.idle_ticks = 0;
                Some(key)
            }
        }
    }

    /// Decodes a sample in numeric mode.
    pub fn decode_numeric(&mut self, sample: Option<Key>) -> Option<KeyCode> {
        let key = self.release_edge(sample)?;

        self.state.pending_repeat = false;
        self.state.last_repeated = false;
        self.state.cycle_index = 0;
        self.state.last_submitted = Some(key);

        let code = match key {
            Key::Backspace => KeyCode::Backspace,
            Key::Return => KeyCode::Return,
            _ => KeyCode::Digit(key.digit()?),
        };
        debug!("Keypad: {:?}", code);
        Some(code)
    }

    /// Decodes a sample in alphanumeric mode.
    ///
    /// Releasing the same key again advances through its candidates, wrapping around after the
    /// last one. Any other key, or a pause longer than the repeat timeout, starts from the first
    /// candidate again. The control keys never cycle.
    pub fn decode_alphanumeric(
        &mut self,
        sample: Option<Key>,
        table: &CharacterTable,
    ) -> Option<KeyCode> {
        let key = self.release_edge(sample)?;
        let repeat = std::mem::take(&mut self.state.pending_repeat);
        self.state.last_submitted = Some(key);

        let code = match table.candidates(key) {
            Some(candidates) => {
                self.state.cycle_index = if repeat {
                    (self.state.cycle_index + 1) % candidates.len()
                } else {
                    0
                };
                self.state.last_repeated = repeat;
                KeyCode::Char(candidates[self.state.cycle_index] as char)
            }
            None => {
                self.state.cycle_index = 0;
                self.state.last_repeated = false;
                if key == Key::Backspace {
                    KeyCode::Backspace
                } else {
                    KeyCode::Return
                }
            }
        };
        debug!("Keypad: {:?} (tap {})", code, self.state.cycle_index);
        Some(code)
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Presses and releases a key, returning everything decoded along the way.
    fn tap_numeric(decoder: &mut KeyDecoder, key: Key) -> Vec<KeyCode> {
        [Some(key), None]
            .into_iter()
            .filter_map(|sample| decoder.decode_numeric(sample))
            .collect()
    }

    fn tap_alpha(decoder: &mut KeyDecoder, table: &CharacterTable, key: Key) -> Option<KeyCode> {
        assert_eq!(decoder.decode_alphanumeric(Some(key), table), None);
        decoder.decode_alphanumeric(None, table)
    }

    #[test]
    fn every_key_reports_once_in_numeric_mode() {
        let expected = [
            (Key::Key1, KeyCode::Digit(1)),
            (Key::Key2, KeyCode::Digit(2)),
            (Key::Key3, KeyCode::Digit(3)),
            (Key::Key4, KeyCode::Digit(4)),
            (Key::Key5, KeyCode::Digit(5)),
            (Key::Key6, KeyCode::Digit(6)),
            (Key::Key7, KeyCode::Digit(7)),
            (Key::Key8, KeyCode::Digit(8)),
            (Key::Key9, KeyCode::Digit(9)),
            (Key::Key0, KeyCode::Digit(0)),
            (Key::Backspace, KeyCode::Backspace),
            (Key::Return, KeyCode::Return),
        ];
        let mut decoder = KeyDecoder::new();

        for (key, code) in expected {
            assert_eq!(tap_numeric(&mut decoder, key), vec![code]);
        }
    }

    #[test]
    fn held_key_reports_on_release_only() {
        let mut decoder = KeyDecoder::new();
        for _ in 0..20 {
            assert_eq!(decoder.decode_numeric(Some(Key::Key5)), None);
        }
        assert_eq!(decoder.decode_numeric(None), Some(KeyCode::Digit(5)));
        assert_eq!(decoder.decode_numeric(None), None);
    }

    #[test]
    fn nothing_pressed_reports_nothing() {
        let mut decoder = KeyDecoder::new();
        for _ in 0..5 {
            assert_eq!(decoder.decode_numeric(None), None);
        }
    }

    #[test]
    fn key_change_while_held_reports_the_latest() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.decode_numeric(Some(Key::Key1)), None);
        assert_eq!(decoder.decode_numeric(Some(Key::Key2)), None);
        assert_eq!(decoder.decode_numeric(None), Some(KeyCode::Digit(2)));
    }

    #[test]
    fn repeated_taps_cycle_and_wrap() {
        let table = CharacterTable::new([
            *b"ABC1",
            *b"2DEF",
            *b"3GHI",
            *b"4JKL",
            *b"5MNO",
            *b"6PQR",
            *b"7STU",
            *b"8VWX",
            *b"9YZ.",
        ]);
        let mut decoder = KeyDecoder::new();

        let taps: Vec<_> = (0..5)
            .map(|_| tap_alpha(&mut decoder, &table, Key::Key1))
            .collect();
        assert_eq!(
            taps,
            ['A', 'B', 'C', '1', 'A'].map(|c| Some(KeyCode::Char(c)))
        );
    }

    #[test]
    fn default_table_starts_with_the_digit() {
        let table = CharacterTable::default();
        let mut decoder = KeyDecoder::new();

        let taps: Vec<_> = (0..4)
            .map(|_| tap_alpha(&mut decoder, &table, Key::Key2))
            .collect();
        assert_eq!(taps, ['2', 'D', 'E', 'F'].map(|c| Some(KeyCode::Char(c))));
        assert_eq!(decoder.state().cycle_index, 3);
        assert!(decoder.state().last_repeated);
    }

    #[test]
    fn other_key_resets_the_cycle() {
        let table = CharacterTable::default();
        let mut decoder = KeyDecoder::new();

        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key5), Some(KeyCode::Char('5')));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key5), Some(KeyCode::Char('M')));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key6), Some(KeyCode::Char('6')));
        assert_eq!(decoder.state().cycle_index, 0);
        assert!(!decoder.state().last_repeated);
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key5), Some(KeyCode::Char('5')));
    }

    #[test]
    fn control_keys_reset_and_never_cycle() {
        let table = CharacterTable::default();
        let mut decoder = KeyDecoder::new();

        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key3), Some(KeyCode::Char('3')));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key3), Some(KeyCode::Char('G')));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Backspace), Some(KeyCode::Backspace));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Backspace), Some(KeyCode::Backspace));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Return), Some(KeyCode::Return));
        assert_eq!(decoder.state().cycle_index, 0);
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key3), Some(KeyCode::Char('3')));
    }

    #[test]
    fn zero_key_always_yields_zero() {
        let table = CharacterTable::default();
        let mut decoder = KeyDecoder::new();

        for _ in 0..3 {
            assert_eq!(tap_alpha(&mut decoder, &table, Key::Key0), Some(KeyCode::Char('0')));
        }
    }

    #[test]
    fn pause_resets_the_cycle() {
        let table = CharacterTable::default();
        let mut decoder = KeyDecoder::new().with_repeat_timeout(Some(3));

        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key4), Some(KeyCode::Char('4')));
        for _ in 0..5 {
            assert_eq!(decoder.decode_alphanumeric(None, &table), None);
        }
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key4), Some(KeyCode::Char('4')));
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key4), Some(KeyCode::Char('J')));
    }

    #[test]
    fn without_timeout_a_cycle_survives_pauses() {
        let table = CharacterTable::default();
        let mut decoder = KeyDecoder::new().with_repeat_timeout(None);

        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key7), Some(KeyCode::Char('7')));
        for _ in 0..100 {
            decoder.decode_alphanumeric(None, &table);
        }
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key7), Some(KeyCode::Char('S')));
    }

    #[test]
    fn lowercase_table_is_honoured() {
        let mut table = CharacterTable::default();
        table.set_case(crate::keypad::Case::Lower);
        let mut decoder = KeyDecoder::new();

        tap_alpha(&mut decoder, &table, Key::Key8);
        assert_eq!(tap_alpha(&mut decoder, &table, Key::Key8), Some(KeyCode::Char('v')));
    }
}
