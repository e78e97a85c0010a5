use crate::GpioResult;
use crate::keypad::{Case, CharacterTable, Key, KeyCode, KeyDecoder, Keypad, ScanState};

/// A keypad together with the state needed to decode it.
///
/// Call one of the scan methods on every keypad tick (see
/// [KEYPAD_POLL_PERIOD](crate::tick::KEYPAD_POLL_PERIOD)).
#[derive(Debug)]
pub struct KeypadScanner<'a> {
    keypad: &'a dyn Keypad<Key = Key>,
    table: CharacterTable,
    decoder: KeyDecoder,
}

impl<'a> KeypadScanner<'a> {
    /// Creates a scanner producing uppercase characters.
    pub fn new(keypad: &'a dyn Keypad<Key = Key>) -> Self {
        Self {
            keypad,
            table: CharacterTable::default(),
            decoder: KeyDecoder::new(),
        }
    }

    pub fn with_table(mut self, table: CharacterTable) -> Self {
        self.table = table;
        self
    }

    /// See [KeyDecoder::with_repeat_timeout].
    pub fn with_repeat_timeout(mut self, ticks: Option<u32>) -> Self {
        self.decoder = self.decoder.with_repeat_timeout(ticks);
        self
    }

    pub fn case(&self) -> Case {
        self.table.case()
    }

    pub fn set_case(&mut self, case: Case) {
        self.table.set_case(case);
    }

    pub fn table(&self) -> &CharacterTable {
        &self.table
    }

    pub fn state(&self) -> &ScanState {
        self.decoder.state()
    }

    /// Scans once and reports digits, backspace and return.
    pub fn scan_numeric(&mut self) -> GpioResult<Option<KeyCode>> {
        let sample = self.keypad.scan()?;
        Ok(self.decoder.decode_numeric(sample))
    }

    /// Scans once and reports multi-tap characters, backspace and return.
    pub fn scan_alphanumeric(&mut self) -> GpioResult<Option<KeyCode>> {
        let sample = self.keypad.scan()?;
        Ok(self.decoder.decode_alphanumeric(sample, &self.table))
    }
}
