use crate::keypad::Key;
use crate::{GpioBusInput, GpioBusOutput, GpioResult};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

#[derive(Default)]
struct MatrixState {
    pressed: [[bool; Key::COLS]; Key::ROWS],
    columns: [bool; Key::COLS],
    drive_log: Vec<[bool; Key::COLS]>,
}

/// A 4x3 key matrix with pull-ups on the rows.
///
/// A row reads low when a pressed key on it sits in a column that is driven low.
#[derive(Clone)]
pub struct SimKeypadMatrix {
    state: Rc<RefCell<MatrixState>>,
}

impl SimKeypadMatrix {
    pub fn new() -> Self {
        let state = MatrixState {
            columns: [true; Key::COLS],
            ..MatrixState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn press(&self, key: Key) {
        let (row, col) = key.position();
        self.state.borrow_mut().pressed[row][col] = true;
    }

    pub fn release(&self, key: Key) {
        let (row, col) = key.position();
        self.state.borrow_mut().pressed[row][col] = false;
    }

    pub fn release_all(&self) {
        self.state.borrow_mut().pressed = Default::default();
    }

    /// The column output bus, bit `n` is column `n`.
    pub fn cols(&self) -> SimColumns {
        SimColumns {
            matrix: self.clone(),
        }
    }

    /// The row input bus, bit `n` is row `n`.
    pub fn rows(&self) -> SimRows {
        SimRows {
            matrix: self.clone(),
        }
    }

    /// Current column levels.
    pub fn columns(&self) -> [bool; Key::COLS] {
        self.state.borrow().columns
    }

    /// Every column pattern written so far.
    pub fn drive_log(&self) -> Vec<[bool; Key::COLS]> {
        self.state.borrow().drive_log.clone()
    }

    pub fn clear_drive_log(&self) {
        self.state.borrow_mut().drive_log.clear();
    }
}

impl Default for SimKeypadMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SimKeypadMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        write!(f, "SimKeypadMatrix({:?})", state.pressed)
    }
}

#[derive(Debug)]
pub struct SimColumns {
    matrix: SimKeypadMatrix,
}

impl GpioBusOutput<3> for SimColumns {
    fn write(&self, values: &[bool; 3]) -> GpioResult<()> {
        let mut state = self.matrix.state.borrow_mut();
        state.columns = *values;
        state.drive_log.push(*values);
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimRows {
    matrix: SimKeypadMatrix,
}

impl GpioBusInput<4> for SimRows {
    fn read(&self) -> GpioResult<[bool; 4]> {
        let state = self.matrix.state.borrow();
        let mut rows = [true; 4];
        for (row, level) in rows.iter_mut().enumerate() {
            let pulled_low = (0..Key::COLS).any(|col| !state.columns[col] && state.pressed[row][col]);
            *level = !pulled_low;
        }
        Ok(rows)
    }
}
