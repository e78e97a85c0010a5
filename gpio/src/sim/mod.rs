//! Software stand-ins for the keypad and the LCD.
//!
//! Both devices are driven through the same GPIO traits as real hardware, so the drivers can be
//! exercised end to end on a host machine.
mod hd44780;
mod keypad;

pub use hd44780::*;
pub use keypad::*;
