//! HD44780 character LCD module.
//!
//! [driver] speaks the controller's instruction set over a 4-bit GPIO bus, [display] adds text
//! printing and 1-indexed cursor placement on top of any driver.
pub mod display;
pub mod driver;

pub use display::*;
