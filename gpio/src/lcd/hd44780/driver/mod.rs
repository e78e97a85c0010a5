mod gpio;

use crate::{GpioError, GpioResult};
pub use gpio::*;
use std::fmt::Debug;

pub const CLEAR_DISPLAY: u8 = 0b00000001;
pub const RETURN_HOME: u8 = 0b00000010;
pub const ENTRY_MODE_SET: u8 = 0b00000100;
pub const DISPLAY_CONTROL: u8 = 0b00001000;
pub const CURSOR_SHIFT: u8 = 0b00010000;
pub const FUNCTION_SET: u8 = 0b00100000;
pub const SET_CGRAM_ADDRESS: u8 = 0b01000000;
pub const SET_DDRAM_ADDRESS: u8 = 0b10000000;

pub trait HD44780Driver: Debug {
    /// Runs the power-on handshake and configures the display.
    ///
    /// At least 15 ms must have passed since the controller was powered.
    fn init(&mut self, lines: Lines, font: Font) -> GpioResult<()>;

    /// Gets the state of the current session with the controller.
    fn session(&self) -> LcdSession;

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(CLEAR_DISPLAY)
    }

    /// Sets the cursor to the home position.
    fn return_home(&mut self) -> GpioResult<()> {
        self.send_command(RETURN_HOME)
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> GpioResult<()> {
        let mut command = ENTRY_MODE_SET;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> GpioResult<()> {
        let mut command = DISPLAY_CONTROL;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Moves the cursor or shifts the display.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> GpioResult<()> {
        let mut command = CURSOR_SHIFT;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the interface width, line count and font.
    fn function_set(&mut self, eight_bit: bool, lines: Lines, font: Font) -> GpioResult<()> {
        let mut command = FUNCTION_SET;
        if eight_bit {
            command |= 0b00010000;
        }
        if lines == Lines::Two {
            command |= 0b00001000;
        }
        if font == Font::Large {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the CGRAM address.
    fn set_cgram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b00111111 {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(SET_CGRAM_ADDRESS | address)
    }

    /// Sets the DDRAM address.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(SET_DDRAM_ADDRESS | address)
    }

    /// Reads the busy flag and address counter.
    fn get_busy_flag_and_address(&mut self) -> GpioResult<(bool, u8)> {
        let status = self.read_command()?;
        let busy_flag = status & 0b10000000 != 0;
        let address = status & 0b01111111;
        Ok((busy_flag, address))
    }

    // Low-level commands
    // These are what the helpers above are built on, provided by the driver implementation.

    /// Sends a command to the controller, with RS low.
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends data to the controller, with RS high.
    fn send_data(&mut self, data: u8) -> GpioResult<()>;

    /// Reads the busy flag and address counter as a single byte, with RS low.
    ///
    /// See [Self::get_busy_flag_and_address] for the decoded form.
    fn read_command(&mut self) -> GpioResult<u8>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing/reading data.
    Left,
    /// Moves the cursor to the right after writing/reading data.
    Right,
}

/// Number of display lines the controller drives.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Lines {
    One,
    #[default]
    Two,
}

/// Character font, 5x8 or 5x10 dots. The large font is only available with one line.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Font {
    #[default]
    Small,
    Large,
}

/// Register the next transfer targets, selected by the RS line.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TransferMode {
    #[default]
    Command,
    Data,
}

/// Where a byte transfer currently stands.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TransferPhase {
    #[default]
    Idle,
    NibbleHigh,
    NibbleLow,
    /// Waiting for the controller to take the last nibble or byte.
    SettleWait,
}

/// What the driver knows about the controller.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LcdSession {
    /// Whether the power-on handshake has completed.
    pub initialized: bool,
    pub mode: TransferMode,
    pub phase: TransferPhase,
    /// Shadow of the controller's DDRAM address counter.
    pub address: u8,
}
