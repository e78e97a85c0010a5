use crate::lcd::hd44780::driver::{GpioHD44780Driver, SettleStrategy};
use crate::tick::Delay;
use crate::{GpioBus, GpioBusInput, GpioBusOutput, GpioOutput, GpioResult};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::time::Duration;

const DDRAM_SIZE: usize = 0x80;

/// Something the simulated controller observed, in order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LcdEvent {
    /// A nibble latched on the falling edge of E.
    Nibble { rs: bool, value: u8 },
    /// A nibble read back by the host.
    Read { rs: bool, value: u8 },
    /// A wait requested through [RecordingDelay].
    Delay(Duration),
}

/// A complete instruction or data byte as executed by the controller.
///
/// While the controller is still in 8-bit mode each nibble is a whole instruction, recorded
/// with its low bits clear.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transfer {
    pub rs: bool,
    pub byte: u8,
}

struct LcdState {
    e: bool,
    rs: bool,
    rw: bool,
    bus: [bool; 4],
    four_bit: bool,
    high_nibble: Option<u8>,
    read_high: bool,
    read_latch: u8,
    ddram: [u8; DDRAM_SIZE],
    address: u8,
    increment: bool,
    function: u8,
    display: u8,
    busy_for: u32,
    busy_remaining: u32,
    events: Vec<LcdEvent>,
    transfers: Vec<Transfer>,
}

impl LcdState {
    fn new() -> Self {
        Self {
            e: false,
            rs: false,
            rw: false,
            bus: [false; 4],
            four_bit: false,
            high_nibble: None,
            read_high: true,
            read_latch: 0,
            ddram: [b' '; DDRAM_SIZE],
            address: 0,
            increment: true,
            function: 0,
            display: 0,
            busy_for: 0,
            busy_remaining: 0,
            events: Vec::new(),
            transfers: Vec::new(),
        }
    }

    fn set_e(&mut self, value: bool) {
        let previous = std::mem::replace(&mut self.e, value);
        match (previous, value) {
            (false, true) if self.rw => self.present_read(),
            (true, false) if self.rw => self.finish_read(),
            (true, false) => self.latch(),
            _ => {}
        }
    }

    fn present_read(&mut self) {
        let byte = if self.rs {
            self.ddram[self.address as usize]
        } else {
            ((self.busy_remaining > 0) as u8) << 7 | self.address
        };
        self.read_latch = if self.read_high { byte >> 4 } else { byte & 0x0F };
        self.events.push(LcdEvent::Read {
            rs: self.rs,
            value: self.read_latch,
        });
    }

    fn finish_read(&mut self) {
        if self.read_high {
            self.read_high = false;
        } else {
            self.read_high = true;
            if !self.rs {
                self.busy_remaining = self.busy_remaining.saturating_sub(1);
            }
        }
    }

    fn latch(&mut self) {
        let nibble = self
            .bus
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &level)| acc | (level as u8) << i);
        self.events.push(LcdEvent::Nibble {
            rs: self.rs,
            value: nibble,
        });

        if !self.four_bit {
            // Only D7-D4 are wired, so every nibble is an 8-bit-mode instruction on its own.
            self.transfers.push(Transfer {
                rs: self.rs,
                byte: nibble << 4,
            });
            if !self.rs && nibble == 0x2 {
                self.four_bit = true;
                self.high_nibble = None;
            }
            return;
        }

        match self.high_nibble.take() {
            None => self.high_nibble = Some(nibble),
            Some(high) => self.execute(self.rs, high << 4 | nibble),
        }
    }

    fn step_address(&mut self, forward: bool) {
        let next = if forward {
            self.address.wrapping_add(1)
        } else {
            self.address.wrapping_sub(1)
        };
        self.address = next & (DDRAM_SIZE as u8 - 1);
    }

    fn execute(&mut self, rs: bool, byte: u8) {
        self.transfers.push(Transfer { rs, byte });

        if rs {
            self.ddram[self.address as usize] = byte;
            self.step_address(self.increment);
        } else if byte & 0x80 != 0 {
            self.address = byte & 0x7F;
        } else if byte & 0x40 != 0 {
            // CGRAM is not modelled.
        } else if byte & 0x20 != 0 {
            self.function = byte;
            if byte & 0x10 != 0 {
                self.four_bit = false;
            }
        } else if byte & 0x10 != 0 {
            if byte & 0x08 == 0 {
                self.step_address(byte & 0x04 != 0);
            }
        } else if byte & 0x08 != 0 {
            self.display = byte;
        } else if byte & 0x04 != 0 {
            self.increment = byte & 0x02 != 0;
        } else if byte & 0x02 != 0 {
            self.address = 0;
        } else if byte & 0x01 != 0 {
            self.ddram.fill(b' ');
            self.address = 0;
            self.increment = true;
        }

        self.busy_remaining = self.busy_for;
    }
}

/// An HD44780 controller wired for 4-bit operation.
///
/// Clone handles share the same controller.
#[derive(Clone)]
pub struct SimHd44780 {
    state: Rc<RefCell<LcdState>>,
}

impl SimHd44780 {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(LcdState::new())),
        }
    }

    pub fn pin_e(&self) -> SimLcdPin {
        self.pin(LcdLine::E)
    }

    pub fn pin_rs(&self) -> SimLcdPin {
        self.pin(LcdLine::Rs)
    }

    pub fn pin_rw(&self) -> SimLcdPin {
        self.pin(LcdLine::Rw)
    }

    fn pin(&self, line: LcdLine) -> SimLcdPin {
        SimLcdPin {
            lcd: self.clone(),
            line,
        }
    }

    /// The D4-D7 lines, D4 first.
    pub fn data_bus(&self) -> SimLcdBus {
        SimLcdBus { lcd: self.clone() }
    }

    /// A [Delay] that logs each wait into this controller's event log instead of sleeping.
    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay { lcd: self.clone() }
    }

    /// Makes the busy flag read set for `polls` status reads after every instruction.
    pub fn set_busy_polls(&self, polls: u32) {
        self.state.borrow_mut().busy_for = polls;
    }

    pub fn is_four_bit(&self) -> bool {
        self.state.borrow().four_bit
    }

    pub fn address(&self) -> u8 {
        self.state.borrow().address
    }

    pub fn function_set(&self) -> u8 {
        self.state.borrow().function
    }

    pub fn display_control(&self) -> u8 {
        self.state.borrow().display
    }

    pub fn increments(&self) -> bool {
        self.state.borrow().increment
    }

    pub fn char_at(&self, address: u8) -> u8 {
        self.state.borrow().ddram[address as usize % DDRAM_SIZE]
    }

    /// The first `width` characters of a display line, 1-indexed.
    pub fn line(&self, row: u8, width: usize) -> String {
        let state = self.state.borrow();
        let start = (row.saturating_sub(1) as usize * 0x40) % DDRAM_SIZE;
        state.ddram[start..(start + width).min(DDRAM_SIZE)]
            .iter()
            .map(|&b| b as char)
            .collect()
    }

    pub fn events(&self) -> Vec<LcdEvent> {
        self.state.borrow().events.clone()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.borrow().transfers.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.transfers.clear();
    }
}

impl Default for SimHd44780 {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SimHd44780 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        write!(
            f,
            "SimHd44780(4-bit: {}, address: {:#04x})",
            state.four_bit, state.address
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum LcdLine {
    E,
    Rs,
    Rw,
}

#[derive(Debug)]
pub struct SimLcdPin {
    lcd: SimHd44780,
    line: LcdLine,
}

impl GpioOutput for SimLcdPin {
    fn write(&self, value: bool) -> GpioResult<()> {
        let mut state = self.lcd.state.borrow_mut();
        match self.line {
            LcdLine::E => state.set_e(value),
            LcdLine::Rs => state.rs = value,
            LcdLine::Rw => state.rw = value,
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimLcdBus {
    lcd: SimHd44780,
}

impl GpioBus<4> for SimLcdBus {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<4> + '_>> {
        Ok(Box::new(SimLcdBusInput {
            lcd: self.lcd.clone(),
        }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<4> + '_>> {
        Ok(Box::new(SimLcdBusOutput {
            lcd: self.lcd.clone(),
        }))
    }
}

#[derive(Debug)]
struct SimLcdBusInput {
    lcd: SimHd44780,
}

impl GpioBusInput<4> for SimLcdBusInput {
    fn read(&self) -> GpioResult<[bool; 4]> {
        let latch = self.lcd.state.borrow().read_latch;
        Ok(std::array::from_fn(|i| latch & (1 << i) != 0))
    }
}

#[derive(Debug)]
struct SimLcdBusOutput {
    lcd: SimHd44780,
}

impl GpioBusOutput<4> for SimLcdBusOutput {
    fn write(&self, values: &[bool; 4]) -> GpioResult<()> {
        self.lcd.state.borrow_mut().bus = *values;
        Ok(())
    }
}

#[derive(Debug)]
pub struct RecordingDelay {
    lcd: SimHd44780,
}

impl Delay for RecordingDelay {
    fn delay(&self, duration: Duration) {
        self.lcd
            .state
            .borrow_mut()
            .events
            .push(LcdEvent::Delay(duration));
    }
}

/// One set of lines to a [SimHd44780], owned so a driver can borrow them.
#[derive(Debug)]
pub struct SimLcdWiring {
    pub e: SimLcdPin,
    pub rw: SimLcdPin,
    pub rs: SimLcdPin,
    pub bus: SimLcdBus,
    pub delay: RecordingDelay,
}

impl SimLcdWiring {
    /// Builds a driver over all four control lines.
    pub fn driver(&mut self, settle: SettleStrategy) -> GpioHD44780Driver<'_> {
        GpioHD44780Driver::new_4bit(
            &self.e,
            Some(&self.rw as &dyn GpioOutput),
            &self.rs,
            &mut self.bus,
            &self.delay,
            settle,
        )
    }
}

impl SimHd44780 {
    pub fn wiring(&self) -> SimLcdWiring {
        SimLcdWiring {
            e: self.pin_e(),
            rw: self.pin_rw(),
            rs: self.pin_rs(),
            bus: self.data_bus(),
            delay: self.delay(),
        }
    }
}
