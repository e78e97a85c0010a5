use crate::lcd::hd44780::driver::{
    CLEAR_DISPLAY, CURSOR_SHIFT, CursorDirection, ENTRY_MODE_SET, Font, HD44780Driver, LcdSession,
    Lines, RETURN_HOME, SET_DDRAM_ADDRESS, TransferMode, TransferPhase,
};
use crate::tick::Delay;
use crate::{GpioBus, GpioError, GpioOutput, GpioResult};
use log::{debug, trace, warn};
use std::time::Duration;

/// How the driver waits for the controller to finish a transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SettleStrategy {
    /// Reads the busy flag back over the RW line, giving up after `max_polls` reads.
    BusyFlag { max_polls: u32 },
    /// Waits `short` after every nibble and instruction, `long` after clear and home.
    FixedDelay { short: Duration, long: Duration },
}

impl SettleStrategy {
    pub const DEFAULT_MAX_POLLS: u32 = 1000;

    pub fn busy_flag() -> Self {
        SettleStrategy::BusyFlag {
            max_polls: Self::DEFAULT_MAX_POLLS,
        }
    }

    /// Fixed waits covering the datasheet execution times (37 µs, 1.52 ms) with some margin.
    pub fn fixed_delay() -> Self {
        SettleStrategy::FixedDelay {
            short: Duration::from_micros(50),
            long: Duration::from_millis(2),
        }
    }
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::fixed_delay()
    }
}

/// HD44780 driver on a 4-bit data bus (D4-D7).
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    pin_e: &'a dyn GpioOutput,
    pin_rw: Option<&'a dyn GpioOutput>,
    pin_rs: &'a dyn GpioOutput,
    data_bus: &'a mut dyn GpioBus<4>,
    delay: &'a dyn Delay,
    settle: SettleStrategy,
    cursor: (bool, bool),
    increment: bool,
    session: LcdSession,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Minimum width of the E pulse.
    pub const ENABLE_PULSE: Duration = Duration::from_nanos(450);
    /// Minimum time between the two nibbles of a byte.
    pub const ENABLE_CYCLE: Duration = Duration::from_micros(1);
    /// Wait after the first handshake nibble.
    pub const INIT_WAIT_LONG: Duration = Duration::from_micros(4100);
    /// Wait after each later handshake nibble.
    pub const INIT_WAIT_SHORT: Duration = Duration::from_micros(100);

    /// Creates a driver. `pin_rw` may be left out when RW is tied low, in which case only
    /// [SettleStrategy::FixedDelay] works.
    pub fn new_4bit(
        pin_e: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_rs: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<4>,
        delay: &'a dyn Delay,
        settle: SettleStrategy,
    ) -> Self {
        GpioHD44780Driver {
            pin_e,
            pin_rw,
            pin_rs,
            data_bus,
            delay,
            settle,
            cursor: (true, true),
            increment: true,
            session: LcdSession::default(),
        }
    }

    /// Sets whether `init` turns on the underline cursor and the blinking block.
    pub fn with_cursor(mut self, visible: bool, blink: bool) -> Self {
        self.cursor = (visible, blink);
        self
    }

    fn pulse_e(pin: &dyn GpioOutput, delay: &dyn Delay) -> GpioResult<()> {
        pin.write(true)?;
        delay.delay(Self::ENABLE_PULSE);
        pin.write(false)?;
        Ok(())
    }

    fn select(&mut self, mode: TransferMode) -> GpioResult<()> {
        self.pin_rs.write(mode == TransferMode::Data)?;
        if let Some(rw) = self.pin_rw {
            rw.write(false)?;
        }
        self.session.mode = mode;
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8) -> GpioResult<()> {
        let bus = self.data_bus.as_output()?;
        bus.write_nibble(nibble)?;
        Self::pulse_e(self.pin_e, self.delay)
    }

    fn send(&mut self, byte: u8, mode: TransferMode) -> GpioResult<()> {
        trace!("Sending {:08b} as {:?}", byte, mode);
        self.select(mode)?;

        self.session.phase = TransferPhase::NibbleHigh;
        self.write_nibble(byte >> 4)?;
        self.session.phase = TransferPhase::SettleWait;
        self.settle_nibble();

        self.session.phase = TransferPhase::NibbleLow;
        self.write_nibble(byte & 0x0F)?;
        self.session.phase = TransferPhase::SettleWait;
        self.track(byte, mode);
        let long = mode == TransferMode::Command
            && (byte == CLEAR_DISPLAY || byte & !0b1 == RETURN_HOME);
        self.settle_byte(long)?;

        self.session.phase = TransferPhase::Idle;
        Ok(())
    }

    fn settle_nibble(&self) {
        match self.settle {
            SettleStrategy::FixedDelay { short, .. } => self.delay.delay(short),
            // The busy flag only means something once the whole byte is in.
            SettleStrategy::BusyFlag { .. } => self.delay.delay(Self::ENABLE_CYCLE),
        }
    }

    fn settle_byte(&mut self, long: bool) -> GpioResult<()> {
        match self.settle {
            SettleStrategy::FixedDelay { short, long: long_wait } => {
                self.delay.delay(if long { long_wait } else { short });
                Ok(())
            }
            SettleStrategy::BusyFlag { max_polls } => self.wait_ready(max_polls),
        }
    }

    fn wait_ready(&mut self, max_polls: u32) -> GpioResult<()> {
        for _ in 0..max_polls {
            let (busy, address) = self.get_busy_flag_and_address()?;
            if !busy {
                self.session.address = address;
                return Ok(());
            }
        }
        warn!("HD44780 still busy after {} polls", max_polls);
        Err(GpioError::BusyTimeout { polls: max_polls })
    }

    /// Follows the address counter the way the controller moves it.
    fn track(&mut self, byte: u8, mode: TransferMode) {
        let address = self.session.address;
        let step = |forward: bool| {
            let next = if forward {
                address.wrapping_add(1)
            } else {
                address.wrapping_sub(1)
            };
            next & 0x7F
        };

        if mode == TransferMode::Data {
            self.session.address = step(self.increment);
            return;
        }

        match byte.checked_ilog2().map(|bit| 1u8 << bit) {
            Some(SET_DDRAM_ADDRESS) => self.session.address = byte & 0x7F,
            Some(CURSOR_SHIFT) if byte & 0b1000 == 0 => {
                self.session.address = step(byte & 0b100 != 0);
            }
            Some(ENTRY_MODE_SET) => self.increment = byte & 0b10 != 0,
            Some(RETURN_HOME) => self.session.address = 0,
            Some(CLEAR_DISPLAY) => {
                self.session.address = 0;
                self.increment = true;
            }
            _ => {}
        }
    }

    fn read(&mut self, mode: TransferMode) -> GpioResult<u8> {
        let Some(rw) = self.pin_rw else {
            return Err(GpioError::NotSupported);
        };

        let input = self.data_bus.as_input()?;
        self.pin_rs.write(mode == TransferMode::Data)?;
        rw.write(true)?;

        self.pin_e.write(true)?;
        self.delay.delay(Self::ENABLE_PULSE);
        let high_nibble = input.read_nibble()?;
        self.pin_e.write(false)?;
        self.delay.delay(Self::ENABLE_CYCLE);

        self.pin_e.write(true)?;
        self.delay.delay(Self::ENABLE_PULSE);
        let low_nibble = input.read_nibble()?;
        self.pin_e.write(false)?;

        rw.write(false)?;
        self.session.mode = mode;

        let data = (high_nibble << 4) | low_nibble;
        trace!("Read {:08b} as {:?}", data, mode);
        Ok(data)
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    fn init(&mut self, lines: Lines, font: Font) -> GpioResult<()> {
        debug!("Initializing HD44780: {:?} lines, {:?} font, {:?}", lines, font, self.settle);

        if matches!(self.settle, SettleStrategy::BusyFlag { .. }) && self.pin_rw.is_none() {
            return Err(GpioError::NotSupported);
        }
        if lines == Lines::Two && font == Font::Large {
            warn!("The large font is only available on one line, the controller will ignore it");
        }

        self.session = LcdSession::default();
        self.increment = true;

        // Whatever state the controller is in, three 0x3 nibbles leave it in 8-bit mode and
        // 0x2 then switches it to 4-bit. The busy flag cannot be read until that is done.
        self.select(TransferMode::Command)?;
        self.write_nibble(0x3)?;
        self.delay.delay(Self::INIT_WAIT_LONG);
        self.write_nibble(0x3)?;
        self.delay.delay(Self::INIT_WAIT_SHORT);
        self.write_nibble(0x3)?;
        self.delay.delay(Self::INIT_WAIT_SHORT);
        self.write_nibble(0x2)?;
        self.delay.delay(Self::INIT_WAIT_SHORT);

        self.function_set(false, lines, font)?;
        let (cursor, blink) = self.cursor;
        self.set_display_control(true, cursor, blink)?;
        self.clear_display()?;
        self.return_home()?;
        self.set_entry_mode(CursorDirection::Right, false)?;

        self.session.initialized = true;
        debug!("HD44780 initialized");
        Ok(())
    }

    fn session(&self) -> LcdSession {
        self.session
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, TransferMode::Command)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, TransferMode::Data)
    }

    fn read_command(&mut self) -> GpioResult<u8> {
        self.read(TransferMode::Command)
    }
}
