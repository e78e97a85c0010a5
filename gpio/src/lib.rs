pub mod gpiod;
pub mod keypad;
pub mod lcd;
pub mod sim;
pub mod tick;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("device still busy after {polls} polls")]
    BusyTimeout { polls: u32 },
    #[error("tick source stopped")]
    TickSourceStopped,
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the GPIO line at the given index.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Claims the GPIO lines at the given indices as a single bus.
    /// The first index is the least significant bit.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the bias of a GPIO line.
///
/// Keypad rows are read with [GpioBias::PullUp], so an idle row reads high and a pressed key
/// pulls it low through the active column.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

pub trait GpioPin: Debug {
    /// Sets the line function to input, allowing reading its state.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>>;
    /// Sets the line function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    fn supports_bias(&self) -> bool {
        false
    }
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias used the next time the line is requested.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the line does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioInput: Debug {
    /// Reads the level of the line. `true` is high.
    fn read(&self) -> GpioResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Drives the line. `true` is high.
    fn write(&self, value: bool) -> GpioResult<()>;
}

/// A group of lines that always switch direction together.
///
/// The LCD data bus needs this: it is written while sending and read while polling the busy flag.
pub trait GpioBus<const N: usize>: Debug {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn supports_bias(&self) -> bool {
        false
    }
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    fn read(&self) -> GpioResult<[bool; N]>;
}

impl<const N: usize> dyn GpioBusInput<N> + '_ {
    /// Reads the levels of the bus as an integer, LSb first.
    pub fn read_bits(&self) -> GpioResult<u8> {
        let values = self.read()?;
        let mut bits = 0u8;
        for (i, &value) in values.iter().enumerate().take(8) {
            if value {
                bits |= 1 << i;
            }
        }
        Ok(bits)
    }
}

impl dyn GpioBusInput<4> + '_ {
    /// Reads the bus as a nibble, LSb first.
    pub fn read_nibble(&self) -> GpioResult<u8> {
        self.read_bits()
    }
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl<const N: usize> dyn GpioBusOutput<N> + '_ {
    /// Drives the bus from an integer, LSb first.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `value` does not fit in `N` bits.
    pub fn write_bits(&self, value: u8) -> GpioResult<()> {
        if value.checked_shr(N as u32).unwrap_or(0) != 0 {
            return Err(GpioError::InvalidArgument);
        }

        let mut values = [false; N];
        for (i, slot) in values.iter_mut().enumerate().take(8) {
            *slot = value & (1 << i) != 0;
        }
        self.write(&values)
    }
}

impl dyn GpioBusOutput<4> + '_ {
    /// Drives the bus with a nibble, LSb first.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        self.write_bits(value)
    }
}
