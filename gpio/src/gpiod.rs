//! Linux character-device backend, built on the `gpiod` crate.
//!
//! Lines are claimed through [GpiodDriver] and returned to the pool when the pin or bus handle is
//! dropped. Direction and bias are only applied when a handle is turned into an input or output.
use crate::{
    GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError, GpioInput, GpioOutput,
    GpioPin, GpioResult,
};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

const CONSUMER: &str = env!("CARGO_PKG_NAME");

pub struct GpiodDriver {
    chip: gpiod::Chip,
    claimed: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let lines = chip.num_lines() as usize;
        Self {
            chip,
            claimed: BitVec::repeat(false, lines),
        }
    }

    /// Opens a GPIO chip device, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path.as_ref())?;
        debug!("Opened {} with {} lines", chip.name(), chip.num_lines());
        Ok(Self::new(chip))
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        let count = self.count()?;
        if indices.iter().any(|&index| index >= count) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.claimed[index]) {
            return Err(GpioError::AlreadyInUse);
        }
        for &index in indices {
            self.claimed.set_aliased(index, true);
        }
        Ok(())
    }

    fn release(&self, indices: &[usize]) {
        for &index in indices {
            self.claimed.set_aliased(index, false);
        }
    }

    fn offsets(indices: &[usize]) -> Vec<u32> {
        indices.iter().map(|&index| index as u32).collect()
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.get_pin_bus([index])
            .map(|bus| Box::new(GpiodPin { bus }) as Box<dyn GpioPin + '_>)
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;
        Ok(Box::new(GpiodBus {
            driver: self,
            indices,
            bias: GpioBias::None,
        }))
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

/// A single line is a one-wide bus.
struct GpiodPin<'a> {
    bus: Box<dyn GpioBus<1> + 'a>,
}

impl Debug for GpiodPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.bus)
    }
}

impl GpioPin for GpiodPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        let input = self.bus.as_input()?;
        Ok(Box::new(GpiodLineInput { input }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let output = self.bus.as_output()?;
        Ok(Box::new(GpiodLineOutput { output }))
    }

    fn supports_bias(&self) -> bool {
        self.bus.supports_bias()
    }

    fn bias(&self) -> GpioBias {
        self.bus.bias()
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bus.set_bias(bias)
    }
}

#[derive(Debug)]
struct GpiodLineInput<'a> {
    input: Box<dyn GpioBusInput<1> + 'a>,
}

impl GpioInput for GpiodLineInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        Ok(self.input.read()?[0])
    }
}

#[derive(Debug)]
struct GpiodLineOutput<'a> {
    output: Box<dyn GpioBusOutput<1> + 'a>,
}

impl GpioOutput for GpiodLineOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.output.write(&[value])
    }
}

struct GpiodBus<'a, const N: usize> {
    driver: &'a GpiodDriver,
    indices: [usize; N],
    bias: GpioBias,
}

impl<const N: usize> Debug for GpiodBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.indices)
    }
}

impl<const N: usize> GpioBus<N> for GpiodBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        let lines = self.driver.chip.request_lines(
            gpiod::Options::input(GpiodDriver::offsets(&self.indices))
                .consumer(CONSUMER)
                .bias(self.bias.into()),
        )?;
        Ok(Box::new(GpiodBusInput { bus: self, lines }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let lines = self.driver.chip.request_lines(
            gpiod::Options::output(GpiodDriver::offsets(&self.indices))
                .consumer(CONSUMER)
                .bias(self.bias.into()),
        )?;
        Ok(Box::new(GpiodBusOutput { bus: self, lines }))
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl<const N: usize> Drop for GpiodBus<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.indices);
    }
}

struct GpiodBusInput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    lines: gpiod::Lines<gpiod::Input>,
}

impl<const N: usize> Debug for GpiodBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        Ok(self.lines.get_values([false; N])?)
    }
}

struct GpiodBusOutput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    lines: gpiod::Lines<gpiod::Output>,
}

impl<const N: usize> Debug for GpiodBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.lines.set_values(*values)?;
        Ok(())
    }
}
