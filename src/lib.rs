//! # MAX44009 Ambient Light Sensor Driver
//!
//! This is a platform-agnostic Rust driver for the MAX44009 ambient light sensor,
//! built using the [`embedded-hal`] traits for I2C communication.
//!
//! The MAX44009 is a low-power digital light sensor that provides:
//! - A 0.045 lux to 188,000 lux measurement range
//! - Automatic or manual range selection
//! - Programmable integration time (6.25ms to 800ms)
//! - Interrupt output with upper/lower lux thresholds and a threshold timer
//! - I2C interface (address 0x4A or 0x4B)
//!
//! ## Features
//!
//! - **Register codec** for configuration and lux readings, usable on its own
//! - **Blocking driver** over [`embedded_hal::i2c::I2c`]
//! - **Async/await support** with feature gating (optional)
//! - **Shared handle with continuous polling** on a background thread (`std`)
//! - **Linux bus opening** through `linux-embedded-hal` (`linux`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use max44009::{Configuration, IntegrationTime, Max44009, DEFAULT_ADDRESS};
//!
//! # fn main() {
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let mut sensor = Max44009::new(i2c, DEFAULT_ADDRESS);
//!
//! // Continuous mode, manual range, 100ms integration
//! let config = Configuration {
//!     continuous: true,
//!     manual: true,
//!     ..Configuration::default()
//! }
//! .with_integration_time(IntegrationTime::Ms100);
//! sensor.configure(config).unwrap();
//!
//! let lux = sensor.read_lux().unwrap();
//! // println!("Ambient light: {:.2} lux", lux);
//! # }
//! ```
//!
//! ## Continuous Reading
//!
//! With the default `std` feature, [`Max44009Handle`] serialises bus access
//! behind a mutex and can poll the sensor from a background thread:
//!
//! ```rust,ignore
//! let handle = Max44009Handle::new(Max44009::new(i2c, DEFAULT_ADDRESS));
//! let readings = handle.start();
//! for lux in readings.iter().take(10) {
//!     println!("{lux:.2} lux");
//! }
//! handle.halt();
//! let i2c = handle.close()?;
//! ```
//!
//! ## Async Usage
//!
//! Enable the `async` feature to use async/await patterns:
//!
//! ```toml
//! [dependencies]
//! max44009 = { version = "0.1", features = ["async"] }
//! ```
//!
//! ```rust,ignore
//! use max44009::{Configuration, Max44009, DEFAULT_ADDRESS};
//!
//! let i2c = /* your async I2C implementation */;
//! let mut sensor = Max44009::new_async(i2c, DEFAULT_ADDRESS);
//!
//! sensor.configure_async(Configuration::default()).await.unwrap();
//! let lux = sensor.read_lux_async().await.unwrap();
//! ```
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

use core::fmt;

use embedded_hal::i2c::I2c;

#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c as AsyncI2c;

pub mod codec;
#[cfg(feature = "std")]
pub mod handle;

pub use codec::{decode_luminosity, encode_configuration, ThresholdKind};
#[cfg(feature = "std")]
pub use handle::{Max44009Handle, PollOptions};

/// I2C address with the A0 pin tied to ground
pub const DEFAULT_ADDRESS: u8 = 0x4A;
/// I2C address with the A0 pin tied to VCC
pub const ALTERNATE_ADDRESS: u8 = 0x4B;

/// Register addresses
pub mod register {
    /// Interrupt status, bit 0 set while the interrupt is asserted
    pub const INTERRUPT_STATUS: u8 = 0x00;
    /// Interrupt enable, bit 0
    pub const INTERRUPT_ENABLE: u8 = 0x01;
    /// Configuration
    pub const CONFIGURATION: u8 = 0x02;
    /// Lux reading, exponent and mantissa high nibble
    pub const LUX_HIGH_BYTE: u8 = 0x03;
    /// Lux reading, mantissa low nibble
    pub const LUX_LOW_BYTE: u8 = 0x04;
    /// Upper threshold, exponent and mantissa high nibble
    pub const UPPER_THRESHOLD: u8 = 0x05;
    /// Lower threshold, exponent and mantissa high nibble
    pub const LOWER_THRESHOLD: u8 = 0x06;
    /// Threshold timer in units of 100ms
    pub const THRESHOLD_TIMER: u8 = 0x07;
}

/// Integration time settings
///
/// Only honoured by the device in manual mode; in automatic mode the sensor
/// picks the integration time itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum IntegrationTime {
    /// 800ms, preferred for low light
    Ms800 = 0b000,
    /// 400ms
    Ms400 = 0b001,
    /// 200ms
    Ms200 = 0b010,
    /// 100ms, preferred for high brightness
    Ms100 = 0b011,
    /// 50ms, manual mode only
    Ms50 = 0b100,
    /// 25ms, manual mode only
    Ms25 = 0b101,
    /// 12.5ms, manual mode only
    Ms12_5 = 0b110,
    /// 6.25ms, manual mode only
    Ms6_25 = 0b111,
}

impl IntegrationTime {
    /// Decode the low three bits of a configuration value
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0b000 => Self::Ms800,
            0b001 => Self::Ms400,
            0b010 => Self::Ms200,
            0b011 => Self::Ms100,
            0b100 => Self::Ms50,
            0b101 => Self::Ms25,
            0b110 => Self::Ms12_5,
            _ => Self::Ms6_25,
        }
    }

    /// Integration time in microseconds
    pub fn as_micros(self) -> u32 {
        800_000 >> (self as u32)
    }
}

/// Contents of the configuration register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Configuration {
    /// Measure continuously instead of once every 800ms
    pub continuous: bool,
    /// Use `current_division` and `integration_time` instead of automatic ranging
    pub manual: bool,
    /// Current division ratio; divides the photodiode current by 8
    pub current_division: bool,
    /// Integration time selector; only the low three bits are encoded
    pub integration_time: u8,
}

impl Default for Configuration {
    /// The power-on state of the register (0x03)
    fn default() -> Self {
        Self {
            continuous: false,
            manual: false,
            current_division: false,
            integration_time: IntegrationTime::Ms100 as u8,
        }
    }
}

impl Configuration {
    /// Set the integration time selector from a named value
    pub fn with_integration_time(mut self, time: IntegrationTime) -> Self {
        self.integration_time = time as u8;
        self
    }

    /// Integration time named by the (masked) selector
    pub fn integration(&self) -> IntegrationTime {
        IntegrationTime::from_bits(self.integration_time)
    }

    /// Encode into the configuration register byte
    pub fn to_byte(&self) -> u8 {
        codec::encode_configuration(
            self.continuous,
            self.manual,
            self.current_division,
            self.integration_time,
        )
    }
}

/// All possible errors in this crate
#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// The I2C bus could not be opened
    BusOpen(E),
    /// The bus is still shared and cannot be handed back.
    ///
    /// Only `Max44009Handle::close` returns this, and only if something
    /// besides the handle still references the driver. The handle never hands
    /// out such a reference and joins its polling thread before closing, so
    /// with this crate's API the variant is not produced in practice.
    BusInUse,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C transaction failed: {e:?}"),
            Error::BusOpen(e) => write!(f, "failed to open I2C bus: {e:?}"),
            Error::BusInUse => f.write_str("I2C bus is still in use by a polling thread"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

/// High-level MAX44009 driver
#[derive(Debug)]
pub struct Max44009<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Max44009<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a new MAX44009 driver on an already opened bus
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Write the configuration register.
    ///
    /// Returns the byte the device sends back in the same transaction. The
    /// echo is not validated.
    pub fn configure(&mut self, config: Configuration) -> Result<u8, Error<E>> {
        let byte = config.to_byte();
        log::trace!("max44009@{:#04x}: configuration <- {:#04x}", self.address, byte);

        let mut echo = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register::CONFIGURATION, byte], &mut echo)
            .map_err(Error::I2c)?;
        Ok(echo[0])
    }

    /// Read the current configuration register
    pub fn read_configuration(&mut self) -> Result<Configuration, Error<E>> {
        let byte = self.read_register(register::CONFIGURATION)?;
        Ok(codec::decode_configuration(byte))
    }

    /// Read the ambient light level in lux.
    ///
    /// Both lux bytes are read in one transaction so exponent and mantissa
    /// belong to the same conversion.
    pub fn read_lux(&mut self) -> Result<f64, Error<E>> {
        let mut data = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register::LUX_HIGH_BYTE], &mut data)
            .map_err(Error::I2c)?;
        log::trace!(
            "max44009@{:#04x}: lux bytes {:#04x} {:#04x}",
            self.address,
            data[0],
            data[1]
        );
        Ok(codec::decode_luminosity(data[0], data[1]))
    }

    /// Check and clear the interrupt flag; reading the status deasserts INT
    pub fn interrupt_status(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_register(register::INTERRUPT_STATUS)? & 0x01 != 0)
    }

    /// Enable or disable the threshold interrupt
    pub fn set_interrupt_enabled(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.write_register(register::INTERRUPT_ENABLE, u8::from(enable))
    }

    /// Whether the threshold interrupt is enabled
    pub fn interrupt_enabled(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_register(register::INTERRUPT_ENABLE)? & 0x01 != 0)
    }

    /// Set the raw upper threshold byte, see [`codec::lux_to_threshold`]
    pub fn set_upper_threshold(&mut self, threshold: u8) -> Result<(), Error<E>> {
        self.write_register(register::UPPER_THRESHOLD, threshold)
    }

    /// Set the raw lower threshold byte, see [`codec::lux_to_threshold`]
    pub fn set_lower_threshold(&mut self, threshold: u8) -> Result<(), Error<E>> {
        self.write_register(register::LOWER_THRESHOLD, threshold)
    }

    /// Set how long, in units of 100ms, a threshold must be crossed before INT asserts
    pub fn set_threshold_timer(&mut self, ticks: u8) -> Result<(), Error<E>> {
        self.write_register(register::THRESHOLD_TIMER, ticks)
    }

    /// Device address on the bus
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Destroy the driver and return the I2C interface
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    // Helper methods for register access
    fn read_register(&mut self, address: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[address], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error<E>> {
        log::trace!("max44009@{:#04x}: {:#04x} <- {:#04x}", self.address, address, value);
        self.i2c
            .write(self.address, &[address, value])
            .map_err(Error::I2c)
    }
}

#[cfg(feature = "linux")]
impl Max44009<linux_embedded_hal::I2cdev> {
    /// Open an I2C character device (e.g. `/dev/i2c-1`) and bind a driver to it
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        address: u8,
    ) -> Result<Self, Error<linux_embedded_hal::I2CError>> {
        let i2c = linux_embedded_hal::I2cdev::new(path)
            .map_err(|e| Error::BusOpen(linux_embedded_hal::I2CError::from(e)))?;
        Ok(Self::new(i2c, address))
    }
}

#[cfg(feature = "async")]
impl<I2C, E> Max44009<I2C>
where
    I2C: AsyncI2c<Error = E>,
{
    /// Create a new MAX44009 driver instance (async version)
    pub fn new_async(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Write the configuration register (async version)
    pub async fn configure_async(&mut self, config: Configuration) -> Result<u8, Error<E>> {
        let byte = config.to_byte();
        log::trace!("max44009@{:#04x}: configuration <- {:#04x}", self.address, byte);

        let mut echo = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register::CONFIGURATION, byte], &mut echo)
            .await
            .map_err(Error::I2c)?;
        Ok(echo[0])
    }

    /// Read the current configuration register (async version)
    pub async fn read_configuration_async(&mut self) -> Result<Configuration, Error<E>> {
        let byte = self.read_register_async(register::CONFIGURATION).await?;
        Ok(codec::decode_configuration(byte))
    }

    /// Read the ambient light level in lux (async version)
    pub async fn read_lux_async(&mut self) -> Result<f64, Error<E>> {
        let mut data = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register::LUX_HIGH_BYTE], &mut data)
            .await
            .map_err(Error::I2c)?;
        log::trace!(
            "max44009@{:#04x}: lux bytes {:#04x} {:#04x}",
            self.address,
            data[0],
            data[1]
        );
        Ok(codec::decode_luminosity(data[0], data[1]))
    }

    /// Check and clear the interrupt flag (async version)
    pub async fn interrupt_status_async(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_register_async(register::INTERRUPT_STATUS).await? & 0x01 != 0)
    }

    /// Enable or disable the threshold interrupt (async version)
    pub async fn set_interrupt_enabled_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.write_register_async(register::INTERRUPT_ENABLE, u8::from(enable))
            .await
    }

    /// Whether the threshold interrupt is enabled (async version)
    pub async fn interrupt_enabled_async(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_register_async(register::INTERRUPT_ENABLE).await? & 0x01 != 0)
    }

    /// Set the raw upper threshold byte (async version)
    pub async fn set_upper_threshold_async(&mut self, threshold: u8) -> Result<(), Error<E>> {
        self.write_register_async(register::UPPER_THRESHOLD, threshold)
            .await
    }

    /// Set the raw lower threshold byte (async version)
    pub async fn set_lower_threshold_async(&mut self, threshold: u8) -> Result<(), Error<E>> {
        self.write_register_async(register::LOWER_THRESHOLD, threshold)
            .await
    }

    /// Set the threshold timer in units of 100ms (async version)
    pub async fn set_threshold_timer_async(&mut self, ticks: u8) -> Result<(), Error<E>> {
        self.write_register_async(register::THRESHOLD_TIMER, ticks)
            .await
    }

    // Helper methods for async register access
    async fn read_register_async(&mut self, address: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[address], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    async fn write_register_async(&mut self, address: u8, value: u8) -> Result<(), Error<E>> {
        log::trace!("max44009@{:#04x}: {:#04x} <- {:#04x}", self.address, address, value);
        self.i2c
            .write(self.address, &[address, value])
            .await
            .map_err(Error::I2c)
    }
}


#[cfg(all(test, feature = "async"))]
mod async_tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    extern crate std;
    use std::vec;

    const ADDR: u8 = DEFAULT_ADDRESS;

    #[test]
    fn test_configure_async_writes_control_byte() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![register::CONFIGURATION, 0x8D],
            vec![0x8D],
        )];
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Max44009::new_async(i2c, ADDR);

        let config = Configuration {
            continuous: true,
            manual: false,
            current_division: true,
            integration_time: 5,
        };
        let echo = pollster::block_on(sensor.configure_async(config)).unwrap();
        assert_eq!(echo, 0x8D);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_read_lux_async() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![register::LUX_HIGH_BYTE],
            vec![0x1F, 0x00],
        )];
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Max44009::new_async(i2c, ADDR);

        let lux = pollster::block_on(sensor.read_lux_async()).unwrap();
        assert!((lux - 345.6).abs() < 1e-6);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_read_lux_async_error() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![register::LUX_HIGH_BYTE],
            vec![0x00, 0x00],
        )
        .with_error(ErrorKind::Other)];
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Max44009::new_async(i2c, ADDR);

        let result = pollster::block_on(sensor.read_lux_async());
        assert!(matches!(result, Err(Error::I2c(ErrorKind::Other))));

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_async_registers() {
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![register::CONFIGURATION], vec![0xC3]),
            I2cTransaction::write(ADDR, vec![register::INTERRUPT_ENABLE, 0x01]),
            I2cTransaction::write_read(ADDR, vec![register::INTERRUPT_ENABLE], vec![0x01]),
            I2cTransaction::write_read(ADDR, vec![register::INTERRUPT_STATUS], vec![0x01]),
            I2cTransaction::write(ADDR, vec![register::UPPER_THRESHOLD, 0x3A]),
            I2cTransaction::write(ADDR, vec![register::LOWER_THRESHOLD, 0x0D]),
            I2cTransaction::write(ADDR, vec![register::THRESHOLD_TIMER, 5]),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Max44009::new_async(i2c, ADDR);

        pollster::block_on(async {
            let config = sensor.read_configuration_async().await.unwrap();
            assert!(config.continuous && config.manual);
            assert_eq!(config.integration(), IntegrationTime::Ms100);

            sensor.set_interrupt_enabled_async(true).await.unwrap();
            assert!(sensor.interrupt_enabled_async().await.unwrap());
            assert!(sensor.interrupt_status_async().await.unwrap());

            sensor.set_upper_threshold_async(0x3A).await.unwrap();
            sensor.set_lower_threshold_async(0x0D).await.unwrap();
            sensor.set_threshold_timer_async(5).await.unwrap();
        });

        let mut i2c = sensor.destroy();
        i2c.done();
    }
}
