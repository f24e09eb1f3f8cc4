//! Hardware collaborators the panel driver talks through.
//!
//! Each seam is a small trait so boards can plug in whatever they have. The
//! adapters below cover the common case of `embedded-hal` 1.0 peripherals.

use crate::error::BusError;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;
use log::error;
use std::time::Duration;

/// Command transport to the panel controller.
pub trait PanelBus {
    /// Send one command with its parameter bytes.
    fn send(&mut self, opcode: u8, params: &[u8]) -> Result<(), BusError>;
}

/// Side channel to the companion microcontroller that owns the backlight PWM.
pub trait CompanionChannel {
    /// Write a four byte payload to a companion register.
    fn write(&mut self, register: u8, payload: [u8; 4]) -> Result<(), BusError>;
}

/// Panel power rail switch.
pub trait PowerRail {
    /// Drive the rail on or off.
    fn set_power(&mut self, on: bool);
}

/// System facility that keeps the platform out of idle/suspend.
///
/// Calls come in `acquire`/`release` pairs; nesting is never required.
pub trait IdleInhibitor: Send + Sync {
    /// Block idle entry.
    fn acquire(&self);

    /// Allow idle entry again.
    fn release(&self);
}

/// Scoped hold on an [`IdleInhibitor`], released on drop.
#[must_use = "idle entry is allowed again as soon as the guard is dropped"]
pub struct IdleGuard<'a> {
    inhibitor: &'a dyn IdleInhibitor,
}

impl<'a> IdleGuard<'a> {
    /// Acquire the inhibitor until the returned guard is dropped.
    pub fn hold(inhibitor: &'a dyn IdleInhibitor) -> Self {
        inhibitor.acquire();
        Self { inhibitor }
    }
}

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.inhibitor.release();
    }
}

/// Companion channel for boards without one; every write succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompanion;

impl CompanionChannel for NoCompanion {
    fn write(&mut self, _register: u8, _payload: [u8; 4]) -> Result<(), BusError> {
        Ok(())
    }
}

/// Inhibitor for platforms without an idle/suspend facility.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIdleInhibit;

impl IdleInhibitor for NoIdleInhibit {
    fn acquire(&self) {}

    fn release(&self) {}
}

// =============================================================================
// embedded-hal adapters
// =============================================================================

/// Data/command flag in bit 8 of a 9-bit 3-wire SPI word.
const DATA_FLAG: u16 = 1 << 8;

/// 3-wire 9-bit SPI transport.
///
/// The controller has no D/C pin; the ninth bit of every word selects
/// command (0) or parameter (1). A command and its parameters go out in one
/// chip-select assertion.
pub struct Spi9BitBus<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice<u16>> Spi9BitBus<SPI> {
    /// Wrap a `SpiDevice` configured for 9-bit words.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Hand back the underlying device.
    pub fn release(self) -> SPI {
        self.spi
    }

    fn frame(opcode: u8, params: &[u8]) -> Vec<u16> {
        let mut words = Vec::with_capacity(params.len() + 1);
        words.push(u16::from(opcode));
        words.extend(params.iter().map(|&b| DATA_FLAG | u16::from(b)));
        words
    }
}

impl<SPI: SpiDevice<u16>> PanelBus for Spi9BitBus<SPI> {
    fn send(&mut self, opcode: u8, params: &[u8]) -> Result<(), BusError> {
        use embedded_hal::spi::Error as _;

        self.spi
            .write(&Self::frame(opcode, params))
            .map_err(|e| BusError::Spi {
                opcode,
                kind: e.kind(),
            })
    }
}

/// Companion microcontroller reached over I2C.
///
/// Writes go out as the register byte followed by the payload.
pub struct I2cCompanion<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> I2cCompanion<I> {
    /// Wrap an I2C bus with the companion chip at `address`.
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Hand back the underlying bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> CompanionChannel for I2cCompanion<I> {
    fn write(&mut self, register: u8, payload: [u8; 4]) -> Result<(), BusError> {
        use embedded_hal::i2c::Error as _;

        let mut frame = [0u8; 5];
        frame[0] = register;
        frame[1..].copy_from_slice(&payload);
        self.i2c
            .write(self.address, &frame)
            .map_err(|e| BusError::Companion {
                register,
                kind: e.kind(),
            })
    }
}

/// Power rail on a GPIO output, active high.
pub struct GpioPowerRail<P> {
    pin: P,
}

impl<P: OutputPin> GpioPowerRail<P> {
    /// Wrap the rail enable pin.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Hand back the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> PowerRail for GpioPowerRail<P> {
    fn set_power(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        // The rail toggle has no error channel.
        if let Err(e) = result {
            error!("panel power rail {} failed: {:?}", if on { "on" } else { "off" }, e);
        }
    }
}

/// Blocking delay on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_spi_frames_command_and_parameters() {
        let expectations: [SpiTransaction<u16>; 6] = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x0C2, 0x136, 0x112]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x029]),
            SpiTransaction::transaction_end(),
        ];
        let spi = SpiMock::new(&expectations);
        let mut bus = Spi9BitBus::new(spi);

        bus.send(0xC2, &[0x36, 0x12]).unwrap();
        bus.send(0x29, &[]).unwrap();

        bus.release().done();
    }

    #[test]
    fn test_i2c_companion_prefixes_register() {
        let expectations = [I2cTransaction::write(0x66, vec![0x25, 0x05, 0x45, 0x00, 0x01])];
        let i2c = I2cMock::new(&expectations);
        let mut companion = I2cCompanion::new(i2c, 0x66);

        companion.write(0x25, [0x05, 0x45, 0x00, 0x01]).unwrap();

        companion.release().done();
    }

    #[test]
    fn test_i2c_failure_maps_to_bus_error() {
        let expectations = [I2cTransaction::write(0x66, vec![0x25, 0x05, 0x00, 0x00, 0x01])
            .with_error(embedded_hal::i2c::ErrorKind::Other)];
        let i2c = I2cMock::new(&expectations);
        let mut companion = I2cCompanion::new(i2c, 0x66);

        let err = companion.write(0x25, [0x05, 0x00, 0x00, 0x01]).unwrap_err();
        assert_eq!(
            err,
            BusError::Companion {
                register: 0x25,
                kind: embedded_hal::i2c::ErrorKind::Other,
            }
        );

        companion.release().done();
    }

    #[test]
    fn test_gpio_power_rail_toggles_pin() {
        let expectations = [
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ];
        let pin = PinMock::new(&expectations);
        let mut rail = GpioPowerRail::new(pin);

        rail.set_power(true);
        rail.set_power(false);

        rail.release().done();
    }

    struct CountingInhibitor {
        held: AtomicUsize,
    }

    impl IdleInhibitor for CountingInhibitor {
        fn acquire(&self) {
            self.held.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.held.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_idle_guard_releases_on_drop() {
        let inhibitor = CountingInhibitor {
            held: AtomicUsize::new(0),
        };
        {
            let _guard = IdleGuard::hold(&inhibitor);
            assert_eq!(inhibitor.held.load(Ordering::SeqCst), 1);
        }
        assert_eq!(inhibitor.held.load(Ordering::SeqCst), 0);
    }
}
