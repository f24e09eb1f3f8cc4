//! Error types for the panel driver.

/// Transport-level failures while talking to the panel or its companion chip.
///
/// A bus error aborts whatever command sequence was in flight. Commands that
/// were already transmitted stay applied; there is no rollback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The transport refused or failed to deliver a command.
    #[error("Transport rejected command {opcode:#04x}")]
    Rejected {
        /// Opcode of the command that failed.
        opcode: u8,
    },

    /// The SPI peripheral reported a fault while shifting a command out.
    #[error("SPI fault on command {opcode:#04x}: {kind:?}")]
    Spi {
        /// Opcode of the command that failed.
        opcode: u8,
        /// Fault category reported by the SPI device.
        kind: embedded_hal::spi::ErrorKind,
    },

    /// The companion chip side channel failed.
    #[error("Companion write to register {register:#04x} failed: {kind:?}")]
    Companion {
        /// Companion chip register that was being written.
        register: u8,
        /// Fault category reported by the I2C bus.
        kind: embedded_hal::i2c::ErrorKind,
    },
}

/// Errors returned by the panel lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The power-up init sequence did not complete.
    #[error("Panel init sequence failed: {0}")]
    InitFailure(#[source] BusError),

    /// A bus transfer failed partway through a sequence.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

impl DriverError {
    /// The underlying bus error, whichever step it came from.
    pub fn bus_error(&self) -> &BusError {
        match self {
            Self::InitFailure(e) | Self::Bus(e) => e,
        }
    }
}
