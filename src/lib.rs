//! Driver for the Sony s6d16a0x21 WVGA LCD panel.
//!
//! This crate sequences the panel through power-up, initialization,
//! blank/unblank and brightness changes. The display pipeline calls
//! [`DisplayPanel::unblank`] and [`DisplayPanel::blank`]; backlight callers
//! call [`DisplayPanel::set_brightness`]. Every operation runs under one lock,
//! so the two never interleave their bus traffic.
//!
//! # Hardware
//!
//! The panel is driven through four injected collaborators:
//!
//! - a [`PanelBus`] carrying controller commands (see [`Spi9BitBus`])
//! - a [`CompanionChannel`] to the microcontroller that owns the backlight
//!   PWM on some boards (see [`I2cCompanion`])
//! - a [`PowerRail`] (see [`GpioPowerRail`])
//! - an [`IdleInhibitor`] that keeps the platform awake during sequences
//!
//! plus an [`embedded_hal::delay::DelayNs`] for datasheet settle times.
//!
//! # Example
//!
//! ```
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal::spi::SpiDevice;
//! use wvga_panel::{
//!     DisplayPanel, DriverError, GpioPowerRail, NoCompanion, NoIdleInhibit, PanelController,
//!     SONY_PANEL, SONY_PWM_SPI, Spi9BitBus, StdDelay,
//! };
//!
//! fn bring_up<SPI, PIN>(spi: SPI, power_pin: PIN) -> Result<(), DriverError>
//! where
//!     SPI: SpiDevice<u16> + Send,
//!     PIN: OutputPin + Send,
//! {
//!     let panel = PanelController::new(
//!         SONY_PANEL | SONY_PWM_SPI,
//!         Spi9BitBus::new(spi),
//!         NoCompanion,
//!         GpioPowerRail::new(power_pin),
//!         StdDelay,
//!         NoIdleInhibit,
//!     );
//!
//!     panel.unblank()?;
//!     panel.set_brightness(180);
//!     panel.blank()?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockHardware`] to test code without a panel:
//!
//! ```
//! use wvga_panel::{DisplayPanel, MockHardware, SONY_PANEL};
//!
//! let hw = MockHardware::new();
//! let panel = hw.controller(SONY_PANEL);
//! panel.unblank().unwrap();
//! assert!(panel.get_state().is_unblanked());
//! ```

#![warn(missing_docs)]

pub mod brightness;
pub mod command;
mod controller;
mod error;
mod hal;
mod info;
mod mock;
mod sequencer;
mod state;
pub mod variant;

// Re-export public API
pub use brightness::{
    COMPANION_BOUNDS, COMPANION_DEFAULT_BRIGHTNESS, PwmBounds, SERIAL_BOUNDS,
    SERIAL_DEFAULT_BRIGHTNESS,
};
pub use command::{Command, CommandTable, Opcode};
pub use controller::{DisplayPanel, PanelController};
pub use error::{BusError, DriverError};
pub use hal::{
    CompanionChannel, GpioPowerRail, I2cCompanion, IdleGuard, IdleInhibitor, NoCompanion,
    NoIdleInhibit, PanelBus, PowerRail, Spi9BitBus, StdDelay,
};
pub use info::{
    BACKLIGHT_NAME, MAX_BRIGHTNESS, PANEL_IDENTITY, PANEL_INFO, PanelIdentity, PanelInfo,
    SyncTiming,
};
pub use mock::{
    HwEvent, MockBus, MockCompanion, MockDelay, MockHardware, MockIdle, MockPanel, MockPowerRail,
};
pub use sequencer::BusSequencer;
pub use state::{LifecycleState, PanelState};
pub use variant::{
    BusMode, ColorDepth, PANEL_ID_SAG_SONY, PanelSku, PanelVariant, SONY_GAMMA, SONY_PANEL,
    SONY_PWM_SPI, SONY_RGB666, resolve_variant,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_panel_blank_unblank_cycle() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_GAMMA);

        assert_eq!(panel.get_state().lifecycle, LifecycleState::Off);

        panel.unblank().unwrap();
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Unblanked);

        panel.blank().unwrap();
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Blanked);

        panel.unblank().unwrap();
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Unblanked);
    }

    #[test]
    fn test_panel_usable_as_trait_object() {
        let hw = MockHardware::new();
        let panel: Box<dyn DisplayPanel> = Box::new(hw.controller(SONY_PANEL));

        panel.set_brightness(40);
        panel.unblank().unwrap();

        let state = panel.get_state();
        assert_eq!(state.brightness, 40);
        assert_eq!(state.last_pwm_level, Some(brightness::map(40, COMPANION_BOUNDS)));
    }

    #[test]
    fn test_backlight_class_constants() {
        assert_eq!(BACKLIGHT_NAME, "lcd-backlight");
        assert_eq!(MAX_BRIGHTNESS, PANEL_INFO.bl_max);
    }
}
