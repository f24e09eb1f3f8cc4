//! Panel lifecycle controller.

use crate::brightness;
use crate::command::{DISPLAY_OFF, DISPLAY_ON, SLEEP_IN, SLEEP_OUT, write_brightness};
use crate::error::{BusError, DriverError};
use crate::hal::{CompanionChannel, IdleGuard, IdleInhibitor, PanelBus, PowerRail};
use crate::info::{PANEL_IDENTITY, PANEL_INFO, PanelIdentity, PanelInfo};
use crate::sequencer::BusSequencer;
use crate::state::{LifecycleState, PanelState};
use crate::variant::{BusMode, PanelVariant, resolve_variant};

use embedded_hal::delay::DelayNs;
use log::{debug, error, info};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Rail on to first command.
const POWER_SETTLE: Duration = Duration::from_millis(100);
/// Sleep out to pixel format.
const SLEEP_OUT_SETTLE: Duration = Duration::from_millis(5);
/// Init done to display on.
const UNBLANK_SETTLE: Duration = Duration::from_millis(100);
/// Display on to gamma traffic.
const DISPLAY_ON_SETTLE: Duration = Duration::from_millis(20);
/// Sleep in to rail off.
const BLANK_SETTLE: Duration = Duration::from_millis(40);

/// Companion chip register holding the backlight PWM block.
const COMPANION_BACKLIGHT_REG: u8 = 0x25;
/// Backlight select tag, first payload byte.
const COMPANION_BACKLIGHT_SELECT: u8 = 0x05;
/// Enable flag, last payload byte.
const COMPANION_BACKLIGHT_ENABLE: u8 = 0x01;

// =============================================================================
// Display Panel Trait
// =============================================================================

/// Trait for panel implementations driven by the display pipeline and the
/// backlight class.
///
/// This allows for mock implementations in tests.
pub trait DisplayPanel: Send + Sync {
    /// Get a snapshot of the current panel state.
    fn get_state(&self) -> PanelState;

    /// Power the panel up and start displaying content.
    ///
    /// Always runs the full power-up path, whatever state the panel is in.
    fn unblank(&self) -> Result<(), DriverError>;

    /// Stop displaying, put the panel to sleep and release the power rail.
    fn blank(&self) -> Result<(), DriverError>;

    /// Request a brightness on the user scale (0-255).
    ///
    /// Failures are logged, never returned.
    fn set_brightness(&self, value: u8);

    /// Like [`set_brightness`](Self::set_brightness), but reports failures.
    fn try_set_brightness(&self, value: u8) -> Result<(), DriverError>;

    /// Vendor, model and size of the panel.
    fn identity(&self) -> PanelIdentity {
        PANEL_IDENTITY
    }

    /// Geometry and LCDC timing for the display pipeline.
    fn panel_info(&self) -> PanelInfo {
        PANEL_INFO
    }
}

// =============================================================================
// PanelController
// =============================================================================

struct Inner<B, C, P, D> {
    sequencer: BusSequencer<B, D>,
    companion: C,
    power: P,
    lifecycle: LifecycleState,
    brightness: u8,
    last_pwm_level: Option<u8>,
}

impl<B: PanelBus, C: CompanionChannel, P: PowerRail, D: DelayNs> Inner<B, C, P, D> {
    fn power_on_init(&mut self, variant: &PanelVariant) -> Result<(), BusError> {
        self.power.set_power(true);
        self.lifecycle = LifecycleState::Initializing;
        self.sequencer.delay(POWER_SETTLE);

        self.sequencer.transmit_one(&SLEEP_OUT)?;
        self.sequencer.delay(SLEEP_OUT_SETTLE);
        self.sequencer.transmit_one(&variant.pixel_format_command())
    }

    fn apply_brightness(&mut self, variant: &PanelVariant, value: u8) -> Result<(), BusError> {
        let level = brightness::map(value, variant.pwm_bounds());
        debug!("brightness {} -> pwm {}", value, level);

        match variant.bus_mode {
            BusMode::Companion => {
                self.companion.write(
                    COMPANION_BACKLIGHT_REG,
                    [COMPANION_BACKLIGHT_SELECT, level, 0, COMPANION_BACKLIGHT_ENABLE],
                )?;
            }
            BusMode::DirectSerial => {
                self.sequencer.transmit_one(&write_brightness(level))?;
                self.sequencer.transmit(variant.gamma_update_table())?;
            }
        }

        self.brightness = value;
        self.last_pwm_level = Some(level);
        Ok(())
    }
}

/// Driver for one s6d16a0x21 panel.
///
/// Owns the lifecycle state machine and the last requested brightness. All
/// transitions and all hardware traffic run under a single lock, so calls
/// from the display pipeline and from backlight callers never interleave.
///
/// # Example
///
/// ```
/// use wvga_panel::{DisplayPanel, LifecycleState, MockHardware, SONY_PANEL, SONY_PWM_SPI};
///
/// let hw = MockHardware::new();
/// let panel = hw.controller(SONY_PANEL | SONY_PWM_SPI);
///
/// panel.set_brightness(200);
/// panel.unblank()?;
/// assert_eq!(panel.get_state().lifecycle, LifecycleState::Unblanked);
/// assert_eq!(panel.get_state().brightness, 200);
/// # Ok::<(), wvga_panel::DriverError>(())
/// ```
pub struct PanelController<B, C, P, D, I> {
    variant: PanelVariant,
    inner: Mutex<Inner<B, C, P, D>>,
    idle: I,
}

impl<B, C, P, D, I> PanelController<B, C, P, D, I>
where
    B: PanelBus,
    C: CompanionChannel,
    P: PowerRail,
    D: DelayNs,
    I: IdleInhibitor,
{
    /// Create a controller for the panel identified by `raw_id`.
    ///
    /// The panel starts [`Off`](LifecycleState::Off); nothing is sent until
    /// the first [`unblank`](DisplayPanel::unblank).
    pub fn new(raw_id: u32, bus: B, companion: C, power: P, delay: D, idle: I) -> Self {
        let variant = resolve_variant(raw_id);
        let refresh = PANEL_INFO.refresh_millihz();
        info!(
            "panel {} id={:#x}: {:?}, {} bpp, factory gamma: {}, {}.{:03} Hz",
            PANEL_IDENTITY,
            raw_id,
            variant.bus_mode,
            variant.color_depth.bits_per_pixel(),
            variant.has_factory_gamma,
            refresh / 1000,
            refresh % 1000
        );

        Self {
            inner: Mutex::new(Inner {
                sequencer: BusSequencer::new(bus, delay),
                companion,
                power,
                lifecycle: LifecycleState::Off,
                brightness: variant.default_brightness(),
                last_pwm_level: None,
            }),
            variant,
            idle,
        }
    }

    /// The variant resolved at construction.
    pub fn variant(&self) -> &PanelVariant {
        &self.variant
    }

    // Nothing behind the lock can be left half-updated by a panic in a
    // collaborator, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner<B, C, P, D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B, C, P, D, I> DisplayPanel for PanelController<B, C, P, D, I>
where
    B: PanelBus + Send,
    C: CompanionChannel + Send,
    P: PowerRail + Send,
    D: DelayNs + Send,
    I: IdleInhibitor,
{
    fn get_state(&self) -> PanelState {
        let inner = self.lock();
        PanelState {
            variant: self.variant,
            lifecycle: inner.lifecycle,
            brightness: inner.brightness,
            last_pwm_level: inner.last_pwm_level,
        }
    }

    fn unblank(&self) -> Result<(), DriverError> {
        let _idle = IdleGuard::hold(&self.idle);
        let mut inner = self.lock();
        info!("unblank from {:?}", inner.lifecycle);

        // The panel may still come up; carry on with the unblank steps.
        if let Err(e) = inner.power_on_init(&self.variant) {
            error!("{}", DriverError::InitFailure(e));
        }

        inner.sequencer.delay(UNBLANK_SETTLE);
        inner.sequencer.transmit_one(&DISPLAY_ON)?;
        inner.sequencer.delay(DISPLAY_ON_SETTLE);

        if let Some(table) = self.variant.init_command_table() {
            debug!("loading gamma table ({} commands)", table.len());
            inner.sequencer.transmit(table)?;
        }

        let value = inner.brightness;
        inner.apply_brightness(&self.variant, value)?;
        inner.lifecycle = LifecycleState::Unblanked;

        info!("unblanked at brightness {}", value);
        Ok(())
    }

    fn blank(&self) -> Result<(), DriverError> {
        let mut inner = self.lock();
        if matches!(inner.lifecycle, LifecycleState::Off | LifecycleState::Blanked) {
            debug!("blank: panel already powered down ({:?})", inner.lifecycle);
            return Ok(());
        }
        info!("blank from {:?}", inner.lifecycle);

        inner.sequencer.transmit_one(&DISPLAY_OFF)?;
        inner.sequencer.transmit_one(&SLEEP_IN)?;
        inner.sequencer.delay(BLANK_SETTLE);

        // Zero the backlight while the rail is still up; a failed write leaves
        // the panel powered and the state untouched.
        if self.variant.bus_mode == BusMode::Companion {
            inner.companion.write(
                COMPANION_BACKLIGHT_REG,
                [COMPANION_BACKLIGHT_SELECT, 0, 0, COMPANION_BACKLIGHT_ENABLE],
            )?;
            inner.last_pwm_level = Some(0);
        }

        inner.lifecycle = LifecycleState::Blanked;
        inner.power.set_power(false);
        Ok(())
    }

    fn set_brightness(&self, value: u8) {
        if let Err(e) = self.try_set_brightness(value) {
            error!("set brightness {} failed: {}", value, e);
        }
    }

    fn try_set_brightness(&self, value: u8) -> Result<(), DriverError> {
        let mut inner = self.lock();
        if inner.lifecycle != LifecycleState::Unblanked {
            debug!("brightness {} deferred until unblank", value);
            inner.brightness = value;
            return Ok(());
        }

        let _idle = IdleGuard::hold(&self.idle);
        // Record the request even if the write fails; the next unblank retries it.
        inner.brightness = value;
        inner.apply_brightness(&self.variant, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{HwEvent, MockHardware};
    use crate::variant::{PANEL_ID_SAG_SONY, SONY_GAMMA, SONY_PANEL, SONY_PWM_SPI, SONY_RGB666};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn opcodes(hw: &MockHardware) -> Vec<u8> {
        hw.sent_commands().iter().map(|(op, _)| *op).collect()
    }

    #[test]
    fn test_cold_unblank_serial_without_factory_gamma() {
        init_logging();
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_PWM_SPI | SONY_RGB666);

        panel.unblank().unwrap();

        assert_eq!(
            opcodes(&hw),
            vec![
                0x11, 0x3A, // init
                0x29, // display on
                0xF1, 0xFA, 0xFB, 0xF3, 0xF4, 0xF0, // gamma table
                0x51, 0x53, 0xF0, 0xF1, 0xD0, 0xC2, // brightness + gamma update
            ]
        );
        let sent = hw.sent_commands();
        assert_eq!(sent[1].1, vec![0x06]);
        // default 128 on the serial path maps below the reference point
        assert_eq!(sent[9].1, vec![brightness::map(128, brightness::SERIAL_BOUNDS)]);

        let state = panel.get_state();
        assert_eq!(state.lifecycle, LifecycleState::Unblanked);
        assert!(state.is_unblanked());
        assert!(!hw.idle_held());
    }

    #[test]
    fn test_unblank_timing() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_GAMMA);

        panel.unblank().unwrap();

        let events = hw.events();
        assert_eq!(
            &events[..9],
            &[
                HwEvent::IdleAcquire,
                HwEvent::Power(true),
                HwEvent::Delay(POWER_SETTLE),
                HwEvent::Command {
                    opcode: 0x11,
                    params: vec![]
                },
                HwEvent::Delay(SLEEP_OUT_SETTLE),
                HwEvent::Command {
                    opcode: 0x3A,
                    params: vec![0x05]
                },
                HwEvent::Delay(UNBLANK_SETTLE),
                HwEvent::Command {
                    opcode: 0x29,
                    params: vec![]
                },
                HwEvent::Delay(DISPLAY_ON_SETTLE),
            ]
        );
        // factory gamma, companion path: default 130 maps to pwm 117
        assert_eq!(
            &events[9..],
            &[
                HwEvent::Companion {
                    register: 0x25,
                    payload: [0x05, 117, 0x00, 0x01]
                },
                HwEvent::IdleRelease,
            ]
        );
    }

    #[test]
    fn test_sag_uses_its_own_gamma_update() {
        let hw = MockHardware::new();
        let panel = hw.controller(PANEL_ID_SAG_SONY);

        panel.unblank().unwrap();

        let sent = hw.sent_commands();
        assert_eq!(sent.last().unwrap(), &(0xC2, vec![0x36, 0x12]));
        // factory gamma: no level-2 gamma table after display on
        assert_eq!(sent[3].0, 0x51);
    }

    #[test]
    fn test_blank_sequence_companion() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_GAMMA);
        panel.unblank().unwrap();
        hw.clear();

        panel.blank().unwrap();

        assert_eq!(
            hw.events(),
            vec![
                HwEvent::Command {
                    opcode: 0x28,
                    params: vec![]
                },
                HwEvent::Command {
                    opcode: 0x10,
                    params: vec![]
                },
                HwEvent::Delay(BLANK_SETTLE),
                HwEvent::Companion {
                    register: 0x25,
                    payload: [0x05, 0x00, 0x00, 0x01]
                },
                HwEvent::Power(false),
            ]
        );
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Blanked);
        assert_eq!(panel.get_state().last_pwm_level, Some(0));
    }

    #[test]
    fn test_blank_companion_failure_keeps_panel_unblanked() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_GAMMA);
        panel.unblank().unwrap();
        let before = panel.get_state();
        hw.clear();
        hw.set_companion_failure(true);

        let err = panel.blank().unwrap_err();

        assert!(matches!(
            err,
            DriverError::Bus(BusError::Companion { register: 0x25, .. })
        ));
        assert!(!hw.events().contains(&HwEvent::Power(false)));
        assert_eq!(panel.get_state(), before);
        assert_eq!(before.last_pwm_level, Some(117));

        // once the side channel recovers, blank completes normally
        hw.set_companion_failure(false);
        hw.clear();
        panel.blank().unwrap();
        assert_eq!(hw.events().last(), Some(&HwEvent::Power(false)));
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Blanked);
        assert_eq!(panel.get_state().last_pwm_level, Some(0));
    }

    #[test]
    fn test_blank_serial_leaves_companion_alone() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_PWM_SPI | SONY_GAMMA);
        panel.unblank().unwrap();
        hw.clear();

        panel.blank().unwrap();

        assert_eq!(opcodes(&hw), vec![0x28, 0x10]);
        assert!(hw.companion_writes().is_empty());
    }

    #[test]
    fn test_blank_when_off_is_a_no_op() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL);

        panel.blank().unwrap();

        assert!(hw.events().is_empty());
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Off);
    }

    #[test]
    fn test_brightness_applies_immediately_when_unblanked() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_GAMMA);
        panel.unblank().unwrap();
        hw.clear();

        panel.set_brightness(86);

        assert_eq!(
            hw.events(),
            vec![
                HwEvent::IdleAcquire,
                HwEvent::Companion {
                    register: 0x25,
                    payload: [0x05, 69, 0x00, 0x01]
                },
                HwEvent::IdleRelease,
            ]
        );
        assert_eq!(panel.get_state().brightness, 86);
        assert_eq!(panel.get_state().last_pwm_level, Some(69));
    }

    #[test]
    fn test_brightness_deferred_while_off() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_PWM_SPI);

        panel.set_brightness(255);

        assert!(hw.events().is_empty());
        assert_eq!(panel.get_state().brightness, 255);
        assert_eq!(panel.get_state().last_pwm_level, None);
    }

    #[test]
    fn test_init_failure_does_not_stop_unblank() {
        init_logging();
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_GAMMA);
        hw.fail_command_at(0);

        panel.unblank().unwrap();

        // sleep out failed, pixel format skipped, display on still sent
        assert_eq!(opcodes(&hw), vec![0x29]);
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Unblanked);
    }

    #[test]
    fn test_display_on_failure_aborts_and_releases_idle() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL | SONY_PWM_SPI);
        hw.fail_command_at(2);

        let err = panel.unblank().unwrap_err();

        assert_eq!(err, DriverError::Bus(BusError::Rejected { opcode: 0x29 }));
        assert_eq!(opcodes(&hw), vec![0x11, 0x3A]);
        assert_eq!(panel.get_state().lifecycle, LifecycleState::Initializing);
        assert!(!hw.idle_held());
        assert_eq!(hw.events().last(), Some(&HwEvent::IdleRelease));
    }

    #[test]
    fn test_try_set_brightness_reports_failure() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL);
        panel.unblank().unwrap();
        hw.set_companion_failure(true);

        let err = panel.try_set_brightness(200).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Bus(BusError::Companion { register: 0x25, .. })
        ));
        // the request is kept for the next unblank
        assert_eq!(panel.get_state().brightness, 200);
        assert!(!hw.idle_held());

        // fire-and-forget variant swallows the same failure
        panel.set_brightness(10);
        assert_eq!(panel.get_state().brightness, 10);
    }

    #[test]
    fn test_identity_and_info() {
        let hw = MockHardware::new();
        let panel = hw.controller(SONY_PANEL);

        assert_eq!(panel.identity().to_string(), "sony s6d16a0x21 wvga");
        assert_eq!(panel.panel_info().xres, 480);
        assert_eq!(panel.panel_info().yres, 800);
    }
}
