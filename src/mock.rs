//! Mock panel hardware for testing.

use crate::controller::PanelController;
use crate::error::BusError;
use crate::hal::{CompanionChannel, IdleInhibitor, PanelBus, PowerRail};
use embedded_hal::delay::DelayNs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something the driver did to the hardware, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwEvent {
    /// A command went out on the panel bus.
    Command {
        /// Opcode byte.
        opcode: u8,
        /// Parameter bytes.
        params: Vec<u8>,
    },
    /// A write to the companion chip.
    Companion {
        /// Register written.
        register: u8,
        /// Payload written.
        payload: [u8; 4],
    },
    /// The power rail was switched.
    Power(bool),
    /// A settle delay.
    Delay(Duration),
    /// Idle entry was blocked.
    IdleAcquire,
    /// Idle entry was allowed again.
    IdleRelease,
}

#[derive(Default)]
struct Shared {
    events: Vec<HwEvent>,
    attempts: usize,
    fail_at: Option<usize>,
    fail_companion: bool,
    idle_depth: usize,
}

/// A set of mock collaborators recording into one shared event log.
///
/// This allows testing the panel controller without a panel attached.
///
/// # Example
///
/// ```
/// use wvga_panel::{DisplayPanel, MockHardware, SONY_PANEL};
///
/// let hw = MockHardware::new();
/// let panel = hw.controller(SONY_PANEL);
/// panel.unblank().unwrap();
/// assert_eq!(hw.sent_commands()[0].0, 0x11);
/// ```
#[derive(Clone, Default)]
pub struct MockHardware {
    shared: Arc<Mutex<Shared>>,
}

/// Panel controller wired to mock hardware.
pub type MockPanel = PanelController<MockBus, MockCompanion, MockPowerRail, MockDelay, MockIdle>;

impl MockHardware {
    /// Create an empty mock hardware set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a controller for `raw_id` wired to this hardware.
    pub fn controller(&self, raw_id: u32) -> MockPanel {
        PanelController::new(
            raw_id,
            self.bus(),
            self.companion(),
            self.power(),
            self.delay(),
            self.idle(),
        )
    }

    /// Panel bus handle.
    pub fn bus(&self) -> MockBus {
        MockBus {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Companion chip handle.
    pub fn companion(&self) -> MockCompanion {
        MockCompanion {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Power rail handle.
    pub fn power(&self) -> MockPowerRail {
        MockPowerRail {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Delay handle. Records delays instead of sleeping.
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Idle inhibitor handle.
    pub fn idle(&self) -> MockIdle {
        MockIdle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Fail the `index`-th bus command attempt (0-based, counted from now
    /// across all sequences). The failure fires once.
    pub fn fail_command_at(&self, index: usize) {
        let mut shared = self.shared.lock().unwrap();
        shared.fail_at = Some(shared.attempts + index);
    }

    /// Make every companion write fail until cleared.
    pub fn set_companion_failure(&self, fail: bool) {
        self.shared.lock().unwrap().fail_companion = fail;
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<HwEvent> {
        self.shared.lock().unwrap().events.clone()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.shared.lock().unwrap().events.clear();
    }

    /// Bus commands sent so far as `(opcode, params)`.
    pub fn sent_commands(&self) -> Vec<(u8, Vec<u8>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HwEvent::Command { opcode, params } => Some((opcode, params)),
                _ => None,
            })
            .collect()
    }

    /// Companion writes so far.
    pub fn companion_writes(&self) -> Vec<(u8, [u8; 4])> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HwEvent::Companion { register, payload } => Some((register, payload)),
                _ => None,
            })
            .collect()
    }

    /// Whether the idle inhibitor is currently held.
    pub fn idle_held(&self) -> bool {
        self.shared.lock().unwrap().idle_depth > 0
    }
}

/// Mock panel bus.
pub struct MockBus {
    shared: Arc<Mutex<Shared>>,
}

impl PanelBus for MockBus {
    fn send(&mut self, opcode: u8, params: &[u8]) -> Result<(), BusError> {
        let mut shared = self.shared.lock().unwrap();
        let attempt = shared.attempts;
        shared.attempts += 1;
        if shared.fail_at == Some(attempt) {
            shared.fail_at = None;
            return Err(BusError::Rejected { opcode });
        }
        shared.events.push(HwEvent::Command {
            opcode,
            params: params.to_vec(),
        });
        Ok(())
    }
}

/// Mock companion chip.
pub struct MockCompanion {
    shared: Arc<Mutex<Shared>>,
}

impl CompanionChannel for MockCompanion {
    fn write(&mut self, register: u8, payload: [u8; 4]) -> Result<(), BusError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.fail_companion {
            return Err(BusError::Companion {
                register,
                kind: embedded_hal::i2c::ErrorKind::Other,
            });
        }
        shared.events.push(HwEvent::Companion { register, payload });
        Ok(())
    }
}

/// Mock power rail.
pub struct MockPowerRail {
    shared: Arc<Mutex<Shared>>,
}

impl PowerRail for MockPowerRail {
    fn set_power(&mut self, on: bool) {
        self.shared.lock().unwrap().events.push(HwEvent::Power(on));
    }
}

/// Mock delay that records instead of sleeping.
pub struct MockDelay {
    shared: Arc<Mutex<Shared>>,
}

impl MockDelay {
    fn record(&mut self, duration: Duration) {
        self.shared
            .lock()
            .unwrap()
            .events
            .push(HwEvent::Delay(duration));
        // Give other threads a chance to run mid-sequence.
        std::thread::yield_now();
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(Duration::from_millis(u64::from(ms)));
    }
}

/// Mock idle inhibitor.
pub struct MockIdle {
    shared: Arc<Mutex<Shared>>,
}

impl IdleInhibitor for MockIdle {
    fn acquire(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.idle_depth += 1;
        shared.events.push(HwEvent::IdleAcquire);
    }

    fn release(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.idle_depth = shared.idle_depth.saturating_sub(1);
        shared.events.push(HwEvent::IdleRelease);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_fires_once() {
        let hw = MockHardware::new();
        let mut bus = hw.bus();
        hw.fail_command_at(1);

        assert!(bus.send(0x11, &[]).is_ok());
        assert_eq!(
            bus.send(0x3A, &[0x05]),
            Err(BusError::Rejected { opcode: 0x3A })
        );
        assert!(bus.send(0x3A, &[0x05]).is_ok());
        assert_eq!(hw.sent_commands().len(), 2);
    }

    #[test]
    fn test_idle_depth_tracks_pairs() {
        let hw = MockHardware::new();
        let idle = hw.idle();

        idle.acquire();
        assert!(hw.idle_held());
        idle.release();
        assert!(!hw.idle_held());
        assert_eq!(hw.events(), vec![HwEvent::IdleAcquire, HwEvent::IdleRelease]);
    }
}
