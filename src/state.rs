//! Panel lifecycle state and snapshots.

use crate::variant::PanelVariant;

/// Where the panel is in its power/display lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Rail off, nothing sent since startup.
    #[default]
    Off,
    /// Rail on and init sequence sent; not yet scanning out.
    Initializing,
    /// Displaying content; brightness changes go straight to hardware.
    Unblanked,
    /// Display off, panel asleep and rail released.
    Blanked,
}

/// A snapshot of the panel controller's state.
///
/// Use [`DisplayPanel::get_state`](crate::DisplayPanel::get_state) to obtain one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelState {
    /// The variant resolved at startup.
    pub variant: PanelVariant,
    /// Current lifecycle state.
    pub lifecycle: LifecycleState,
    /// Last brightness requested on the user scale (0-255).
    pub brightness: u8,
    /// PWM level most recently sent to hardware, if any.
    pub last_pwm_level: Option<u8>,
}

impl PanelState {
    /// Whether brightness writes currently reach the hardware.
    pub fn is_unblanked(&self) -> bool {
        self.lifecycle == LifecycleState::Unblanked
    }
}
