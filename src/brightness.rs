//! User brightness to panel PWM level conversion.

/// Calibration points for the brightness curve.
///
/// The curve is two straight segments meeting at `reference`: the user scale
/// point that should produce the panel's `default` duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmBounds {
    /// PWM level at and below `user_min`.
    pub min: u8,
    /// PWM level at `reference`.
    pub default: u8,
    /// PWM level at and above `user_max`.
    pub max: u8,
    /// Lowest user value with its own PWM step.
    pub user_min: u8,
    /// Breakpoint between the two segments.
    pub reference: u8,
    /// User value that reaches full duty.
    pub user_max: u8,
}

const USER_MIN: u8 = 30;
const USER_REFERENCE: u8 = 143;
const USER_MAX: u8 = 255;

/// Bounds for brightness written over the panel's own serial bus.
pub const SERIAL_BOUNDS: PwmBounds = PwmBounds {
    min: 8,
    default: 128,
    max: 255,
    user_min: USER_MIN,
    reference: USER_REFERENCE,
    user_max: USER_MAX,
};

/// Bounds for brightness driven by the companion microcontroller.
pub const COMPANION_BOUNDS: PwmBounds = PwmBounds {
    min: 9,
    default: 132,
    max: 255,
    user_min: USER_MIN,
    reference: USER_REFERENCE,
    user_max: USER_MAX,
};

/// Lowest level the companion firmware accepts.
const COMPANION_MIN_LEVEL: u8 = 10;
/// Highest level the companion firmware accepts.
const COMPANION_MAX_LEVEL: u8 = 250;

/// Brightness the serial path starts at before anyone sets one.
pub const SERIAL_DEFAULT_BRIGHTNESS: u8 = SERIAL_BOUNDS.default;
/// Brightness the companion path starts at: midpoint of the firmware range.
pub const COMPANION_DEFAULT_BRIGHTNESS: u8 =
    COMPANION_MIN_LEVEL + (COMPANION_MAX_LEVEL - COMPANION_MIN_LEVEL) / 2;

/// Map a user brightness value onto the panel PWM scale.
///
/// Both segments compute `(upper - lower) * (value - start) / span + lower`
/// with floor division; the panel calibration depends on that rounding.
///
/// Bounds are expected to satisfy `min <= default <= max`. A segment whose
/// upper level lies below its lower level is flat at the lower level, and the
/// result never exceeds `max`.
pub fn map(user_value: u8, bounds: PwmBounds) -> u8 {
    let value = u32::from(user_value);
    let min = u32::from(bounds.min);
    let default = u32::from(bounds.default);
    let max = u32::from(bounds.max);
    let user_min = u32::from(bounds.user_min);
    let reference = u32::from(bounds.reference);
    let user_max = u32::from(bounds.user_max);

    let level = if value <= reference {
        if value <= user_min {
            min
        } else {
            default.saturating_sub(min) * (value - user_min) / (reference - user_min) + min
        }
    } else if value >= user_max {
        max
    } else {
        max.saturating_sub(default) * (value - reference) / (user_max - reference) + default
    };

    u8::try_from(level.min(max)).unwrap_or(bounds.max)
}
