//! Panel sub-variant detection.
//!
//! The board supplies a raw panel id. Every Sony s6d16a0x21 board packs its
//! panel options into the low bits of that id, except the SAG board, which
//! uses a dedicated id with the options in the generic board-id fields.

use crate::brightness::{
    COMPANION_BOUNDS, COMPANION_DEFAULT_BRIGHTNESS, PwmBounds, SERIAL_BOUNDS,
    SERIAL_DEFAULT_BRIGHTNESS,
};
use crate::command::{
    Command, CommandTable, GAMMA_INIT_TABLE, GAMMA_UPDATE_TABLE, PIXEL_FORMAT_RGB565,
    PIXEL_FORMAT_RGB666, SAG_GAMMA_UPDATE_TABLE,
};
use log::warn;

/// Bit 0: the panel is a Sony panel.
pub const SONY_PANEL: u32 = 0x1;
/// Bit 1: PWM is written over the panel bus, otherwise by the companion chip.
pub const SONY_PWM_SPI: u32 = 0x2;
/// Bit 2: the panel carries its own gamma table in NVM.
pub const SONY_GAMMA: u32 = 0x4;
/// Bit 3: 18-bit interface, otherwise 16-bit.
pub const SONY_RGB666: u32 = 0x8;

/// Backlight control field of a board panel id.
pub const BL_SHIFT: u32 = 8;
/// Mask for the backlight control field.
pub const BL_MASK: u32 = 0x3 << BL_SHIFT;
/// Backlight PWM written over the panel's serial bus.
pub const BL_SPI: u32 = 0x0 << BL_SHIFT;
/// Backlight PWM driven by the companion microcontroller.
pub const BL_MICROP: u32 = 0x1 << BL_SHIFT;

/// Host interface field of a board panel id.
pub const IF_SHIFT: u32 = 10;
/// RGB parallel interface driven by the LCDC block.
pub const IF_LCDC: u32 = 0x1 << IF_SHIFT;

/// Colour depth field of a board panel id.
pub const DEPTH_SHIFT: u32 = 12;
/// Mask for the colour depth field.
pub const DEPTH_MASK: u32 = 0x3 << DEPTH_SHIFT;
/// 16-bit colour.
pub const DEPTH_RGB565: u32 = 0x0 << DEPTH_SHIFT;
/// 18-bit colour.
pub const DEPTH_RGB666: u32 = 0x1 << DEPTH_SHIFT;

/// Board id of the SAG Sony panel.
pub const PANEL_ID_SAG_SONY: u32 = 0x13 | BL_SPI | IF_LCDC | DEPTH_RGB666;

/// Which physical panel SKU was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSku {
    /// Sony panel described by the option bits.
    Sony,
    /// SAG board Sony panel with its own PWM frequency.
    SagSony,
    /// Id without the Sony bit; options still read from the bits.
    Unrecognized,
}

/// How the backlight PWM reaches the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// PWM written over the panel's own serial bus.
    DirectSerial,
    /// PWM driven by the companion microcontroller.
    Companion,
}

/// Interface colour depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// 16-bit RGB565.
    Rgb565,
    /// 18-bit RGB666.
    Rgb666,
}

impl ColorDepth {
    /// Bits per pixel on the interface.
    pub fn bits_per_pixel(self) -> u8 {
        match self {
            Self::Rgb565 => 16,
            Self::Rgb666 => 18,
        }
    }
}

/// Resolved panel variant. Fixed for the life of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelVariant {
    /// Detected SKU.
    pub sku: PanelSku,
    /// The id the variant was resolved from.
    pub raw_id: u32,
    /// Backlight PWM path.
    pub bus_mode: BusMode,
    /// Interface colour depth.
    pub color_depth: ColorDepth,
    /// Whether the gamma table is already in the panel's NVM.
    pub has_factory_gamma: bool,
}

impl PanelVariant {
    /// Pixel format command matching the colour depth.
    pub fn pixel_format_command(&self) -> Command {
        match self.color_depth {
            ColorDepth::Rgb565 => PIXEL_FORMAT_RGB565,
            ColorDepth::Rgb666 => PIXEL_FORMAT_RGB666,
        }
    }

    /// Gamma/power table to load after display on, if the panel needs one.
    pub fn init_command_table(&self) -> Option<&'static CommandTable> {
        if self.has_factory_gamma {
            None
        } else {
            Some(&GAMMA_INIT_TABLE)
        }
    }

    /// Table sent after every serial brightness write.
    pub fn gamma_update_table(&self) -> &'static CommandTable {
        match self.sku {
            PanelSku::SagSony => &SAG_GAMMA_UPDATE_TABLE,
            PanelSku::Sony | PanelSku::Unrecognized => &GAMMA_UPDATE_TABLE,
        }
    }

    /// Brightness curve for this variant's PWM path.
    pub fn pwm_bounds(&self) -> PwmBounds {
        match self.bus_mode {
            BusMode::DirectSerial => SERIAL_BOUNDS,
            BusMode::Companion => COMPANION_BOUNDS,
        }
    }

    /// Brightness applied on the first unblank before anyone sets one.
    pub fn default_brightness(&self) -> u8 {
        match self.bus_mode {
            BusMode::DirectSerial => SERIAL_DEFAULT_BRIGHTNESS,
            BusMode::Companion => COMPANION_DEFAULT_BRIGHTNESS,
        }
    }
}

/// Decode the backlight and depth fields of a generic board id.
///
/// Reserved field values fall back to the companion path and 16-bit colour.
fn board_fields(raw_id: u32) -> (BusMode, ColorDepth) {
    let bus_mode = match raw_id & BL_MASK {
        BL_SPI => BusMode::DirectSerial,
        BL_MICROP => BusMode::Companion,
        field => {
            warn!("reserved backlight field {:#x} in panel id {:#x}", field, raw_id);
            BusMode::Companion
        }
    };
    let color_depth = match raw_id & DEPTH_MASK {
        DEPTH_RGB565 => ColorDepth::Rgb565,
        DEPTH_RGB666 => ColorDepth::Rgb666,
        field => {
            warn!("reserved depth field {:#x} in panel id {:#x}", field, raw_id);
            ColorDepth::Rgb565
        }
    };
    (bus_mode, color_depth)
}

/// Resolve the panel variant from the board's raw panel id.
///
/// Unknown ids are not an error: they fall through to the option bits, which
/// selects the companion-chip path when the SPI bit is clear.
pub fn resolve_variant(raw_id: u32) -> PanelVariant {
    if raw_id == PANEL_ID_SAG_SONY {
        let (bus_mode, color_depth) = board_fields(raw_id);
        return PanelVariant {
            sku: PanelSku::SagSony,
            raw_id,
            bus_mode,
            color_depth,
            has_factory_gamma: true,
        };
    }

    let sku = if raw_id & SONY_PANEL != 0 {
        PanelSku::Sony
    } else {
        warn!(
            "unrecognized panel id {:#x}, using option bits unvalidated",
            raw_id
        );
        PanelSku::Unrecognized
    };

    PanelVariant {
        sku,
        raw_id,
        bus_mode: if raw_id & SONY_PWM_SPI != 0 {
            BusMode::DirectSerial
        } else {
            BusMode::Companion
        },
        color_depth: if raw_id & SONY_RGB666 != 0 {
            ColorDepth::Rgb666
        } else {
            ColorDepth::Rgb565
        },
        has_factory_gamma: raw_id & SONY_GAMMA != 0,
    }
}
