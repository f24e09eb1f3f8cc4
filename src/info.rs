//! Static panel description: identity string and LCDC timing.

use std::fmt;

/// Vendor, controller and size of the panel, as shown to diagnostic tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelIdentity {
    /// Panel vendor.
    pub vendor: &'static str,
    /// Controller model.
    pub model: &'static str,
    /// Resolution class.
    pub size: &'static str,
}

/// The only panel this crate drives.
pub const PANEL_IDENTITY: PanelIdentity = PanelIdentity {
    vendor: "sony",
    model: "s6d16a0x21",
    size: "wvga",
};

impl fmt::Display for PanelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.vendor, self.model, self.size)
    }
}

/// Name the backlight is registered under.
pub const BACKLIGHT_NAME: &str = "lcd-backlight";

/// Largest brightness a backlight caller may request.
pub const MAX_BRIGHTNESS: u8 = 255;

/// Sync timings in pixel clocks (horizontal) or lines (vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Back porch.
    pub back_porch: u16,
    /// Front porch.
    pub front_porch: u16,
    /// Sync pulse width.
    pub pulse_width: u16,
}

/// What the display pipeline needs to scan out to this panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelInfo {
    /// Horizontal resolution.
    pub xres: u16,
    /// Vertical resolution.
    pub yres: u16,
    /// Bits per pixel on the LCDC bus.
    pub bpp: u8,
    /// Number of framebuffers the pipeline allocates.
    pub fb_num: u8,
    /// Pixel clock in Hz.
    pub clk_rate: u32,
    /// Lowest backlight level the pipeline may request.
    pub bl_min: u8,
    /// Highest backlight level the pipeline may request.
    pub bl_max: u8,
    /// Horizontal sync timing.
    pub hsync: SyncTiming,
    /// Vertical sync timing.
    pub vsync: SyncTiming,
    /// Border colour.
    pub border_clr: u32,
    /// Colour shown on FIFO underflow.
    pub underflow_clr: u32,
    /// HSYNC skew.
    pub hsync_skew: u32,
}

/// LCDC parameters for the 480x800 panel.
pub const PANEL_INFO: PanelInfo = PanelInfo {
    xres: 480,
    yres: 800,
    bpp: 18,
    fb_num: 2,
    clk_rate: 24_576_000,
    bl_min: 1,
    bl_max: MAX_BRIGHTNESS,
    hsync: SyncTiming {
        back_porch: 18,
        front_porch: 20,
        pulse_width: 2,
    },
    vsync: SyncTiming {
        back_porch: 5,
        front_porch: 4,
        pulse_width: 2,
    },
    border_clr: 0,
    underflow_clr: 0xff,
    hsync_skew: 0,
};

impl PanelInfo {
    /// Refresh rate in millihertz implied by the timing above.
    pub fn refresh_millihz(&self) -> u32 {
        let htotal = u64::from(self.xres)
            + u64::from(self.hsync.back_porch)
            + u64::from(self.hsync.front_porch)
            + u64::from(self.hsync.pulse_width);
        let vtotal = u64::from(self.yres)
            + u64::from(self.vsync.back_porch)
            + u64::from(self.vsync.front_porch)
            + u64::from(self.vsync.pulse_width);
        (u64::from(self.clk_rate) * 1000 / (htotal * vtotal)) as u32
    }
}
