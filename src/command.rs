//! Panel controller command records and the static command tables.

/// Largest parameter block any s6d16a0x21 command carries.
pub const MAX_PARAMS: usize = 46;

/// Command opcodes understood by the s6d16a0x21 controller.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Enter sleep mode.
    SleepIn = 0x10,
    /// Leave sleep mode; also resets the controller's register state.
    SleepOut = 0x11,
    /// Stop scanning out the frame memory.
    DisplayOff = 0x28,
    /// Start scanning out the frame memory.
    DisplayOn = 0x29,
    /// Interface pixel format (16 or 18 bit).
    PixelFormat = 0x3A,
    /// Display brightness, one byte PWM duty.
    WriteBrightness = 0x51,
    /// Brightness control block enable.
    WriteCtrlDisplay = 0x53,
    /// PWM frequency / polarity.
    PwmControl = 0xC2,
    /// MTP access key.
    MtpKey = 0xD0,
    /// Return to command level 1.
    LevelOneKey = 0xF0,
    /// Unlock command level 2.
    LevelTwoKey = 0xF1,
    /// Power control.
    PowerControl = 0xF3,
    /// VCOM control.
    VcomControl = 0xF4,
    /// Positive gamma curve.
    PositiveGamma = 0xFA,
    /// Negative gamma curve.
    NegativeGamma = 0xFB,
}

impl Opcode {
    /// The wire byte for this opcode.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A single controller command: opcode plus up to [`MAX_PARAMS`] parameter bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Command {
    opcode: u8,
    len: u8,
    params: [u8; MAX_PARAMS],
}

impl Command {
    /// Build a command from an opcode and its parameter bytes.
    ///
    /// # Panics
    /// If `params` is longer than [`MAX_PARAMS`]. In a `const` table this is
    /// reported at compile time.
    pub const fn new(opcode: u8, params: &[u8]) -> Self {
        assert!(params.len() <= MAX_PARAMS, "command parameter block too long");

        let mut buf = [0u8; MAX_PARAMS];
        let mut i = 0;
        while i < params.len() {
            buf[i] = params[i];
            i += 1;
        }

        Self {
            opcode,
            len: params.len() as u8,
            params: buf,
        }
    }

    /// A command without parameters.
    pub const fn bare(opcode: Opcode) -> Self {
        Self::new(opcode.code(), &[])
    }

    /// Opcode byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Parameter bytes in transmission order.
    pub fn params(&self) -> &[u8] {
        &self.params[..self.len as usize]
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Command({:#04x}, {:02x?})", self.opcode, self.params())
    }
}

/// Build a [`Command`] from an opcode byte and parameters.
pub fn encode(opcode: u8, params: &[u8]) -> Command {
    Command::new(opcode, params)
}

/// Ordered sequence of commands. Transmission order is table order.
pub type CommandTable = [Command];

// =============================================================================
// Fixed commands
// =============================================================================

/// Leave sleep / soft reset, first command after power-up.
pub const SLEEP_OUT: Command = Command::bare(Opcode::SleepOut);

/// Pixel format for 16-bit RGB565 panels.
pub const PIXEL_FORMAT_RGB565: Command = Command::new(Opcode::PixelFormat.code(), &[0x05]);

/// Pixel format for 18-bit RGB666 panels.
pub const PIXEL_FORMAT_RGB666: Command = Command::new(Opcode::PixelFormat.code(), &[0x06]);

/// Display on.
pub const DISPLAY_ON: Command = Command::bare(Opcode::DisplayOn);

/// Display off.
pub const DISPLAY_OFF: Command = Command::bare(Opcode::DisplayOff);

/// Enter sleep.
pub const SLEEP_IN: Command = Command::bare(Opcode::SleepIn);

/// Brightness write carrying a shrunk PWM level.
pub fn write_brightness(pwm_level: u8) -> Command {
    Command::new(Opcode::WriteBrightness.code(), &[pwm_level])
}

// =============================================================================
// Tables
// =============================================================================

/// Gamma and power setup for panels without a gamma table in NVM.
///
/// Calibrated for (Wx, Wy) = (0.306, 0.315), gamma 2.2.
pub static GAMMA_INIT_TABLE: [Command; 6] = [
    Command::new(Opcode::LevelTwoKey.code(), &[0x5A, 0x5A]),
    Command::new(
        Opcode::PositiveGamma.code(),
        &[
            0x32, 0x3F, 0x3F, 0x29, 0x3E, 0x3C, 0x3D, 0x2C, 0x27, 0x3D, 0x2E, 0x31, 0x3A, 0x34,
            0x36, 0x1A, 0x3F, 0x3F, 0x2E, 0x40, 0x3C, 0x3C, 0x2B, 0x25, 0x39, 0x25, 0x23, 0x2A,
            0x20, 0x22, 0x00, 0x3F, 0x3F, 0x2F, 0x3E, 0x3C, 0x3C, 0x2A, 0x23, 0x35, 0x1E, 0x18,
            0x1C, 0x0C, 0x0E,
        ],
    ),
    Command::new(
        Opcode::NegativeGamma.code(),
        &[
            0x00, 0x0D, 0x09, 0x0C, 0x26, 0x2E, 0x31, 0x22, 0x19, 0x33, 0x22, 0x23, 0x21, 0x17,
            0x00, 0x00, 0x25, 0x1D, 0x1F, 0x35, 0x3C, 0x3A, 0x26, 0x1B, 0x34, 0x23, 0x23, 0x1F,
            0x12, 0x00, 0x00, 0x3F, 0x31, 0x33, 0x43, 0x48, 0x41, 0x2A, 0x1D, 0x35, 0x23, 0x23,
            0x21, 0x10, 0x00,
        ],
    ),
    Command::new(
        Opcode::PowerControl.code(),
        &[
            0x00, 0x10, 0x25, 0x01, 0x2D, 0x2D, 0x24, 0x2D, 0x10, 0x10, 0x0A, 0x37,
        ],
    ),
    Command::new(
        Opcode::VcomControl.code(),
        &[0x88, 0x20, 0x00, 0xAF, 0x64, 0x00, 0xAA, 0x64, 0x00, 0x00],
    ),
    Command::new(Opcode::LevelOneKey.code(), &[0x5A, 0x5A]),
];

/// Gamma update sequence following a brightness write.
pub static GAMMA_UPDATE_TABLE: [Command; 5] = gamma_update_table(0x53);

/// Gamma update sequence for the SAG board, PWM moved to 13 kHz.
pub static SAG_GAMMA_UPDATE_TABLE: [Command; 5] = gamma_update_table(0x36);

const fn gamma_update_table(pwm_divider: u8) -> [Command; 5] {
    [
        Command::new(Opcode::WriteCtrlDisplay.code(), &[0x24]),
        Command::new(Opcode::LevelOneKey.code(), &[0x5A, 0x5A]),
        Command::new(Opcode::LevelTwoKey.code(), &[0x5A, 0x5A]),
        Command::new(Opcode::MtpKey.code(), &[0x5A, 0x5A]),
        Command::new(Opcode::PwmControl.code(), &[pwm_divider, 0x12]),
    ]
}
