//! Example: run a panel through unblank, brightness and blank on mock hardware.
//!
//! Run with: `cargo run --example panel_cycle -- 0x7`

use wvga_panel::{DisplayPanel, DriverError, HwEvent, MockHardware, SONY_PANEL, SONY_PWM_SPI};

fn parse_id(arg: &str) -> Option<u32> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => arg.parse().ok(),
    }
}

fn main() -> Result<(), DriverError> {
    // Initialize logging (optional)
    env_logger::init();

    let raw_id = match std::env::args().nth(1) {
        Some(arg) => parse_id(&arg).unwrap_or_else(|| {
            eprintln!("invalid panel id {arg:?}, using the serial default");
            SONY_PANEL | SONY_PWM_SPI
        }),
        None => SONY_PANEL | SONY_PWM_SPI,
    };

    let hw = MockHardware::new();
    let panel = hw.controller(raw_id);
    println!("Panel: {} (id {:#x})", panel.identity(), raw_id);
    println!("Variant: {:?}", panel.variant());
    let info = panel.panel_info();
    let refresh = info.refresh_millihz();
    println!(
        "Mode: {}x{} @ {}.{:03} Hz, {} bpp interface",
        info.xres,
        info.yres,
        refresh / 1000,
        refresh % 1000,
        panel.variant().color_depth.bits_per_pixel()
    );

    panel.set_brightness(200);
    panel.unblank()?;
    panel.set_brightness(60);
    panel.blank()?;
    panel.unblank()?;

    let state = panel.get_state();
    println!(
        "State: {:?}, brightness={}, pwm={:?}",
        state.lifecycle, state.brightness, state.last_pwm_level
    );

    println!("Hardware log:");
    for event in hw.events() {
        match event {
            HwEvent::Command { opcode, params } => println!("  tx {opcode:#04x} {params:02x?}"),
            HwEvent::Companion { register, payload } => {
                println!("  companion {register:#04x} {payload:02x?}")
            }
            HwEvent::Power(on) => println!("  power {}", if on { "on" } else { "off" }),
            HwEvent::Delay(d) => println!("  wait {} ms", d.as_millis()),
            HwEvent::IdleAcquire | HwEvent::IdleRelease => {}
        }
    }

    Ok(())
}
