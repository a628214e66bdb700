//! Example: Bind the touchscreen and walk it through its lifecycle.
//!
//! Run with: `RUST_LOG=debug cargo run --example panel_lifecycle`

use rpi_touchscreen_panel::{
    BacklightDevice, BridgeDevice, DeviceRegistry, MockDisplayHost, ModeList, Panel, PanelError,
    PanelFuncs, RPI_TOUCHSCREEN, TouchscreenBacklightOps, lock_backlight,
};

fn main() -> Result<(), PanelError> {
    env_logger::init();

    let mut bus = DeviceRegistry::new();
    bus.link(RPI_TOUCHSCREEN.bridge_reference, "attiny88");
    let mut host = MockDisplayHost::new();

    // Probe before the bridge driver has registered its device
    match Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host) {
        Ok(panel) => println!("First probe unexpectedly bound {}", panel.descriptor().name),
        Err(e) => println!("First probe: {}", e),
    }

    bus.register(BridgeDevice::new("attiny88", 0x45));
    let mut panel = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host)?;
    panel.attach_backlight(BacklightDevice::register(
        RPI_TOUCHSCREEN.backlight_name,
        Box::new(TouchscreenBacklightOps),
    ));

    let mut modes = ModeList::new();
    let count = panel.get_modes(&mut modes);
    println!("{} mode(s), {:?}", count, modes.display_info());
    for mode in modes.modes() {
        println!("  {}", mode);
    }

    panel.prepare();
    panel.enable();
    if let Some(bl) = panel.backlight() {
        println!("Backlight on: {}", lock_backlight(bl).effective_brightness());
    }

    panel.disable();
    panel.unprepare();
    println!("State after shutdown sequence: {:?}", panel.state());

    panel.remove(&mut host).map_err(|(_, e)| e)
}
