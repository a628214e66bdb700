//! Lifecycle and mode configuration for the Raspberry Pi 7" touchscreen.
//!
//! The touchscreen is a DPI LCD behind a Toshiba TC358762 DSI-to-DPI bridge,
//! with an I2C-attached ATTINY88 handling power management and the backlight
//! PWM. This crate models what a display subsystem sees of it: a panel that
//! reports its timings and is walked through prepare → enable → disable →
//! unprepare.
//!
//! # Example
//!
//! ```
//! use rpi_touchscreen_panel::{
//!     BridgeDevice, DeviceRegistry, MockDisplayHost, ModeList, Panel, PanelError, PanelFuncs,
//!     RPI_TOUCHSCREEN,
//! };
//!
//! fn main() -> Result<(), PanelError> {
//!     let mut bus = DeviceRegistry::new();
//!     bus.link(RPI_TOUCHSCREEN.bridge_reference, "attiny88");
//!
//!     // The bridge driver has not come up yet
//!     let mut host = MockDisplayHost::new();
//!     let err = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap_err();
//!     assert!(matches!(err, PanelError::TemporarilyUnavailable { .. }));
//!
//!     bus.register(BridgeDevice::new("attiny88", 0x45));
//!     let mut panel = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host)?;
//!
//!     let mut modes = ModeList::new();
//!     panel.get_modes(&mut modes);
//!     assert_eq!(modes.preferred().map(|m| m.name.as_str()), Some("800x480"));
//!
//!     panel.prepare();
//!     panel.enable();
//!     panel.disable();
//!     panel.unprepare();
//!
//!     panel.remove(&mut host).map_err(|(_, e)| e)
//! }
//! ```
//!
//! # Testing
//!
//! [`MockDisplayHost`], [`MockConnector`] and [`RecordingBacklightOps`] stand
//! in for the display subsystem, the connector and the backlight hardware.

#![warn(missing_docs)]

mod backlight;
mod bridge;
mod config;
mod error;
mod mock;
mod modes;
mod panel;
mod state;

// Re-export public API
pub use backlight::{
    BacklightDevice, BacklightOps, BacklightProperties, BacklightState, BlankLevel,
    SharedBacklight, TOUCHSCREEN_MAX_BRIGHTNESS, TouchscreenBacklightOps, effective_brightness,
    lock as lock_backlight,
};
pub use bridge::{BridgeDevice, BridgeLookup, BridgeRef, DeviceRegistry, LookupError};
pub use config::{
    DsiConfig, DsiModeFlags, OF_MATCH, PanelDescriptor, PixelFormat, RPI_TOUCHSCREEN, of_match,
};
pub use error::PanelError;
pub use mock::{MockConnector, MockDisplayHost, RecordingBacklightOps, UpdateLog};
pub use modes::{
    Connector, DisplayInfo, DisplayMode, ModeList, ModeTiming, ModeType, TOUCHSCREEN_DISPLAY_INFO,
    TOUCHSCREEN_MODES,
};
pub use panel::{DisplayHost, Panel, PanelFuncs, add_modes};
pub use state::PanelState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const BRIDGE_NODE: &str = "attiny88";

    fn bus_with_bridge() -> DeviceRegistry {
        let mut bus = DeviceRegistry::new();
        bus.link(RPI_TOUCHSCREEN.bridge_reference, BRIDGE_NODE);
        bus.register(BridgeDevice::new(BRIDGE_NODE, 0x45));
        bus
    }

    fn probed_panel() -> (Panel, MockDisplayHost) {
        let mut host = MockDisplayHost::new();
        let panel = Panel::probe(&RPI_TOUCHSCREEN, &bus_with_bridge(), &mut host).unwrap();
        (panel, host)
    }

    fn recording_backlight(brightness: u32) -> (SharedBacklight, UpdateLog) {
        let (ops, log) = RecordingBacklightOps::new();
        let props = BacklightProperties {
            brightness,
            max_brightness: 255,
            ..Default::default()
        };
        let bl = Arc::new(Mutex::new(BacklightDevice::new("test-bl", props, Box::new(ops))));
        (bl, log)
    }

    fn timing(hdisplay: u16, vdisplay: u16) -> ModeTiming {
        ModeTiming {
            hdisplay,
            hsync_start: hdisplay + 10,
            hsync_end: hdisplay + 12,
            htotal: hdisplay + 40,
            vdisplay,
            vsync_start: vdisplay + 3,
            vsync_end: vdisplay + 5,
            vtotal: vdisplay + 20,
            ..TOUCHSCREEN_MODES[0]
        }
    }

    #[test]
    fn test_lifecycle_round_trip() {
        let (mut panel, _host) = probed_panel();
        assert_eq!(panel.state(), PanelState::Disabled);

        panel.prepare();
        assert_eq!(panel.state(), PanelState::Prepared);

        panel.enable();
        assert_eq!(panel.state(), PanelState::Enabled);

        panel.disable();
        assert_eq!(panel.state(), PanelState::Prepared);

        panel.unprepare();
        assert_eq!(panel.state(), PanelState::Disabled);
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let (mut panel, _host) = probed_panel();
        let (bl, log) = recording_backlight(200);
        panel.attach_backlight(bl);

        panel.prepare();
        let after_once = lock_backlight(panel.backlight().unwrap()).props;
        panel.prepare();

        assert!(panel.is_prepared());
        assert_eq!(lock_backlight(panel.backlight().unwrap()).props, after_once);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_enable_disable_toggles_backlight() {
        let (mut panel, _host) = probed_panel();
        let (bl, log) = recording_backlight(200);
        panel.attach_backlight(Arc::clone(&bl));

        panel.prepare();
        panel.enable();
        assert_eq!(lock_backlight(&bl).props.power, BlankLevel::Unblank);
        assert_eq!(lock_backlight(&bl).effective_brightness(), 200);

        // Second enable is a no-op and does not refresh again
        panel.enable();
        assert_eq!(log.lock().unwrap().len(), 1);

        panel.disable();
        assert!(!panel.is_enabled());
        assert_eq!(lock_backlight(&bl).props.power, BlankLevel::Powerdown);
        assert_eq!(lock_backlight(&bl).effective_brightness(), 0);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].power, BlankLevel::Unblank);
        assert_eq!(log[1].power, BlankLevel::Powerdown);
    }

    #[test]
    fn test_enable_without_backlight() {
        let (mut panel, _host) = probed_panel();
        assert!(panel.backlight().is_none());

        panel.prepare();
        panel.enable();
        assert!(panel.is_enabled());
    }

    #[test]
    fn test_enable_requires_prepare() {
        let (mut panel, _host) = probed_panel();
        let (bl, log) = recording_backlight(200);
        panel.attach_backlight(bl);

        panel.enable();
        assert_eq!(panel.state(), PanelState::Disabled);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unprepare_refused_while_enabled() {
        let (mut panel, _host) = probed_panel();
        panel.prepare();
        panel.enable();

        panel.unprepare();
        assert!(panel.is_prepared());
        assert!(panel.is_enabled());
    }

    #[test]
    fn test_disable_and_unprepare_when_idle_are_noops() {
        let (mut panel, _host) = probed_panel();
        let (bl, log) = recording_backlight(200);
        panel.attach_backlight(bl);

        panel.disable();
        panel.unprepare();
        assert_eq!(panel.state(), PanelState::Disabled);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_get_modes_touchscreen() {
        let (panel, _host) = probed_panel();
        let mut modes = ModeList::new();

        assert_eq!(panel.get_modes(&mut modes), 1);

        let mode = &modes.modes()[0];
        assert!(mode.is_preferred());
        assert!(mode.mode_type.contains(ModeType::DRIVER));
        assert_eq!(mode.name, "800x480");
        assert_eq!(mode.timing.clock, 83_333);
        assert_eq!(mode.timing.htotal, 907);
        assert_eq!(mode.timing.vtotal, 510);

        let info = modes.display_info();
        assert_eq!(info.width_mm, 217);
        assert_eq!(info.height_mm, 136);
        assert_eq!(info.bpc, 8);
    }

    #[test]
    fn test_get_modes_does_not_change_state() {
        let (mut panel, _host) = probed_panel();
        panel.prepare();
        panel.get_modes(&mut ModeList::new());
        assert_eq!(panel.state(), PanelState::Prepared);
    }

    #[test]
    fn test_add_modes_skips_failed_entry() {
        let table = [timing(800, 480), timing(1024, 600), timing(1280, 720)];
        let mut connector = MockConnector::failing_on(&[2]);

        assert_eq!(add_modes(&table, &mut connector), 2);
        assert_eq!(connector.attempts(), 3);

        let names: Vec<&str> = connector.modes().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["800x480", "1280x720"]);
        assert!(connector.modes()[0].is_preferred());
        assert!(!connector.modes()[1].is_preferred());
        assert!(
            connector
                .modes()
                .iter()
                .all(|m| m.mode_type.contains(ModeType::DRIVER))
        );
    }

    #[test]
    fn test_add_modes_failed_first_entry_has_no_preferred() {
        let table = [timing(800, 480), timing(1024, 600)];
        let mut connector = MockConnector::failing_on(&[1]);

        assert_eq!(add_modes(&table, &mut connector), 1);
        assert!(connector.modes().iter().all(|m| !m.is_preferred()));
    }

    #[test]
    fn test_get_modes_reports_info_even_when_modes_fail() {
        let (panel, _host) = probed_panel();
        let mut connector = MockConnector::failing_on(&[1]);

        assert_eq!(panel.get_modes(&mut connector), 0);
        assert_eq!(connector.display_info(), TOUCHSCREEN_DISPLAY_INFO);
    }

    #[test]
    fn test_mode_list_limit() {
        let table = [timing(800, 480), timing(1024, 600), timing(1280, 720)];
        let mut modes = ModeList::with_limit(1);

        assert_eq!(add_modes(&table, &mut modes), 1);
        assert_eq!(modes.modes().len(), 1);
    }

    #[test]
    fn test_mode_timing_porches() {
        let mode = TOUCHSCREEN_MODES[0];
        assert!(mode.is_well_formed());
        assert_eq!(mode.hfront_porch(), Some(61));
        assert_eq!(mode.hsync_width(), Some(2));
        assert_eq!(mode.hback_porch(), Some(44));
        assert_eq!(mode.vfront_porch(), Some(7));
        assert_eq!(mode.vsync_width(), Some(2));
        assert_eq!(mode.vback_porch(), Some(21));
        assert_eq!(mode.label(), "800x480@60");
    }

    #[test]
    fn test_malformed_timing_has_no_porches() {
        let mode = ModeTiming {
            hsync_start: 700,
            vtotal: 400,
            ..TOUCHSCREEN_MODES[0]
        };
        assert!(!mode.is_well_formed());
        assert_eq!(mode.hfront_porch(), None);
        assert_eq!(mode.hsync_width(), Some(163));
        assert_eq!(mode.vback_porch(), None);
        assert_eq!(mode.vfront_porch(), Some(7));
    }

    #[test]
    fn test_pixel_format_bits_per_pixel() {
        assert_eq!(PixelFormat::Rgb888.bits_per_pixel(), 24);
        assert_eq!(PixelFormat::Rgb666.bits_per_pixel(), 24);
        assert_eq!(PixelFormat::Rgb666Packed.bits_per_pixel(), 18);
        assert_eq!(PixelFormat::Rgb565.bits_per_pixel(), 16);
    }

    #[test]
    fn test_effective_brightness() {
        let mut props = BacklightProperties {
            brightness: 200,
            max_brightness: 255,
            power: BlankLevel::Unblank,
            state: BacklightState::empty(),
        };
        assert_eq!(effective_brightness(&props), 200);

        props.power = BlankLevel::Powerdown;
        assert_eq!(effective_brightness(&props), 0);

        props.power = BlankLevel::Unblank;
        props.state = BacklightState::SUSPENDED;
        assert_eq!(effective_brightness(&props), 0);

        props.state = BacklightState::FB_BLANK;
        assert_eq!(effective_brightness(&props), 0);
    }

    #[test]
    fn test_probe_defers_until_bridge_registered() {
        let mut bus = DeviceRegistry::new();
        bus.link(RPI_TOUCHSCREEN.bridge_reference, BRIDGE_NODE);
        let mut host = MockDisplayHost::new();

        let err = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap_err();
        assert!(matches!(err, PanelError::TemporarilyUnavailable { .. }));
        assert!(host.registered.is_empty());

        bus.register(BridgeDevice::new(BRIDGE_NODE, 0x45));
        let panel = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap();

        assert_eq!(panel.bridge().address, 0x45);
        assert_eq!(host.registered, vec![RPI_TOUCHSCREEN.name.to_string()]);
        assert_eq!(host.attached, Some(RPI_TOUCHSCREEN.dsi));
    }

    #[test]
    fn test_probe_unknown_reference() {
        let bus = DeviceRegistry::new();
        let mut host = MockDisplayHost::new();

        let err = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap_err();
        assert!(matches!(err, PanelError::NoDevice { .. }));
    }

    #[test]
    fn test_probe_registration_failure_releases_bridge() {
        let bus = bus_with_bridge();
        let bridge = bus.find_bridge(RPI_TOUCHSCREEN.bridge_reference).unwrap();
        let mut host = MockDisplayHost {
            fail_register: true,
            ..Default::default()
        };

        let err = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap_err();
        assert!(matches!(err, PanelError::Registration(_)));
        // registry + our handle
        assert_eq!(Arc::strong_count(&bridge), 2);
    }

    #[test]
    fn test_probe_attach_failure_unregisters() {
        let bus = bus_with_bridge();
        let mut host = MockDisplayHost {
            fail_attach: true,
            ..Default::default()
        };

        let err = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap_err();
        assert!(matches!(err, PanelError::Attach(_)));
        assert!(host.registered.is_empty());
    }

    #[test]
    fn test_remove_releases_bridge_and_backlight() {
        let bus = bus_with_bridge();
        let bridge = bus.find_bridge(RPI_TOUCHSCREEN.bridge_reference).unwrap();
        let mut host = MockDisplayHost::new();
        let mut panel = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host).unwrap();
        let (bl, log) = recording_backlight(200);
        panel.attach_backlight(Arc::clone(&bl));
        assert_eq!(Arc::strong_count(&bridge), 3);
        assert_eq!(Arc::strong_count(&bl), 2);

        panel.remove(&mut host).unwrap();
        assert!(host.registered.is_empty());
        assert!(host.attached.is_none());
        assert_eq!(Arc::strong_count(&bridge), 2);

        // Nothing is left that could switch the backlight on
        assert_eq!(Arc::strong_count(&bl), 1);
        assert_eq!(lock_backlight(&bl).effective_brightness(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_remove_detach_failure_hands_panel_back() {
        let (mut panel, mut host) = probed_panel();
        panel.prepare();
        host.fail_detach = true;

        let (mut panel, err) = panel.remove(&mut host).unwrap_err();
        assert!(matches!(err, PanelError::Detach(_)));
        assert_eq!(panel.bridge().name, BRIDGE_NODE);
        assert_eq!(host.registered.len(), 1);

        // Still bound and drivable
        panel.enable();
        assert_eq!(panel.state(), PanelState::Enabled);
        panel.disable();

        host.fail_detach = false;
        panel.remove(&mut host).unwrap();
        assert!(host.registered.is_empty());
    }

    #[test]
    fn test_probe_registers_backlight_when_configured() {
        static WITH_BACKLIGHT: PanelDescriptor = PanelDescriptor {
            name: "touchscreen-with-backlight",
            compatible: "test,touchscreen-backlight",
            bridge_reference: "raspberrypi,touchscreen-bridge",
            modes: &TOUCHSCREEN_MODES,
            info: TOUCHSCREEN_DISPLAY_INFO,
            dsi: DsiConfig {
                mode_flags: DsiModeFlags::VIDEO,
                format: PixelFormat::Rgb888,
                lanes: 1,
            },
            register_backlight: true,
            backlight_name: "test-backlight",
        };

        let mut host = MockDisplayHost::new();
        let mut panel = Panel::probe(&WITH_BACKLIGHT, &bus_with_bridge(), &mut host).unwrap();
        let bl = Arc::clone(panel.backlight().unwrap());
        {
            let bl = lock_backlight(&bl);
            assert_eq!(bl.name(), "test-backlight");
            assert_eq!(bl.props.brightness, TOUCHSCREEN_MAX_BRIGHTNESS);
            assert_eq!(bl.props.max_brightness, TOUCHSCREEN_MAX_BRIGHTNESS);
            assert_eq!(bl.effective_brightness(), 0);
        }

        panel.prepare();
        panel.enable();
        assert_eq!(lock_backlight(&bl).effective_brightness(), TOUCHSCREEN_MAX_BRIGHTNESS);
    }

    #[test]
    fn test_shutdown_does_not_sequence_power() {
        let (mut panel, _host) = probed_panel();
        panel.prepare();
        panel.enable();

        panel.shutdown();
        assert_eq!(panel.state(), PanelState::Enabled);
    }

    #[test]
    fn test_unregistered_bridge_defers_again() {
        let mut bus = bus_with_bridge();
        let held = bus.unregister(BRIDGE_NODE).unwrap();
        assert_eq!(held.name, BRIDGE_NODE);

        let err = bus.find_bridge(RPI_TOUCHSCREEN.bridge_reference).unwrap_err();
        assert_eq!(err, LookupError::NotYetAvailable);
    }

    #[test]
    fn test_touchscreen_has_no_backlight_by_default() {
        let (panel, _host) = probed_panel();
        assert!(!RPI_TOUCHSCREEN.register_backlight);
        assert!(panel.backlight().is_none());
    }

    #[test]
    fn test_of_match() {
        let desc = of_match("raspberrypi,touchscreen").unwrap();
        assert_eq!(desc.name, "raspberrypi-touchscreen");
        assert_eq!(desc.dsi.lanes, 1);
        assert_eq!(desc.dsi.format, PixelFormat::Rgb888);
        assert!(desc.dsi.mode_flags.contains(DsiModeFlags::VIDEO | DsiModeFlags::VIDEO_SYNC_PULSE));

        assert!(of_match("raspberrypi,other").is_none());
    }

    #[test]
    fn test_state_from_flags() {
        assert_eq!(PanelState::from_flags(false, false), Some(PanelState::Disabled));
        assert_eq!(PanelState::from_flags(true, false), Some(PanelState::Prepared));
        assert_eq!(PanelState::from_flags(true, true), Some(PanelState::Enabled));
        assert_eq!(PanelState::from_flags(false, true), None);
    }
}
