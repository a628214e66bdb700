//! Static panel descriptions and serial link settings.

use crate::modes::{DisplayInfo, ModeTiming, TOUCHSCREEN_DISPLAY_INFO, TOUCHSCREEN_MODES};
use bitflags::bitflags;

bitflags! {
    /// DSI peripheral operating mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DsiModeFlags: u32 {
        /// Video mode.
        const VIDEO = 1 << 0;
        /// Video burst mode.
        const VIDEO_BURST = 1 << 1;
        /// Video mode with sync pulses.
        const VIDEO_SYNC_PULSE = 1 << 2;
        /// Disable auto vertical count.
        const VIDEO_AUTO_VERT = 1 << 3;
        /// Enable hsync-end packets in vsync-pulse and v-porch area.
        const VIDEO_HSE = 1 << 4;
        /// Transmit data in low power.
        const LPM = 1 << 11;
    }
}

/// Pixel format on the DSI link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 24 bits per pixel.
    #[default]
    Rgb888,
    /// 18 bits per pixel, loosely packed.
    Rgb666,
    /// 18 bits per pixel, tightly packed.
    Rgb666Packed,
    /// 16 bits per pixel.
    Rgb565,
}

impl PixelFormat {
    /// Bits transmitted per pixel.
    pub const fn bits_per_pixel(&self) -> u32 {
        match self {
            Self::Rgb888 | Self::Rgb666 => 24,
            Self::Rgb666Packed => 18,
            Self::Rgb565 => 16,
        }
    }
}

/// Settings the panel requests from the DSI host when attaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsiConfig {
    /// Operating mode.
    pub mode_flags: DsiModeFlags,
    /// Pixel format.
    pub format: PixelFormat,
    /// Number of data lanes.
    pub lanes: u8,
}

/// Everything that distinguishes one panel model from another.
#[derive(Debug, Clone, Copy)]
pub struct PanelDescriptor {
    /// Driver name, also used when registering with the display subsystem.
    pub name: &'static str,
    /// Device-tree compatible string this descriptor matches.
    pub compatible: &'static str,
    /// Reference naming the power-management bridge.
    pub bridge_reference: &'static str,
    /// Supported modes. The first entry is preferred.
    pub modes: &'static [ModeTiming],
    /// Physical metadata.
    pub info: DisplayInfo,
    /// Link settings.
    pub dsi: DsiConfig,
    /// Register a backlight device during probe.
    pub register_backlight: bool,
    /// Name of the backlight registered during probe.
    pub backlight_name: &'static str,
}

/// The Raspberry Pi 7" touchscreen.
pub static RPI_TOUCHSCREEN: PanelDescriptor = PanelDescriptor {
    name: "raspberrypi-touchscreen",
    compatible: "raspberrypi,touchscreen",
    bridge_reference: "raspberrypi,touchscreen-bridge",
    modes: &TOUCHSCREEN_MODES,
    info: TOUCHSCREEN_DISPLAY_INFO,
    dsi: DsiConfig {
        mode_flags: DsiModeFlags::VIDEO.union(DsiModeFlags::VIDEO_SYNC_PULSE),
        format: PixelFormat::Rgb888,
        lanes: 1,
    },
    // Backlight control over the bridge is not wired up yet.
    register_backlight: false,
    backlight_name: "raspberrypi-touchscreen-backlight",
};

/// Compatible-string match table.
pub static OF_MATCH: [&PanelDescriptor; 1] = [&RPI_TOUCHSCREEN];

/// Find the descriptor for a compatible string.
pub fn of_match(compatible: &str) -> Option<&'static PanelDescriptor> {
    OF_MATCH
        .iter()
        .copied()
        .find(|desc| desc.compatible == compatible)
}
