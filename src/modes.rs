//! Display timing modes and the connector that consumes them.

use crate::error::PanelError;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Mode type flags attached to a probed mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeType: u32 {
        /// Built into the connector.
        const BUILTIN = 1 << 0;
        /// Clock was computed by the consumer.
        const CLOCK_C = (1 << 1) | Self::BUILTIN.bits();
        /// CRTC timings were computed by the consumer.
        const CRTC_C = (1 << 2) | Self::BUILTIN.bits();
        /// The mode the panel would like to run at.
        const PREFERRED = 1 << 3;
        /// Fallback when nothing else matches.
        const DEFAULT = 1 << 4;
        /// Added by the user.
        const USERDEF = 1 << 5;
        /// Supplied by the panel driver.
        const DRIVER = 1 << 6;
    }
}

// =============================================================================
// Mode Timing
// =============================================================================

/// A fixed display timing record, as stored in a panel's mode table.
///
/// Horizontal and vertical values are absolute positions within the line or
/// frame, not porch widths. `clock` is in kHz, `vrefresh` in Hz. The porch
/// and sync-width accessors return `None` when the positions are out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTiming {
    /// Pixel clock in kHz.
    pub clock: u32,
    /// Active pixels per line.
    pub hdisplay: u16,
    /// Start of the horizontal sync pulse.
    pub hsync_start: u16,
    /// End of the horizontal sync pulse.
    pub hsync_end: u16,
    /// Total pixels per line, blanking included.
    pub htotal: u16,
    /// Active lines per frame.
    pub vdisplay: u16,
    /// Start of the vertical sync pulse.
    pub vsync_start: u16,
    /// End of the vertical sync pulse.
    pub vsync_end: u16,
    /// Total lines per frame, blanking included.
    pub vtotal: u16,
    /// Refresh rate in Hz.
    pub vrefresh: u32,
}

impl ModeTiming {
    /// Horizontal front porch in pixels.
    pub const fn hfront_porch(&self) -> Option<u16> {
        self.hsync_start.checked_sub(self.hdisplay)
    }

    /// Horizontal sync pulse width in pixels.
    pub const fn hsync_width(&self) -> Option<u16> {
        self.hsync_end.checked_sub(self.hsync_start)
    }

    /// Horizontal back porch in pixels.
    pub const fn hback_porch(&self) -> Option<u16> {
        self.htotal.checked_sub(self.hsync_end)
    }

    /// Vertical front porch in lines.
    pub const fn vfront_porch(&self) -> Option<u16> {
        self.vsync_start.checked_sub(self.vdisplay)
    }

    /// Vertical sync pulse width in lines.
    pub const fn vsync_width(&self) -> Option<u16> {
        self.vsync_end.checked_sub(self.vsync_start)
    }

    /// Vertical back porch in lines.
    pub const fn vback_porch(&self) -> Option<u16> {
        self.vtotal.checked_sub(self.vsync_end)
    }

    /// Whether the sync positions are ordered within each axis.
    pub const fn is_well_formed(&self) -> bool {
        self.hdisplay <= self.hsync_start
            && self.hsync_start <= self.hsync_end
            && self.hsync_end <= self.htotal
            && self.vdisplay <= self.vsync_start
            && self.vsync_start <= self.vsync_end
            && self.vsync_end <= self.vtotal
    }

    /// The `{h}x{v}@{refresh}` label used in log messages.
    pub fn label(&self) -> String {
        format!("{}x{}@{}", self.hdisplay, self.vdisplay, self.vrefresh)
    }
}

/// Modes supported by the 7" touchscreen.
///
/// The DSI PLL runs at 2 GHz / 3 (only integer dividers are available), so
/// the pixel clock is 2 GHz / 3 / 8.
pub static TOUCHSCREEN_MODES: [ModeTiming; 1] = [ModeTiming {
    clock: 83_333,
    hdisplay: 800,
    hsync_start: 800 + 61,
    hsync_end: 800 + 61 + 2,
    htotal: 800 + 61 + 2 + 44,
    vdisplay: 480,
    vsync_start: 480 + 7,
    vsync_end: 480 + 7 + 2,
    vtotal: 480 + 7 + 2 + 21,
    vrefresh: 60,
}];

// =============================================================================
// Display Mode / Display Info
// =============================================================================

/// A mode materialized from a [`ModeTiming`] and handed to a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMode {
    /// The timing this mode was duplicated from.
    pub timing: ModeTiming,
    /// Type flags.
    pub mode_type: ModeType,
    /// Human readable name, empty until [`DisplayMode::set_name`] runs.
    pub name: String,
}

impl DisplayMode {
    /// Duplicate a table entry into an untyped, unnamed mode.
    pub fn from_timing(timing: ModeTiming) -> Self {
        Self {
            timing,
            mode_type: ModeType::empty(),
            name: String::new(),
        }
    }

    /// Set the name to `{hdisplay}x{vdisplay}`.
    pub fn set_name(&mut self) {
        self.name = format!("{}x{}", self.timing.hdisplay, self.timing.vdisplay);
    }

    /// Whether the panel marked this mode as preferred.
    pub fn is_preferred(&self) -> bool {
        self.mode_type.contains(ModeType::PREFERRED)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.name, self.timing.label())
    }
}

/// Static physical metadata reported alongside the modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayInfo {
    /// Active area width in millimeters.
    pub width_mm: u32,
    /// Active area height in millimeters.
    pub height_mm: u32,
    /// Bits per color channel.
    pub bpc: u8,
}

/// Physical metadata of the 7" touchscreen.
pub const TOUCHSCREEN_DISPLAY_INFO: DisplayInfo = DisplayInfo {
    width_mm: 217,
    height_mm: 136,
    bpc: 8,
};

// =============================================================================
// Connector
// =============================================================================

/// The consumer side of mode enumeration.
///
/// The display subsystem owns the produced modes: it duplicates each table
/// entry and keeps the probed copies.
pub trait Connector {
    /// Materialize a copy of a table entry.
    ///
    /// # Errors
    ///
    /// [`PanelError::ResourceExhausted`] if the copy cannot be allocated.
    fn duplicate_mode(&mut self, timing: &ModeTiming) -> Result<DisplayMode, PanelError>;

    /// Accept a finished mode into the probed list.
    fn add_probed_mode(&mut self, mode: DisplayMode);

    /// Mutable access to the connector's display metadata.
    fn display_info_mut(&mut self) -> &mut DisplayInfo;
}

/// In-memory connector collecting probed modes.
///
/// Duplication reserves room with fallible allocation, so running out of
/// memory (or past the optional `limit`) surfaces as an error instead of an
/// abort.
#[derive(Debug, Clone, Default)]
pub struct ModeList {
    modes: Vec<DisplayMode>,
    info: DisplayInfo,
    limit: Option<usize>,
}

impl ModeList {
    /// Create an empty, unbounded list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list that refuses to hold more than `limit` modes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// The probed modes in insertion order.
    pub fn modes(&self) -> &[DisplayMode] {
        &self.modes
    }

    /// The reported display metadata.
    pub fn display_info(&self) -> DisplayInfo {
        self.info
    }

    /// The preferred mode, if one was probed.
    pub fn preferred(&self) -> Option<&DisplayMode> {
        self.modes.iter().find(|m| m.is_preferred())
    }
}

impl Connector for ModeList {
    fn duplicate_mode(&mut self, timing: &ModeTiming) -> Result<DisplayMode, PanelError> {
        let exhausted = || PanelError::ResourceExhausted {
            mode: timing.label(),
        };

        if self.limit.is_some_and(|limit| self.modes.len() >= limit) {
            return Err(exhausted());
        }
        self.modes.try_reserve(1).map_err(|_| exhausted())?;

        Ok(DisplayMode::from_timing(*timing))
    }

    fn add_probed_mode(&mut self, mode: DisplayMode) {
        self.modes.push(mode);
    }

    fn display_info_mut(&mut self) -> &mut DisplayInfo {
        &mut self.info
    }
}
