//! Backlight collaborator.
//!
//! The panel never owns the backlight. It only flips the power level on
//! enable/disable and asks the device to refresh its status.

use crate::error::PanelError;
use bitflags::bitflags;
use log::{debug, trace};
use std::sync::{Arc, Mutex, MutexGuard};

/// Brightness a freshly registered touchscreen backlight starts at.
pub const TOUCHSCREEN_MAX_BRIGHTNESS: u32 = 255;

/// A backlight shared between the panel and the subsystem that owns it.
pub type SharedBacklight = Arc<Mutex<BacklightDevice>>;

/// Framebuffer blanking level, used as the backlight power field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlankLevel {
    /// Powered on and showing content.
    Unblank,
    /// Blanked, but the display stays powered.
    Normal,
    /// Vertical sync suspended.
    VsyncSuspend,
    /// Horizontal sync suspended.
    HsyncSuspend,
    /// Fully powered down.
    #[default]
    Powerdown,
}

impl BlankLevel {
    /// Whether this level lets light through.
    pub fn is_on(&self) -> bool {
        matches!(self, Self::Unblank)
    }
}

bitflags! {
    /// Administrative state set by the backlight core.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BacklightState: u32 {
        /// The system is suspended.
        const SUSPENDED = 1 << 0;
        /// The framebuffer is blanked.
        const FB_BLANK = 1 << 1;
    }
}

/// Backlight properties that drive the status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklightProperties {
    /// Requested brightness.
    pub brightness: u32,
    /// Upper bound for `brightness`.
    pub max_brightness: u32,
    /// Power level.
    pub power: BlankLevel,
    /// Suspend/blank flags.
    pub state: BacklightState,
}

impl Default for BacklightProperties {
    fn default() -> Self {
        Self {
            brightness: 0,
            max_brightness: 0,
            power: BlankLevel::default(),
            state: BacklightState::empty(),
        }
    }
}

/// The brightness actually produced for a set of properties.
///
/// Collapses to zero whenever the power level is not on or the device is
/// suspended or blanked.
pub fn effective_brightness(props: &BacklightProperties) -> u32 {
    if !props.power.is_on()
        || props
            .state
            .intersects(BacklightState::SUSPENDED | BacklightState::FB_BLANK)
    {
        0
    } else {
        props.brightness
    }
}

// =============================================================================
// Backlight Ops
// =============================================================================

/// Hardware hook invoked whenever backlight properties change.
pub trait BacklightOps: Send {
    /// Push the current properties to the hardware.
    fn update_status(&mut self, props: &BacklightProperties) -> Result<(), PanelError>;
}

/// Status hook of the touchscreen backlight.
///
/// Computes the effective brightness but drives no PWM.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchscreenBacklightOps;

impl BacklightOps for TouchscreenBacklightOps {
    fn update_status(&mut self, props: &BacklightProperties) -> Result<(), PanelError> {
        let brightness = effective_brightness(props);
        trace!("backlight effective brightness: {}", brightness);
        Ok(())
    }
}

// =============================================================================
// Backlight Device
// =============================================================================

/// A backlight device: properties plus the hook that applies them.
pub struct BacklightDevice {
    name: String,
    /// Current properties. Writers should call [`update_status`](Self::update_status) afterwards.
    pub props: BacklightProperties,
    ops: Box<dyn BacklightOps>,
}

impl std::fmt::Debug for BacklightDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacklightDevice")
            .field("name", &self.name)
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}

impl BacklightDevice {
    /// Create a device with the given properties.
    pub fn new(
        name: impl Into<String>,
        props: BacklightProperties,
        ops: Box<dyn BacklightOps>,
    ) -> Self {
        Self {
            name: name.into(),
            props,
            ops,
        }
    }

    /// Register a touchscreen-style backlight at full brightness.
    pub fn register(name: impl Into<String>, ops: Box<dyn BacklightOps>) -> SharedBacklight {
        let name = name.into();
        debug!("registering backlight '{}'", name);
        let props = BacklightProperties {
            brightness: TOUCHSCREEN_MAX_BRIGHTNESS,
            max_brightness: TOUCHSCREEN_MAX_BRIGHTNESS,
            ..BacklightProperties::default()
        };
        Arc::new(Mutex::new(Self::new(name, props, ops)))
    }

    /// The device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the power level without refreshing.
    pub fn set_power(&mut self, power: BlankLevel) {
        self.props.power = power;
    }

    /// Recompute and apply the output for the current properties.
    pub fn update_status(&mut self) -> Result<(), PanelError> {
        self.ops.update_status(&self.props)
    }

    /// Effective brightness for the current properties.
    pub fn effective_brightness(&self) -> u32 {
        effective_brightness(&self.props)
    }
}

/// Lock a shared backlight, recovering the data if a holder panicked.
pub fn lock(backlight: &SharedBacklight) -> MutexGuard<'_, BacklightDevice> {
    backlight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
