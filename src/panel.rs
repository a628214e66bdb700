//! Panel lifecycle controller.

use crate::backlight::{
    self, BacklightDevice, BlankLevel, SharedBacklight, TouchscreenBacklightOps,
};
use crate::bridge::{BridgeLookup, BridgeRef, LookupError};
use crate::config::{DsiConfig, PanelDescriptor};
use crate::error::PanelError;
use crate::modes::{Connector, ModeTiming, ModeType};
use crate::state::PanelState;

use log::{debug, error, info, warn};

// =============================================================================
// Panel Funcs Trait
// =============================================================================

/// Lifecycle callbacks a display subsystem drives on a panel.
///
/// The subsystem queries modes once while configuring the output, then calls
/// `prepare` → `enable` to start showing content and `disable` → `unprepare`
/// to stop. Every transition is idempotent.
pub trait PanelFuncs {
    /// Run pre-power sequencing.
    fn prepare(&mut self);

    /// Start showing content.
    ///
    /// Must only be called once the DSI link is transmitting.
    fn enable(&mut self);

    /// Stop showing content.
    fn disable(&mut self);

    /// Undo pre-power sequencing.
    fn unprepare(&mut self);

    /// Hand the supported modes to `connector`, returning how many were added.
    fn get_modes(&self, connector: &mut dyn Connector) -> usize;
}

// =============================================================================
// Display Host Trait
// =============================================================================

/// The display subsystem and DSI host the panel registers with.
pub trait DisplayHost {
    /// Make the panel visible to the display subsystem.
    fn register_panel(&mut self, name: &str) -> Result<(), PanelError>;

    /// Withdraw the panel from the display subsystem.
    fn unregister_panel(&mut self, name: &str);

    /// Attach to the DSI host with the given link settings.
    fn attach_dsi(&mut self, config: &DsiConfig) -> Result<(), PanelError>;

    /// Detach from the DSI host.
    fn detach_dsi(&mut self) -> Result<(), PanelError>;
}

// =============================================================================
// Panel
// =============================================================================

/// One bound touchscreen panel.
///
/// Created by [`Panel::probe`] and torn down by [`Panel::remove`]. In between
/// it is driven through [`PanelFuncs`].
///
/// # Example
///
/// ```
/// use rpi_touchscreen_panel::{
///     BridgeDevice, DeviceRegistry, MockDisplayHost, ModeList, Panel, PanelFuncs, PanelState,
///     RPI_TOUCHSCREEN,
/// };
///
/// let mut bus = DeviceRegistry::new();
/// bus.link(RPI_TOUCHSCREEN.bridge_reference, "attiny88");
/// bus.register(BridgeDevice::new("attiny88", 0x45));
///
/// let mut host = MockDisplayHost::new();
/// let mut panel = Panel::probe(&RPI_TOUCHSCREEN, &bus, &mut host)?;
///
/// let mut modes = ModeList::new();
/// assert_eq!(panel.get_modes(&mut modes), 1);
///
/// panel.prepare();
/// panel.enable();
/// assert_eq!(panel.state(), PanelState::Enabled);
///
/// panel.disable();
/// panel.unprepare();
/// panel.remove(&mut host).map_err(|(_, e)| e)?;
/// # Ok::<(), rpi_touchscreen_panel::PanelError>(())
/// ```
#[derive(Debug)]
pub struct Panel {
    desc: &'static PanelDescriptor,
    bridge: BridgeRef,
    backlight: Option<SharedBacklight>,
    prepared: bool,
    enabled: bool,
}

impl Panel {
    /// Bind a panel described by `desc`.
    ///
    /// Locates the bridge, optionally registers a backlight, registers with the
    /// display subsystem and attaches to the DSI host.
    ///
    /// # Errors
    ///
    /// - [`PanelError::TemporarilyUnavailable`] if the bridge is not registered yet
    /// - [`PanelError::NoDevice`] if the bridge reference names nothing
    /// - [`PanelError::Registration`] / [`PanelError::Attach`] if the host refuses
    pub fn probe(
        desc: &'static PanelDescriptor,
        lookup: &dyn BridgeLookup,
        host: &mut dyn DisplayHost,
    ) -> Result<Self, PanelError> {
        let bridge = lookup
            .find_bridge(desc.bridge_reference)
            .map_err(|e| {
                let reference = desc.bridge_reference.to_string();
                match e {
                    LookupError::NotYetAvailable => {
                        debug!("bridge '{}' not registered yet, deferring", reference);
                        PanelError::TemporarilyUnavailable { reference }
                    }
                    LookupError::NoSuchNode => PanelError::NoDevice { reference },
                }
            })?;

        let backlight = desc.register_backlight.then(|| {
            BacklightDevice::register(desc.backlight_name, Box::new(TouchscreenBacklightOps))
        });

        // Dropping `bridge` on the error paths below releases it.
        host.register_panel(desc.name)?;
        if let Err(e) = host.attach_dsi(&desc.dsi) {
            error!("failed to attach {} to DSI host: {}", desc.name, e);
            host.unregister_panel(desc.name);
            return Err(e);
        }

        info!(
            "bound {} (bridge '{}' at 0x{:02x})",
            desc.name, bridge.name, bridge.address
        );

        Ok(Self {
            desc,
            bridge,
            backlight,
            prepared: false,
            enabled: false,
        })
    }

    /// Unbind the panel: detach, unregister, release the bridge.
    ///
    /// Consumes the panel; dropping it releases the bridge and backlight
    /// references.
    ///
    /// # Errors
    ///
    /// [`PanelError::Detach`] if the DSI host refuses. The panel is handed back
    /// still bound.
    pub fn remove(self, host: &mut dyn DisplayHost) -> Result<(), (Self, PanelError)> {
        if let Err(e) = host.detach_dsi() {
            error!("failed to detach {} from DSI host: {}", self.desc.name, e);
            return Err((self, e));
        }

        host.unregister_panel(self.desc.name);
        info!("unbound {}", self.desc.name);
        Ok(())
    }

    /// System shutdown hook. Performs no power sequencing.
    pub fn shutdown(&mut self) {
        debug!("shutdown {}: no power-off sequence", self.desc.name);
    }

    /// Attach an externally owned backlight, replacing any current one.
    pub fn attach_backlight(&mut self, backlight: SharedBacklight) {
        self.backlight = Some(backlight);
    }

    /// The attached backlight, if any.
    pub fn backlight(&self) -> Option<&SharedBacklight> {
        self.backlight.as_ref()
    }

    /// The held bridge reference.
    pub fn bridge(&self) -> &BridgeRef {
        &self.bridge
    }

    /// The descriptor this panel was bound with.
    pub fn descriptor(&self) -> &'static PanelDescriptor {
        self.desc
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PanelState {
        debug_assert!(self.prepared || !self.enabled);
        match (self.prepared, self.enabled) {
            (_, true) => PanelState::Enabled,
            (true, false) => PanelState::Prepared,
            (false, false) => PanelState::Disabled,
        }
    }

    /// Whether pre-power sequencing has run.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Whether the panel is showing content.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_backlight_power(&self, power: BlankLevel) {
        let Some(bl) = &self.backlight else {
            return;
        };

        let mut bl = backlight::lock(bl);
        bl.set_power(power);
        if let Err(e) = bl.update_status() {
            warn!("backlight '{}' status update failed: {}", bl.name(), e);
        }
    }
}

impl PanelFuncs for Panel {
    fn prepare(&mut self) {
        if self.prepared {
            return;
        }

        self.prepared = true;
        debug!("{}: prepared", self.desc.name);
    }

    fn enable(&mut self) {
        if self.enabled {
            return;
        }
        if !self.prepared {
            warn!("{}: enable before prepare ignored", self.desc.name);
            return;
        }

        // The bridge runs off the DSI byte clock, so the link is live by now.
        self.set_backlight_power(BlankLevel::Unblank);
        self.enabled = true;
        debug!("{}: enabled", self.desc.name);
    }

    fn disable(&mut self) {
        if !self.enabled {
            return;
        }

        self.set_backlight_power(BlankLevel::Powerdown);
        self.enabled = false;
        debug!("{}: disabled", self.desc.name);
    }

    fn unprepare(&mut self) {
        if !self.prepared {
            return;
        }
        if self.enabled {
            warn!("{}: unprepare while enabled ignored", self.desc.name);
            return;
        }

        self.prepared = false;
        debug!("{}: unprepared", self.desc.name);
    }

    fn get_modes(&self, connector: &mut dyn Connector) -> usize {
        let count = add_modes(self.desc.modes, connector);
        *connector.display_info_mut() = self.desc.info;
        count
    }
}

/// Duplicate every entry of `table` into `connector`.
///
/// The first entry is marked preferred, every entry driver-supplied. An entry
/// that fails to duplicate is logged and skipped; the rest are still tried.
pub fn add_modes(table: &[ModeTiming], connector: &mut dyn Connector) -> usize {
    let mut count = 0;

    for (i, timing) in table.iter().enumerate() {
        let mut mode = match connector.duplicate_mode(timing) {
            Ok(mode) => mode,
            Err(e) => {
                error!("failed to add mode {}: {}", timing.label(), e);
                continue;
            }
        };

        mode.mode_type |= ModeType::DRIVER;
        if i == 0 {
            mode.mode_type |= ModeType::PREFERRED;
        }
        mode.set_name();

        connector.add_probed_mode(mode);
        count += 1;
    }

    count
}

