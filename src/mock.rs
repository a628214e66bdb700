//! Mock collaborators for testing.

use crate::backlight::{BacklightOps, BacklightProperties};
use crate::config::DsiConfig;
use crate::error::PanelError;
use crate::modes::{Connector, DisplayInfo, DisplayMode, ModeList, ModeTiming};
use crate::panel::DisplayHost;
use std::sync::{Arc, Mutex};

/// A mock display subsystem / DSI host.
///
/// Records registrations and the attached link settings, and can be told to
/// refuse any step.
///
/// # Example
///
/// ```
/// use rpi_touchscreen_panel::{DisplayHost, MockDisplayHost, RPI_TOUCHSCREEN};
///
/// let mut host = MockDisplayHost::new();
/// host.register_panel("panel").unwrap();
/// host.attach_dsi(&RPI_TOUCHSCREEN.dsi).unwrap();
/// assert_eq!(host.registered, vec!["panel".to_string()]);
/// assert_eq!(host.attached, Some(RPI_TOUCHSCREEN.dsi));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDisplayHost {
    /// Names of the currently registered panels.
    pub registered: Vec<String>,
    /// Link settings of the current attachment.
    pub attached: Option<DsiConfig>,
    /// Refuse `register_panel`.
    pub fail_register: bool,
    /// Refuse `attach_dsi`.
    pub fail_attach: bool,
    /// Refuse `detach_dsi`.
    pub fail_detach: bool,
}

impl MockDisplayHost {
    /// Create a host that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplayHost for MockDisplayHost {
    fn register_panel(&mut self, name: &str) -> Result<(), PanelError> {
        if self.fail_register {
            return Err(PanelError::Registration(format!("{name} rejected")));
        }
        self.registered.push(name.to_string());
        Ok(())
    }

    fn unregister_panel(&mut self, name: &str) {
        self.registered.retain(|n| n != name);
    }

    fn attach_dsi(&mut self, config: &DsiConfig) -> Result<(), PanelError> {
        if self.fail_attach {
            return Err(PanelError::Attach("host busy".to_string()));
        }
        self.attached = Some(*config);
        Ok(())
    }

    fn detach_dsi(&mut self) -> Result<(), PanelError> {
        if self.fail_detach {
            return Err(PanelError::Detach("host busy".to_string()));
        }
        self.attached = None;
        Ok(())
    }
}

/// A connector whose mode duplication fails on chosen attempts.
///
/// Attempts are counted from 1 across the connector's lifetime.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    inner: ModeList,
    fail_on: Vec<usize>,
    attempts: usize,
}

impl MockConnector {
    /// Create a connector that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector that fails the listed duplication attempts.
    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            fail_on: attempts.to_vec(),
            ..Self::default()
        }
    }

    /// Number of duplication attempts seen so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// The probed modes.
    pub fn modes(&self) -> &[DisplayMode] {
        self.inner.modes()
    }

    /// The reported display metadata.
    pub fn display_info(&self) -> DisplayInfo {
        self.inner.display_info()
    }
}

impl Connector for MockConnector {
    fn duplicate_mode(&mut self, timing: &ModeTiming) -> Result<DisplayMode, PanelError> {
        self.attempts += 1;
        if self.fail_on.contains(&self.attempts) {
            return Err(PanelError::ResourceExhausted {
                mode: timing.label(),
            });
        }
        self.inner.duplicate_mode(timing)
    }

    fn add_probed_mode(&mut self, mode: DisplayMode) {
        self.inner.add_probed_mode(mode);
    }

    fn display_info_mut(&mut self) -> &mut DisplayInfo {
        self.inner.display_info_mut()
    }
}

/// Shared log of the properties a [`RecordingBacklightOps`] was asked to apply.
pub type UpdateLog = Arc<Mutex<Vec<BacklightProperties>>>;

/// Backlight hook that records every status update.
#[derive(Debug, Clone, Default)]
pub struct RecordingBacklightOps {
    log: UpdateLog,
}

impl RecordingBacklightOps {
    /// Create a hook and a handle to its update log.
    pub fn new() -> (Self, UpdateLog) {
        let ops = Self::default();
        let log = Arc::clone(&ops.log);
        (ops, log)
    }
}

impl BacklightOps for RecordingBacklightOps {
    fn update_status(&mut self, props: &BacklightProperties) -> Result<(), PanelError> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(*props);
        Ok(())
    }
}
