//! Panel lifecycle state.

/// The lifecycle state of a panel.
///
/// Derived from the panel's `prepared`/`enabled` pair. An enabled panel is
/// always prepared, so the pair collapses to three states.
/// Use [`Panel::state`](crate::Panel::state) to obtain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    /// Not prepared and not displaying. Initial and terminal state.
    #[default]
    Disabled,
    /// Pre-power sequencing has run, content is not shown yet.
    Prepared,
    /// Actively displaying; the backlight may be on.
    Enabled,
}

impl PanelState {
    /// Map a `prepared`/`enabled` pair onto a state.
    ///
    /// Returns `None` for the impossible enabled-but-unprepared pair.
    pub fn from_flags(prepared: bool, enabled: bool) -> Option<Self> {
        match (prepared, enabled) {
            (false, false) => Some(Self::Disabled),
            (true, false) => Some(Self::Prepared),
            (true, true) => Some(Self::Enabled),
            (false, true) => None,
        }
    }

    /// Whether pre-power sequencing has run.
    pub fn is_prepared(&self) -> bool {
        matches!(self, Self::Prepared | Self::Enabled)
    }

    /// Whether the panel is showing content.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}
