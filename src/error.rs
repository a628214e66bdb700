//! Error types for the panel controller.

/// Errors that can occur while binding or querying a panel.
///
/// Lifecycle transitions never fail; every variant here comes from probe,
/// remove, or mode enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    /// The bridge device is known but not registered yet. Retry the probe later.
    #[error("Bridge device '{reference}' not available yet - retry later")]
    TemporarilyUnavailable {
        /// The symbolic reference that was looked up.
        reference: String,
    },

    /// The bridge reference does not name any device node.
    #[error("No device behind reference '{reference}'")]
    NoDevice {
        /// The symbolic reference that was looked up.
        reference: String,
    },

    /// A mode descriptor could not be materialized.
    #[error("Failed to add mode {mode}")]
    ResourceExhausted {
        /// The `{h}x{v}@{refresh}` label of the mode.
        mode: String,
    },

    /// The display subsystem refused to register the panel.
    #[error("Panel registration failed: {0}")]
    Registration(String),

    /// The serial display link host refused the attach.
    #[error("Failed to attach to DSI host: {0}")]
    Attach(String),

    /// The serial display link host refused the detach.
    #[error("Failed to detach from DSI host: {0}")]
    Detach(String),
}
