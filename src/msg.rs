use crossterm::event::KeyEvent;
use std::collections::BTreeSet;

use crate::plugin::descriptor::{PluginCandidate, PluginDescriptor};
use crate::plugin::validator::ValidationError;

/// Requests a plugin manager surface sends to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Show the add-plugin surface.
    RequestOpenInstaller,
    /// Dismiss the add-plugin surface without adding anything.
    CloseInstaller,
    /// Flat indices of every selected plugin row.
    SetPlugins(BTreeSet<usize>),
    ResetPlugins,
    AddExternalPlugin(PluginCandidate),
}

/// Notifications the host sends back to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Full plugin list after a mutation.
    StateChanged(Vec<PluginDescriptor>),
    InstallerOpened,
    InstallerClosed,
    /// An add request failed; the installer stays open.
    PluginRejected(ValidationError),
}

/// All possible messages that drive the terminal host.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Plugin protocol
    Plugin(Request),

    // -- System
    Quit,
}
