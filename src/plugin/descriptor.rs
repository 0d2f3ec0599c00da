use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::plugin::validator::{self, ValidationError};

/// Where a menu plugin is placed in the host menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MenuPosition {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl MenuPosition {
    pub const ALL: [MenuPosition; 3] = [
        MenuPosition::Top,
        MenuPosition::Middle,
        MenuPosition::Bottom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuPosition::Top => "top",
            MenuPosition::Middle => "middle",
            MenuPosition::Bottom => "bottom",
        }
    }
}

impl fmt::Display for MenuPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MenuPosition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "top" => Ok(MenuPosition::Top),
            "middle" => Ok(MenuPosition::Middle),
            "bottom" => Ok(MenuPosition::Bottom),
            _ => Err(()),
        }
    }
}

/// The three kinds of plugin a host can load.
///
/// Menu placement options only exist on `Menu`, so no other kind can carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Editor,
    Menu {
        position: MenuPosition,
        require_doc: bool,
    },
    Validator,
}

impl PluginKind {
    pub fn label(&self) -> &'static str {
        match self {
            PluginKind::Editor => "editor",
            PluginKind::Menu { .. } => "menu",
            PluginKind::Validator => "validator",
        }
    }

    pub fn default_icon(&self) -> &'static str {
        match self {
            PluginKind::Editor => "tab",
            PluginKind::Menu { .. } => "play_circle",
            PluginKind::Validator => "rule_folder",
        }
    }

    pub fn is_editor(&self) -> bool {
        matches!(self, PluginKind::Editor)
    }

    pub fn is_menu(&self) -> bool {
        matches!(self, PluginKind::Menu { .. })
    }

    pub fn is_validator(&self) -> bool {
        matches!(self, PluginKind::Validator)
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Metadata for one plugin. `src` identifies the plugin within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PluginRecord", into = "PluginRecord")]
pub struct PluginDescriptor {
    pub name: String,
    pub src: String,
    pub kind: PluginKind,
    pub installed: bool,
    pub official: bool,
    pub icon: Option<String>,
}

impl PluginDescriptor {
    /// Icon hint for renderers, falling back to the kind's icon.
    pub fn icon(&self) -> &str {
        self.icon.as_deref().unwrap_or_else(|| self.kind.default_icon())
    }

    /// Normalized source used for identity comparisons.
    pub fn source_key(&self) -> String {
        source_key(&self.src)
    }
}

/// Normalizes a plugin source so `http://x.com` and `http://x.com/` compare equal.
pub fn source_key(src: &str) -> String {
    let trimmed = src.trim();
    url::Url::parse(trimmed)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// Unvalidated plugin fields as collected by an installer surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_doc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl PluginCandidate {
    pub fn new(name: impl Into<String>, src: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_require_doc(mut self, require_doc: bool) -> Self {
        self.require_doc = Some(require_doc);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Flat on-disk shape of a descriptor, used by config and the state file.
///
/// Every field may be missing, so a saved `{src, installed}` pair still loads.
/// Validation happens when a record becomes a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    #[serde(flatten)]
    pub candidate: PluginCandidate,
    #[serde(default = "default_installed")]
    pub installed: bool,
    #[serde(default)]
    pub official: bool,
}

fn default_installed() -> bool {
    true
}

impl TryFrom<PluginRecord> for PluginDescriptor {
    type Error = ValidationError;

    fn try_from(record: PluginRecord) -> Result<Self, Self::Error> {
        let mut descriptor = validator::validate(&record.candidate)?;
        descriptor.installed = record.installed;
        descriptor.official = record.official;
        Ok(descriptor)
    }
}

impl From<PluginDescriptor> for PluginRecord {
    fn from(descriptor: PluginDescriptor) -> Self {
        let (position, require_doc) = match descriptor.kind {
            PluginKind::Menu {
                position,
                require_doc,
            } => (Some(position.label().to_string()), Some(require_doc)),
            _ => (None, None),
        };

        Self {
            candidate: PluginCandidate {
                name: descriptor.name,
                src: descriptor.src,
                kind: Some(descriptor.kind.label().to_string()),
                position,
                require_doc,
                icon: descriptor.icon,
            },
            installed: descriptor.installed,
            official: descriptor.official,
        }
    }
}

impl From<PluginDescriptor> for PluginCandidate {
    fn from(descriptor: PluginDescriptor) -> Self {
        PluginRecord::from(descriptor).candidate
    }
}
