use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::plugin::descriptor::{PluginDescriptor, PluginRecord};

/// Where the plugin list is kept between sessions.
///
/// `load` returns `None` when nothing has been saved yet. Loaded records are
/// unvalidated; `PluginRegistry::restore` checks them one at a time.
pub trait PluginStore {
    fn load(&self) -> Result<Option<Vec<PluginRecord>>>;
    fn save(&self, plugins: &[PluginDescriptor]) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct StateFile {
    plugins: Vec<PluginRecord>,
}

/// Records are kept as raw tables so one malformed entry does not hide the others.
#[derive(Debug, Deserialize)]
struct RawStateFile {
    #[serde(default)]
    plugins: Vec<toml::Value>,
}

/// Plugin list stored as a TOML file.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl PluginStore for TomlFileStore {
    fn load(&self) -> Result<Option<Vec<PluginRecord>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let state: RawStateFile =
            toml::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))?;

        let total = state.plugins.len();
        let records: Vec<PluginRecord> = state
            .plugins
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match value.try_into::<PluginRecord>() {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(
                        "skipping plugin entry {idx} in {}: {err}",
                        self.path.display()
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(
            "loaded {} of {total} plugin records from {}",
            records.len(),
            self.path.display()
        );
        Ok(Some(records))
    }

    /// Writes a sibling temp file and renames it over the state file, so a
    /// reader sees either the old list or the new one.
    fn save(&self, plugins: &[PluginDescriptor]) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(dir)?;

        let state = StateFile {
            plugins: plugins.iter().cloned().map(PluginRecord::from).collect(),
        };
        let raw = toml::to_string_pretty(&state)?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(raw.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("writing {}", self.path.display()))?;

        tracing::debug!("saved {} plugins to {}", plugins.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the last saved list in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: RefCell<Option<Vec<PluginRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PluginRecord>) -> Self {
        Self {
            saved: RefCell::new(Some(records)),
        }
    }
}

impl PluginStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<PluginRecord>>> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, plugins: &[PluginDescriptor]) -> Result<()> {
        let records = plugins.iter().cloned().map(PluginRecord::from).collect();
        *self.saved.borrow_mut() = Some(records);
        Ok(())
    }
}
