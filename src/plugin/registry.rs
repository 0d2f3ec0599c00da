use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::mpsc;

use crate::msg::Notification;
use crate::plugin::descriptor::{PluginCandidate, PluginDescriptor, PluginRecord, source_key};
use crate::plugin::selection::SelectionMap;
use crate::plugin::validator::{self, ValidationError};

/// Owner of the plugin list.
///
/// Descriptors are kept in one sequence: the defaults given at construction,
/// then externally added plugins in the order they were added. Every mutation
/// is applied completely before a `StateChanged` notification is sent.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
    defaults: Vec<PluginDescriptor>,
    notifier: Option<mpsc::Sender<Notification>>,
}

impl PluginRegistry {
    /// Builds a registry from the host's default plugins, all marked official.
    pub fn new(defaults: Vec<PluginDescriptor>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        let mut checked = Vec::with_capacity(defaults.len());

        for default in defaults {
            let candidate = PluginCandidate::from(default.clone());
            let mut descriptor = validator::validate(&candidate)?;
            if !seen.insert(descriptor.source_key()) {
                return Err(ValidationError::DuplicateSource(descriptor.src));
            }
            descriptor.installed = default.installed;
            descriptor.official = true;
            checked.push(descriptor);
        }

        tracing::debug!("plugin registry created with {} defaults", checked.len());

        Ok(Self {
            plugins: checked.clone(),
            defaults: checked,
            notifier: None,
        })
    }

    /// Sends a `StateChanged` snapshot after every mutation.
    pub fn with_notifier(mut self, notifier: mpsc::Sender<Notification>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Applies persisted state on top of the defaults.
    ///
    /// A record whose source matches a default only carries its `installed`
    /// flag, so `{src, installed}` pairs are enough for official plugins.
    /// Other records are validated one at a time and appended as externals.
    /// Records that fail validation, duplicate a source, or are marked
    /// official without matching a default are skipped.
    pub fn restore(&mut self, persisted: &[PluginRecord]) {
        for record in persisted {
            let src = record.candidate.src.trim();
            let key = source_key(src);

            let default = self
                .plugins
                .iter_mut()
                .find(|p| p.official && p.source_key() == key);
            if let Some(plugin) = default {
                plugin.installed = record.installed;
                continue;
            }

            if record.official {
                tracing::warn!("dropping persisted plugin {src}: no longer a default");
                continue;
            }

            match self.check_external(&record.candidate) {
                Ok(mut descriptor) => {
                    descriptor.installed = record.installed;
                    self.plugins.push(descriptor);
                }
                Err(err) => tracing::warn!("dropping persisted plugin {src:?}: {err}"),
            }
        }
    }

    /// Current plugins in registry order.
    pub fn list(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    pub fn snapshot(&self) -> Vec<PluginDescriptor> {
        self.plugins.clone()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn find(&self, src: &str) -> Option<&PluginDescriptor> {
        let key = source_key(src);
        self.plugins.iter().find(|plugin| plugin.source_key() == key)
    }

    /// Installed editor plugins.
    pub fn editors(&self) -> Vec<&PluginDescriptor> {
        self.installed_where(|plugin| plugin.kind.is_editor())
    }

    /// Installed menu plugins.
    pub fn menu_entries(&self) -> Vec<&PluginDescriptor> {
        self.installed_where(|plugin| plugin.kind.is_menu())
    }

    /// Installed validator plugins.
    pub fn validators(&self) -> Vec<&PluginDescriptor> {
        self.installed_where(|plugin| plugin.kind.is_validator())
    }

    /// Installs exactly the plugins whose flat index is in `selected`.
    ///
    /// Everything else is uninstalled. Indices past the end of the flattened
    /// list are ignored.
    pub fn set_installed(&mut self, selected: &BTreeSet<usize>) {
        let map = SelectionMap::new(&self.plugins);

        if let Some(max) = selected.last().filter(|max| **max >= map.len()) {
            tracing::debug!(
                "ignoring selection indices up to {max} (list has {})",
                map.len()
            );
        }

        for flat in 0..map.len() {
            if let Some(plugin) = map
                .registry_index(flat)
                .and_then(|idx| self.plugins.get_mut(idx))
            {
                plugin.installed = selected.contains(&flat);
            }
        }

        tracing::info!(
            "plugin selection applied: {} of {} installed",
            self.plugins.iter().filter(|p| p.installed).count(),
            self.plugins.len()
        );
        self.notify();
    }

    /// Validates and appends an external plugin, installed.
    pub fn add_external(&mut self, candidate: PluginCandidate) -> Result<(), ValidationError> {
        let mut descriptor = match self.check_external(&candidate) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!("rejected external plugin {:?}: {err}", candidate.src);
                return Err(err);
            }
        };

        descriptor.installed = true;
        descriptor.official = false;
        tracing::info!(
            "added external {} plugin {} ({})",
            descriptor.kind,
            descriptor.name,
            descriptor.src
        );
        self.plugins.push(descriptor);
        self.notify();
        Ok(())
    }

    /// Drops every external plugin and restores the defaults' `installed` flags.
    pub fn reset(&mut self) {
        let removed = self.plugins.iter().filter(|p| !p.official).count();
        self.plugins = self.defaults.clone();
        tracing::info!("plugins reset to defaults ({removed} external removed)");
        self.notify();
    }

    fn check_external(
        &self,
        candidate: &PluginCandidate,
    ) -> Result<PluginDescriptor, ValidationError> {
        let descriptor = validator::validate(candidate)?;
        if self.find(&descriptor.src).is_some() {
            return Err(ValidationError::DuplicateSource(descriptor.src));
        }
        Ok(descriptor)
    }

    fn installed_where(
        &self,
        predicate: impl Fn(&PluginDescriptor) -> bool,
    ) -> Vec<&PluginDescriptor> {
        self.plugins
            .iter()
            .filter(|plugin| plugin.installed && predicate(plugin))
            .collect()
    }

    fn notify(&self) {
        let Some(notifier) = self.notifier.as_ref() else {
            return;
        };

        if notifier.send(Notification::StateChanged(self.snapshot())).is_err() {
            tracing::debug!("plugin state listener disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::descriptor::{MenuPosition, PluginKind};

    fn official(name: &str, kind: PluginKind, installed: bool) -> PluginDescriptor {
        PluginDescriptor {
            name: name.to_string(),
            src: format!("https://plugins.example.com/{name}.js"),
            kind,
            installed,
            official: true,
            icon: None,
        }
    }

    fn six_editors() -> Vec<PluginDescriptor> {
        (1..=6)
            .map(|n| official(&format!("editor-{n}"), PluginKind::Editor, true))
            .collect()
    }

    fn grouped() -> Vec<PluginDescriptor> {
        let menu = |position| PluginKind::Menu {
            position,
            require_doc: true,
        };
        vec![
            official("bottom", menu(MenuPosition::Bottom), true),
            official("editor-a", PluginKind::Editor, true),
            official("validator-a", PluginKind::Validator, true),
            official("top", menu(MenuPosition::Top), true),
            official("editor-b", PluginKind::Editor, false),
            official("middle", menu(MenuPosition::Middle), true),
            official("validator-b", PluginKind::Validator, false),
        ]
    }

    fn installed_names(registry: &PluginRegistry) -> Vec<&str> {
        registry
            .list()
            .iter()
            .filter(|p| p.installed)
            .map(|p| p.name.as_str())
            .collect()
    }

    #[test]
    fn new_marks_defaults_official() {
        let mut defaults = six_editors();
        defaults[0].official = false;

        let registry = PluginRegistry::new(defaults).unwrap();
        assert!(registry.list().iter().all(|p| p.official));
        assert_eq!(registry.editors().len(), 6);
    }

    #[test]
    fn new_rejects_duplicate_default_sources() {
        let mut defaults = six_editors();
        defaults[1].src = defaults[0].src.clone();

        assert!(matches!(
            PluginRegistry::new(defaults),
            Err(ValidationError::DuplicateSource(_))
        ));
    }

    #[test]
    fn set_installed_overwrites_every_flag() {
        let mut registry = PluginRegistry::new(grouped()).unwrap();

        // flat: editor-a, editor-b, top, validator-a, validator-b, middle, bottom
        registry.set_installed(&BTreeSet::from([0, 1, 4]));

        assert_eq!(
            installed_names(&registry),
            vec!["editor-a", "editor-b", "validator-b"]
        );
    }

    #[test]
    fn set_installed_ignores_out_of_range_indices() {
        let mut registry = PluginRegistry::new(grouped()).unwrap();
        registry.set_installed(&BTreeSet::from([2, 7, 100]));
        assert_eq!(installed_names(&registry), vec!["top"]);
    }

    #[test]
    fn add_external_appends_installed_external() {
        let mut registry = PluginRegistry::new(six_editors()).unwrap();
        registry
            .add_external(PluginCandidate::new(
                "testName",
                "http://example.com/plugin.js",
                "editor",
            ))
            .unwrap();

        assert_eq!(registry.len(), 7);
        let added = &registry.list()[6];
        assert!(added.installed);
        assert!(!added.official);
        assert_eq!(registry.editors().len(), 7);
    }

    #[test]
    fn add_external_rejects_duplicate_source() {
        let mut registry = PluginRegistry::new(six_editors()).unwrap();
        let src = registry.list()[0].src.clone();

        let before = registry.snapshot();
        let result = registry.add_external(PluginCandidate::new("again", src.clone(), "editor"));

        assert_eq!(result, Err(ValidationError::DuplicateSource(src)));
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn duplicate_detection_uses_normalized_source() {
        let mut registry = PluginRegistry::new(six_editors()).unwrap();
        registry
            .add_external(PluginCandidate::new("x", "http://x.com", "validator"))
            .unwrap();

        let result = registry.add_external(PluginCandidate::new("y", "http://x.com/", "validator"));
        assert!(matches!(result, Err(ValidationError::DuplicateSource(_))));
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn reset_restores_load_time_defaults() {
        let mut registry = PluginRegistry::new(grouped()).unwrap();
        let defaults = registry.snapshot();

        registry.set_installed(&BTreeSet::new());
        registry
            .add_external(PluginCandidate::new("ext", "https://ext.example.com/p.js", "menu"))
            .unwrap();
        registry.reset();

        assert_eq!(registry.snapshot(), defaults);
        registry.reset();
        assert_eq!(registry.snapshot(), defaults);
    }

    fn external_record(name: &str, src: &str, installed: bool) -> PluginRecord {
        PluginRecord {
            candidate: PluginCandidate::new(name, src, "validator"),
            installed,
            official: false,
        }
    }

    #[test]
    fn restore_overrides_official_and_readds_externals() {
        let mut registry = PluginRegistry::new(six_editors()).unwrap();

        let mut persisted: Vec<PluginRecord> =
            registry.snapshot().into_iter().map(PluginRecord::from).collect();
        persisted[2].installed = false;
        persisted.push(external_record("ext", "https://ext.example.com/p.js", false));
        persisted.push(PluginRecord::from(official("gone", PluginKind::Editor, true)));

        registry.restore(&persisted);

        assert_eq!(registry.len(), 7);
        assert!(!registry.list()[2].installed);
        assert!(!registry.list()[6].installed);
        assert!(!registry.list()[6].official);
        assert!(registry.find("https://plugins.example.com/gone.js").is_none());

        registry.reset();
        assert_eq!(registry.len(), 6);
        assert!(registry.list().iter().all(|p| p.installed));
    }

    #[test]
    fn restore_skips_bad_records_and_keeps_the_rest() {
        let mut registry = PluginRegistry::new(six_editors()).unwrap();
        let official_src = registry.list()[1].src.clone();

        let persisted = vec![
            PluginRecord::from(PluginDescriptor {
                installed: false,
                ..registry.list()[1].clone()
            }),
            external_record("broken", "notaURL", true),
            external_record("kept", "https://ext.example.com/kept.js", true),
            external_record("", "https://ext.example.com/unnamed.js", true),
            external_record("again", "https://ext.example.com/kept.js", true),
        ];

        registry.restore(&persisted);

        assert_eq!(registry.len(), 7);
        assert!(!registry.find(&official_src).unwrap().installed);
        let kept = registry.find("https://ext.example.com/kept.js").unwrap();
        assert_eq!(kept.name, "kept");
        assert!(registry.find("https://ext.example.com/unnamed.js").is_none());
    }

    #[test]
    fn restore_accepts_source_and_flag_pairs_for_defaults() {
        let mut registry = PluginRegistry::new(six_editors()).unwrap();
        let pair = |src: &str, installed| PluginRecord {
            candidate: PluginCandidate {
                src: src.to_string(),
                ..PluginCandidate::default()
            },
            installed,
            official: false,
        };

        let persisted = vec![
            pair(&registry.list()[0].src, false),
            pair(&format!(" {} ", registry.list()[4].src), false),
            pair("https://unknown.example.com/p.js", false),
        ];
        registry.restore(&persisted);

        let installed: Vec<bool> = registry.list().iter().map(|p| p.installed).collect();
        assert_eq!(installed, vec![false, true, true, true, false, true]);
    }

    #[test]
    fn mutations_notify_with_snapshot_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut registry = PluginRegistry::new(six_editors()).unwrap().with_notifier(tx);

        registry.set_installed(&BTreeSet::from([0]));
        registry
            .add_external(PluginCandidate::new("n", "http://example.com/n.js", "editor"))
            .unwrap();
        let _ = registry.add_external(PluginCandidate::new("", "http://x.com", "editor"));
        registry.reset();

        let lengths: Vec<usize> = rx
            .try_iter()
            .map(|notification| match notification {
                Notification::StateChanged(plugins) => plugins.len(),
                other => panic!("unexpected notification {other:?}"),
            })
            .collect();
        assert_eq!(lengths, vec![6, 7, 6]);
    }
}
