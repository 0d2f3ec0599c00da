//! Mapping between the grouped plugin list a user sees and registry positions.
//!
//! The plugin list is rendered as visual groups separated by header and
//! divider rows, but a multi-select surface only numbers its selectable items.
//! Those item numbers ("flat indices") follow the group order in
//! [`SelectionGroup::ORDER`]; within a group, registry order is kept. Changing
//! the groups or their order breaks every stored or in-flight selection, so it
//! must bump [`SELECTION_CONTRACT_VERSION`].

use std::collections::BTreeSet;

use crate::plugin::descriptor::{MenuPosition, PluginDescriptor, PluginKind};

/// Version of the group order below.
pub const SELECTION_CONTRACT_VERSION: u32 = 1;

/// One visual group of the plugin list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionGroup {
    Editor,
    MenuTop,
    Validator,
    MenuMiddle,
    MenuBottom,
}

impl SelectionGroup {
    pub const ORDER: [SelectionGroup; 5] = [
        SelectionGroup::Editor,
        SelectionGroup::MenuTop,
        SelectionGroup::Validator,
        SelectionGroup::MenuMiddle,
        SelectionGroup::MenuBottom,
    ];

    pub fn of(descriptor: &PluginDescriptor) -> Self {
        match descriptor.kind {
            PluginKind::Editor => SelectionGroup::Editor,
            PluginKind::Validator => SelectionGroup::Validator,
            PluginKind::Menu { position, .. } => match position {
                MenuPosition::Top => SelectionGroup::MenuTop,
                MenuPosition::Middle => SelectionGroup::MenuMiddle,
                MenuPosition::Bottom => SelectionGroup::MenuBottom,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SelectionGroup::Editor => "editor",
            SelectionGroup::MenuTop => "top",
            SelectionGroup::Validator => "validator",
            SelectionGroup::MenuMiddle => "middle",
            SelectionGroup::MenuBottom => "bottom",
        }
    }
}

/// A row of the grouped plugin list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRow {
    /// Non-selectable group heading ("editor" or "menu").
    Header(&'static str),
    /// Non-selectable separator; inset separators split groups under one heading.
    Divider { inset: bool },
    /// Selectable plugin row.
    Item { flat: usize, registry: usize },
}

impl ListRow {
    pub fn is_selectable(&self) -> bool {
        matches!(self, ListRow::Item { .. })
    }
}

/// The flattened selectable ordering of one registry snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMap {
    /// Registry position of each flat index.
    order: Vec<usize>,
}

impl SelectionMap {
    pub fn new(plugins: &[PluginDescriptor]) -> Self {
        let order = SelectionGroup::ORDER
            .iter()
            .flat_map(|group| {
                plugins
                    .iter()
                    .enumerate()
                    .filter(move |(_, plugin)| SelectionGroup::of(plugin) == *group)
                    .map(|(idx, _)| idx)
            })
            .collect();

        Self { order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registry position for a flat index, `None` when out of range.
    pub fn registry_index(&self, flat: usize) -> Option<usize> {
        self.order.get(flat).copied()
    }

    /// Flat index of a registry position.
    pub fn flat_index(&self, registry: usize) -> Option<usize> {
        self.order.iter().position(|idx| *idx == registry)
    }

    /// Descriptors in flattened order.
    pub fn descriptors<'a>(&self, plugins: &'a [PluginDescriptor]) -> Vec<&'a PluginDescriptor> {
        self.order.iter().filter_map(|idx| plugins.get(*idx)).collect()
    }

    /// Flat indices of the installed descriptors.
    pub fn selected(&self, plugins: &[PluginDescriptor]) -> BTreeSet<usize> {
        self.order
            .iter()
            .enumerate()
            .filter(|(_, idx)| plugins.get(**idx).is_some_and(|plugin| plugin.installed))
            .map(|(flat, _)| flat)
            .collect()
    }

    /// Visual rows for the grouped list, headers and dividers included.
    pub fn rows(&self, plugins: &[PluginDescriptor]) -> Vec<ListRow> {
        let mut rows = Vec::with_capacity(self.order.len() + 8);
        let mut flat = 0;

        for group in SelectionGroup::ORDER {
            match group {
                SelectionGroup::Editor => {
                    rows.push(ListRow::Header("editor"));
                    rows.push(ListRow::Divider { inset: false });
                }
                SelectionGroup::MenuTop => {
                    rows.push(ListRow::Header("menu"));
                    rows.push(ListRow::Divider { inset: false });
                }
                _ => rows.push(ListRow::Divider { inset: true }),
            }

            while let Some(registry) = self.order.get(flat).copied() {
                let in_group = plugins
                    .get(registry)
                    .is_some_and(|plugin| SelectionGroup::of(plugin) == group);
                if !in_group {
                    break;
                }
                rows.push(ListRow::Item { flat, registry });
                flat += 1;
            }
        }

        rows
    }
}

/// Descriptors of `plugins` in flattened order.
pub fn flatten(plugins: &[PluginDescriptor]) -> Vec<&PluginDescriptor> {
    SelectionMap::new(plugins).descriptors(plugins)
}
