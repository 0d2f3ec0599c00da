use std::sync::mpsc;

use crate::msg::{Notification, Request};
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::registry::PluginRegistry;
use crate::plugin::store::PluginStore;
use crate::plugin::validator::ValidationError;

/// Single-threaded dispatcher between a plugin manager surface and the registry.
///
/// Each request is handled to completion, including persistence, before
/// `handle` returns.
pub struct PluginHost {
    registry: PluginRegistry,
    store: Box<dyn PluginStore>,
    events: mpsc::Receiver<Notification>,
    installer_open: bool,
}

impl PluginHost {
    /// Loads persisted state from `store` on top of `defaults`.
    ///
    /// A store that fails to load is logged and treated as empty.
    pub fn new(
        defaults: Vec<PluginDescriptor>,
        store: Box<dyn PluginStore>,
    ) -> Result<Self, ValidationError> {
        let (tx, rx) = mpsc::channel();
        let mut registry = PluginRegistry::new(defaults)?;

        match store.load() {
            Ok(Some(persisted)) => registry.restore(&persisted),
            Ok(None) => {}
            Err(err) => tracing::warn!("ignoring persisted plugin state: {err:#}"),
        }

        Ok(Self {
            registry: registry.with_notifier(tx),
            store,
            events: rx,
            installer_open: false,
        })
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        self.registry.list()
    }

    pub fn installer_open(&self) -> bool {
        self.installer_open
    }

    /// Applies one request and returns the notifications it produced, in order.
    pub fn handle(&mut self, request: Request) -> Vec<Notification> {
        tracing::debug!("plugin request: {request:?}");

        let mut notifications = Vec::new();
        match request {
            Request::RequestOpenInstaller => {
                self.installer_open = true;
                notifications.push(Notification::InstallerOpened);
            }
            Request::CloseInstaller => {
                self.installer_open = false;
                notifications.push(Notification::InstallerClosed);
            }
            Request::SetPlugins(selected) => self.registry.set_installed(&selected),
            Request::ResetPlugins => self.registry.reset(),
            Request::AddExternalPlugin(candidate) => {
                if let Err(err) = self.registry.add_external(candidate) {
                    notifications.push(Notification::PluginRejected(err));
                    return self.drain_into(notifications);
                }
                self.installer_open = false;
                let mut drained = self.drain_into(Vec::new());
                drained.push(Notification::InstallerClosed);
                return drained;
            }
        }

        self.drain_into(notifications)
    }

    fn drain_into(&mut self, mut notifications: Vec<Notification>) -> Vec<Notification> {
        for notification in self.events.try_iter() {
            if let Notification::StateChanged(plugins) = &notification {
                self.persist(plugins);
            }
            notifications.push(notification);
        }
        notifications
    }

    fn persist(&self, plugins: &[PluginDescriptor]) {
        if let Err(err) = self.store.save(plugins) {
            tracing::warn!("failed to persist plugin state: {err:#}");
        }
    }
}
