//! Plugin registry for a pluggable editor host.
//!
//! The host keeps one authoritative list of plugin descriptors (editors, menu
//! actions and validators). Built-in defaults can be toggled and reset;
//! external plugins can be validated and appended. A grouped, multi-select
//! plugin list reports selections as flat indices, which
//! [`plugin::SelectionMap`] maps back onto the list.

pub mod app;
pub mod model;
pub mod msg;
pub mod plugin;
