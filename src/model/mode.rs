/// Host interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Plugin list: browse and toggle plugins.
    #[default]
    PluginList,
    /// Add-plugin form over the list.
    Installer,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::PluginList => "PLUGINS",
            Mode::Installer => "ADD",
        }
    }
}
