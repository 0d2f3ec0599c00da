pub mod descriptor;
pub mod host;
pub mod registry;
pub mod selection;
pub mod store;
pub mod validator;

pub use descriptor::{MenuPosition, PluginCandidate, PluginDescriptor, PluginKind, PluginRecord};
pub use host::PluginHost;
pub use registry::PluginRegistry;
pub use selection::{ListRow, SELECTION_CONTRACT_VERSION, SelectionGroup, SelectionMap, flatten};
pub use store::{MemoryStore, PluginStore, TomlFileStore};
pub use validator::{ValidationError, validate};
