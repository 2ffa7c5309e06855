//! Type-information providers: the host engine descriptor, project
//! sources, scenes, and autoloaded singletons, federated behind a single
//! `Provider` interface by the Composite Provider (§4).

pub mod autoloads;
pub mod composite;
pub mod default_fallback;
pub mod host_db;
pub mod lazy_inference;
pub mod project_types;
pub mod scene_types;

pub use autoloads::{AutoloadEntry, AutoloadKind, AutoloadsProvider};
pub use composite::CompositeProvider;
pub use default_fallback::DefaultFallbackProvider;
pub use host_db::{HostTypeDbProvider, HostTypeDescriptor, HostTypeEntry};
pub use project_types::{ProjectClass, ProjectMethod, ProjectProperty, ProjectTypesProvider};
pub use scene_types::{ChangeEvent, ConnectionInfo, NodeInfo, NodeRename, SceneInfo, SceneTypesProvider};
