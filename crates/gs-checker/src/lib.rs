//! Inference Engine and Runtime Type Injector (§4.6, §4.8): the component
//! that actually answers "what is the type of this expression", built on
//! top of the federated `Provider` graph from `gs-providers`.

pub mod engine;
pub mod injector;
pub mod inheritance;
pub mod lambda;
pub mod operators;
pub mod reports;
pub mod scope;
pub mod type_node;

pub use engine::{ContainerTypeProvider, ExpectedTypeContext, InferenceEngine, NarrowingTypeProvider, SymbolLookupFallback};
pub use injector::RuntimeTypeInjector;
pub use lambda::CallSiteRegistry;
pub use scope::{ScopeKind, ScopeStack, Symbol, SymbolKind};
pub use type_node::TypeNode;
