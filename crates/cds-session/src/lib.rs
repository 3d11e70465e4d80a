pub mod model;
pub mod definition;
pub mod store;
pub mod generator;
mod env;

// re-export
pub use crate::model::{Session, Round, Task, RoundKind, Matrix, Vector};
pub use crate::definition::{SessionDefinition, RoundDefinition, TaskDefinition, LoadError};
pub use crate::store::{DefinitionSource, FsDefinitionSource, MemoryDefinitionSource, SessionStore};
pub use crate::generator::{GeneratorConfig, generate_session};
pub use crate::env::EnvironmentVar;
