//! Built-in macros
//!
//! - [`definition`]: turn a text element's source into a new macro
//! - [`storage`]: save, open and publish scenes
//! - [`path`]: fetch URLs, read files and list directories
//! - [`assist`]: language model completion
//! - [`navigation`]: anchor jumps

pub mod assist;
pub mod definition;
pub mod navigation;
pub mod path;
pub mod storage;

use crate::registry::MacroRegistry;
use std::sync::Arc;

pub use definition::{DefineMacro, DefinitionDialect};

/// Register every built-in macro
///
/// Nothing is registered under the inferred image name (`draw` by
/// default); the scanner reports it as unregistered.
pub fn register_builtins(registry: &MacroRegistry) {
    for dialect in [
        DefinitionDialect::Local,
        DefinitionDialect::Deno,
        DefinitionDialect::Python,
    ] {
        registry.register(dialect.macro_name(), Arc::new(DefineMacro::new(dialect)));
    }

    registry.register("save", Arc::new(storage::Save));
    registry.register("open", Arc::new(storage::Open));
    registry.register("publish", Arc::new(storage::Publish));
    registry.register("fetch", Arc::new(path::Fetch));
    registry.register("cat", Arc::new(path::Cat));
    registry.register("ls", Arc::new(path::List));
    registry.register("complete", Arc::new(assist::Complete));
    registry.register("prompt", Arc::new(assist::PromptCompletion));
    registry.register("jump", Arc::new(navigation::Jump));
}
