//! Infrastructure adapters for graft.
//!
//! This crate implements the ports defined in `graft-core::application::ports`
//! and everything that touches the outside world: TOML rule files, JSON
//! documents, and logging.

pub mod factory;
pub mod json;
pub mod listener;
pub mod rule_loader;
pub mod rule_store;

// Re-export commonly used adapters
pub use factory::{Initializer, PrototypeFactory};
pub use json::{JsonCodec, JsonError, JsonResult};
pub use listener::{Phase, RecordedEvent, RecordingListener, TracingListener};
pub use rule_loader::{LoadedRules, TomlRuleLoader};
pub use rule_store::InMemoryRuleSource;
