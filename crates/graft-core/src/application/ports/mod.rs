//! Application ports (traits) for external collaborators.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `graft-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by the engine, implemented by infrastructure
//!   - `RuleSource`: Produces the mapping rule set (loaded once, lazily)
//!   - `ObjectFactory`: Creates destination instances
//!   - `MappingListener`: Before/after notifications
//!   - `FieldMapper`: Per-field override consulted before the engine
//!
//! - **Driving (Input) Ports**: Called by the outside world
//!   - `Mapper` itself (see `application::services`)

pub mod output;

pub use output::{FieldMapper, MappingEvent, MappingListener, ObjectFactory, RuleSource};
