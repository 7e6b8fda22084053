//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the engine needs from external systems.
//! The `graft-adapters` crate provides implementations.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{FieldBinding, MapId, ObjectArena, ObjectId, RuleSet, TypeDescriptor, TypePair, Value};
use crate::error::GraftResult;

/// Port for mapping rule loading.
///
/// Implemented by:
/// - `graft_adapters::TomlRuleLoader` (mapping files on disk)
/// - `graft_adapters::InMemoryRuleSource` (programmatic rules, tests)
///
/// ## Design Notes
///
/// - Called at most once per successful mapper initialization
/// - Every source's rules are merged in registration order
/// - A failed load leaves the mapper uninitialized; the next call retries
#[cfg_attr(test, mockall::automock)]
pub trait RuleSource: Send + Sync {
    /// Human-readable origin, used in logs and error messages.
    fn name(&self) -> String;

    /// Produce the rules this source contributes.
    fn load(&self) -> GraftResult<RuleSet>;
}

/// Port for destination instance creation.
///
/// Implemented by:
/// - `graft_core::application::BlankObjectFactory` (default, all fields null)
/// - `graft_adapters::PrototypeFactory` (per type / map-id initializers)
#[cfg_attr(test, mockall::automock)]
pub trait ObjectFactory: Send + Sync {
    /// Create an instance of `descriptor` inside `arena`.
    ///
    /// `map_id` is the mapping context of the call, so builder-style
    /// factories can produce differently-initialised instances per context.
    fn create<'a>(
        &self,
        arena: &mut ObjectArena,
        descriptor: &Arc<TypeDescriptor>,
        map_id: Option<&'a MapId>,
    ) -> GraftResult<ObjectId>;
}

/// Payload handed to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEvent {
    /// Identifies the public `map` call the event belongs to.
    pub call_id: Uuid,
    pub pair: TypePair,
    pub source: ObjectId,
    pub destination: ObjectId,
}

/// Port for mapping notifications.
///
/// Listeners are fire-and-forget: they observe, they never change what the
/// engine does.
#[cfg_attr(test, mockall::automock)]
pub trait MappingListener: Send + Sync {
    fn before_mapping(&self, event: &MappingEvent);

    fn after_mapping(&self, event: &MappingEvent);
}

/// Port for taking over individual fields.
///
/// Consulted for every binding once the source value has been read and
/// before null handling or conversion. Returning `true` means the field is
/// done and the engine leaves it alone; `false` hands it back.
#[cfg_attr(test, mockall::automock)]
pub trait FieldMapper: Send + Sync {
    fn map_field(
        &self,
        arena: &mut ObjectArena,
        source: ObjectId,
        destination: ObjectId,
        binding: &FieldBinding,
        value: &Value,
    ) -> GraftResult<bool>;
}
