// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for graft.
//!
//! This module contains the data the engine works on: the type catalog, the
//! object arena, mapping rules and resolved plans. All behaviour that needs
//! caching, conversion or concurrency lives in `crate::application`.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **No logging**: Observability belongs to the application layer
//! - **Immutable plans**: Built once, shared behind `Arc`
//!
// Public API - what the world sees
pub mod entities;
pub mod error;
pub mod value_objects;

// Private implementation details - not visible outside domain
mod validation;

// Re-exports for convenience
pub use entities::{
    descriptor::{FieldDescriptor, FieldShape, TypeCatalog, TypeCatalogBuilder, TypeDescriptor, TypeKind},
    object::{ObjectArena, ObjectData, ObjectId, Value},
    plan::{BindingOrigin, CorrespondencePlan, FieldBinding, FieldPath, PathStep, TypePair},
    rule::{
        ClassRule, DEFAULT_DATE_FORMAT, DirectedField, DirectedRule, FieldExclude, FieldRule,
        GlobalConfiguration, RuleSet, check_date_format, format_date,
    },
};

pub use error::{DomainError, ErrorCategory};

pub use value_objects::{ContainerStrategy, MapId, NullPolicy, ScalarKind, TypeName};

pub use validation::DomainValidator;
