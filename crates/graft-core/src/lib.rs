//! graft core - object-graph mapping engine.
//!
//! This crate provides the domain and application layers of graft, following
//! hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            graft-cli (CLI)              │
//! │        check / plans / map              │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │   Mapper → RuleResolver → Executor      │
//! │   ConversionRegistry, Correspondence    │
//! │   Cache                                 │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ RuleSource, ObjectFactory, Listener     │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     graft-adapters (Infrastructure)     │
//! │ TomlRuleLoader, PrototypeFactory, JSON  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Data)        │
//! │ TypeCatalog, ObjectArena, RuleSet, Plan │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use graft_core::prelude::*;
//!
//! let catalog = TypeCatalog::builder()
//!     .register(TypeDescriptor::bean("Order").with_single("total", "string"))
//!     .register(TypeDescriptor::bean("OrderRow").with_single("total", "float"))
//!     .build()
//!     .unwrap();
//!
//! let mapper = Mapper::new(catalog);
//! let mut arena = ObjectArena::new();
//! let order = arena.instantiate(mapper.catalog(), "Order").unwrap();
//! arena.set_field(order, "total", "12.5").unwrap();
//!
//! let row = mapper.map(&mut arena, Some(order), "OrderRow").unwrap().unwrap();
//! assert_eq!(arena.field(row, "total").unwrap(), &Value::Float(12.5));
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ConversionContext, Converter, FnConverter, Mapper, MapperBuilder, MappingMetadata,
        ports::{FieldMapper, MappingEvent, MappingListener, ObjectFactory, RuleSource},
    };
    pub use crate::domain::{
        ClassRule, CorrespondencePlan, FieldBinding, FieldRule, FieldShape, GlobalConfiguration, MapId,
        NullPolicy, ObjectArena, ObjectId, RuleSet, ScalarKind, TypeCatalog, TypeDescriptor,
        TypeName, TypePair, Value,
    };
    pub use crate::error::{GraftError, GraftResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
