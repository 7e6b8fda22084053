//! Application layer for graft.
//!
//! This layer contains:
//! - **Services**: The engine (Mapper, RuleResolver, MappingExecutor, caches)
//! - **Ports**: Interface definitions (traits) for external collaborators
//! - **Errors**: Failures while executing a mapping call
//!
//! Rule records, descriptors and plans live in `crate::domain`; this layer
//! decides which plan applies and runs it.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    BlankObjectFactory, CacheStats, ConversionContext, ConversionEntry, ConversionRegistry,
    Converter, CorrespondenceCache, Engine, FnConverter, Mapper, MapperBuilder, MappingExecutor,
    MappingMetadata, RuleResolver, VisitedSet,
};

// Re-export port traits (for adapter implementation)
pub use ports::{FieldMapper, MappingEvent, MappingListener, ObjectFactory, RuleSource};

pub use error::{ApplicationError, ConversionError};
