//! Application services - the mapping engine.
//!
//! Leaf-first: conversion registry, correspondence cache, rule resolver,
//! mapping executor, and the `Mapper` that ties them together.

pub mod cache;
pub mod conversion;
pub mod executor;
pub mod mapper;
pub mod resolver;

pub use cache::{CacheStats, CorrespondenceCache};
pub use conversion::{ConversionContext, ConversionEntry, ConversionRegistry, Converter, FnConverter};
pub use executor::{MappingExecutor, VisitedSet};
pub use mapper::{BlankObjectFactory, Engine, Mapper, MapperBuilder, MappingMetadata};
pub use resolver::RuleResolver;
