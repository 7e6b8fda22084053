//! Correspondence cache.
//!
//! One slot per [`TypePair`]. A slot is an `OnceLock` holding the plan plus a
//! mutex that serializes builders of that key only. Readers of a built slot
//! never touch the mutex; builders of different keys never wait on each
//! other. A failed build leaves the slot empty for the next caller.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use crate::application::ApplicationError;
use crate::application::services::conversion::{ConversionEntry, ConversionRegistry};
use crate::domain::{CorrespondencePlan, DomainError, TypeCatalog, TypeName, TypePair};
use crate::error::GraftResult;

#[derive(Default)]
struct Slot {
    plan: OnceLock<Arc<CorrespondencePlan>>,
    build: Mutex<()>,
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Plans built (successful builds only).
    pub builds: u64,
    /// Lookups answered by an already-built plan.
    pub hits: u64,
    /// Built plans currently held.
    pub plans: usize,
}

/// Per-mapper memo of plans, subtype checks and converter lookups.
#[derive(Default)]
pub struct CorrespondenceCache {
    plans: DashMap<TypePair, Arc<Slot>>,
    subtypes: DashMap<(TypeName, TypeName), bool>,
    converters: DashMap<(TypeName, TypeName), Option<Arc<ConversionEntry>>>,
    builds: AtomicU64,
    hits: AtomicU64,
}

impl CorrespondenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pair: &TypePair) -> Arc<Slot> {
        if let Some(slot) = self.plans.get(pair) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.plans.entry(pair.clone()).or_default().value())
    }

    /// Return the plan for `pair`, running `build` if nobody has built it yet.
    ///
    /// Concurrent callers for the same pair block until the first builder
    /// finishes and then share its plan. If the build fails, the error goes
    /// to the caller that ran it and the next caller builds again.
    pub fn get_or_build<F>(&self, pair: &TypePair, build: F) -> GraftResult<Arc<CorrespondencePlan>>
    where
        F: FnOnce() -> GraftResult<CorrespondencePlan>,
    {
        let slot = self.slot(pair);
        if let Some(plan) = slot.plan.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(plan));
        }

        let _guard = slot
            .build
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?;

        // Someone else may have finished while we waited.
        if let Some(plan) = slot.plan.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(plan));
        }

        debug!(%pair, "Building correspondence plan");
        let plan = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        debug!(%pair, bindings = plan.len(), "Plan cached");

        Ok(Arc::clone(slot.plan.get_or_init(|| plan)))
    }

    /// Built plan for `pair`, without building.
    pub fn get(&self, pair: &TypePair) -> Option<Arc<CorrespondencePlan>> {
        self.plans
            .get(pair)
            .and_then(|slot| slot.plan.get().cloned())
    }

    /// Every built plan, ordered by pair.
    pub fn plans(&self) -> Vec<Arc<CorrespondencePlan>> {
        let mut plans: Vec<_> = self
            .plans
            .iter()
            .filter_map(|entry| entry.value().plan.get().cloned())
            .collect();
        plans.sort_by(|a, b| a.pair.cmp(&b.pair));
        plans
    }

    /// Cached `catalog.is_assignable(candidate, target)`.
    pub fn is_subtype(&self, catalog: &TypeCatalog, candidate: &TypeName, target: &TypeName) -> bool {
        if candidate == target {
            return true;
        }
        let key = (candidate.clone(), target.clone());
        if let Some(known) = self.subtypes.get(&key) {
            return *known;
        }
        let answer = catalog.is_assignable(candidate, target);
        self.subtypes.insert(key, answer);
        answer
    }

    /// Cached `registry.find(..)`. Ambiguity errors are not cached.
    pub fn converter(
        &self,
        registry: &ConversionRegistry,
        catalog: &TypeCatalog,
        source: &TypeName,
        destination: &TypeName,
    ) -> Result<Option<Arc<ConversionEntry>>, DomainError> {
        let key = (source.clone(), destination.clone());
        if let Some(found) = self.converters.get(&key) {
            return Ok(found.clone());
        }
        let found = registry.find(catalog, source, destination)?;
        self.converters.insert(key, found.clone());
        Ok(found)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            builds: self.builds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            plans: self
                .plans
                .iter()
                .filter(|entry| entry.value().plan.get().is_some())
                .count(),
        }
    }
}

impl fmt::Debug for CorrespondenceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrespondenceCache")
            .field("stats", &self.stats())
            .finish()
    }
}
