//! Top-level mapper: the public entry point of the engine.
//!
//! A [`Mapper`] is configured with rule sources, converters, an object
//! factory and listeners, then shared (`Arc<Mapper>`) across threads. The
//! first mapping call loads every rule source exactly once and freezes the
//! configuration into an [`Engine`]. A failed load leaves the mapper
//! uninitialized, so the next call tries again.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info, instrument};

use crate::application::ports::{FieldMapper, MappingListener, ObjectFactory, RuleSource};
use crate::application::services::cache::{CacheStats, CorrespondenceCache};
use crate::application::services::conversion::{ConversionEntry, ConversionRegistry, Converter};
use crate::application::services::executor::MappingExecutor;
use crate::application::services::resolver::RuleResolver;
use crate::application::ApplicationError;
use crate::domain::{
    CorrespondencePlan, DirectedRule, DomainError, DomainValidator, GlobalConfiguration, MapId,
    ObjectArena, ObjectId, RuleSet, TypeCatalog, TypeDescriptor, TypeName, TypePair, Value,
};
use crate::error::{GraftError, GraftResult};

// ── Default factory ──────────────────────────────────────────────────────────

/// Allocates an instance with every field null.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankObjectFactory;

impl ObjectFactory for BlankObjectFactory {
    fn create(
        &self,
        arena: &mut ObjectArena,
        descriptor: &Arc<TypeDescriptor>,
        _map_id: Option<&MapId>,
    ) -> GraftResult<ObjectId> {
        Ok(arena.alloc(Arc::clone(descriptor))?)
    }
}

/// Rule source over a fixed rule set.
struct StaticRules(RuleSet);

impl RuleSource for StaticRules {
    fn name(&self) -> String {
        "inline rules".into()
    }

    fn load(&self) -> GraftResult<RuleSet> {
        Ok(self.0.clone())
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Frozen configuration plus caches. Exists once the mapper is initialized.
pub struct Engine {
    catalog: Arc<TypeCatalog>,
    rules: Vec<DirectedRule>,
    configuration: GlobalConfiguration,
    registry: ConversionRegistry,
    cache: CorrespondenceCache,
    factory: Arc<dyn ObjectFactory>,
    listeners: Vec<Arc<dyn MappingListener>>,
    field_mapper: Option<Arc<dyn FieldMapper>>,
}

impl Engine {
    fn initialize(catalog: Arc<TypeCatalog>, settings: &Settings) -> GraftResult<Self> {
        let mut merged = RuleSet::new();
        for source in &settings.sources {
            let name = source.name();
            debug!(source = %name, "Loading rules");
            let rules = source.load()?;
            merged.merge(rules)?;
        }
        DomainValidator::validate_against_catalog(&merged, &catalog)?;

        let rules = merged.directed_rules();
        info!(
            sources = settings.sources.len(),
            class_rules = merged.len(),
            directed_rules = rules.len(),
            "Mapper initialized"
        );

        Ok(Self {
            catalog,
            rules,
            configuration: merged.configuration(),
            registry: settings.registry.clone(),
            cache: CorrespondenceCache::new(),
            factory: Arc::clone(&settings.factory),
            listeners: settings.listeners.clone(),
            field_mapper: settings.field_mapper.clone(),
        })
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn configuration(&self) -> &GlobalConfiguration {
        &self.configuration
    }

    pub fn registry(&self) -> &ConversionRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CorrespondenceCache {
        &self.cache
    }

    pub fn listeners(&self) -> &[Arc<dyn MappingListener>] {
        &self.listeners
    }

    pub fn field_mapper(&self) -> Option<&dyn FieldMapper> {
        self.field_mapper.as_deref()
    }

    /// Directed views of every loaded class rule.
    pub fn rules(&self) -> &[DirectedRule] {
        &self.rules
    }

    /// Cached plan for `pair`, resolved on first use.
    pub fn plan(&self, pair: &TypePair) -> GraftResult<Arc<CorrespondencePlan>> {
        self.cache.get_or_build(pair, || {
            RuleResolver::new(
                &self.catalog,
                &self.rules,
                &self.configuration,
                &self.registry,
                &self.cache,
            )
            .resolve(pair)
        })
    }

    pub fn is_subtype(&self, candidate: &TypeName, target: &TypeName) -> bool {
        self.cache.is_subtype(&self.catalog, candidate, target)
    }

    /// Both types are scalars with the same storage kind.
    pub fn same_scalar_kind(&self, a: &TypeName, b: &TypeName) -> bool {
        let kind = |n: &TypeName| self.catalog.get(n).and_then(|d| d.scalar_kind());
        matches!((kind(a), kind(b)), (Some(x), Some(y)) if x == y)
    }

    pub fn converter(
        &self,
        source: &TypeName,
        destination: &TypeName,
    ) -> Result<Option<Arc<ConversionEntry>>, DomainError> {
        self.cache
            .converter(&self.registry, &self.catalog, source, destination)
    }

    /// Create an instance through the factory and check its type.
    pub fn create(
        &self,
        arena: &mut ObjectArena,
        descriptor: &Arc<TypeDescriptor>,
        map_id: Option<&MapId>,
    ) -> GraftResult<ObjectId> {
        let type_name = descriptor.name();
        let created = self
            .factory
            .create(arena, descriptor, map_id)
            .map_err(|e| match e {
                GraftError::Application(ApplicationError::Creation { .. }) => e,
                other => ApplicationError::Creation {
                    type_name: type_name.to_string(),
                    reason: other.to_string(),
                }
                .into(),
            })?;

        match arena.type_of(created) {
            Some(actual) if self.is_subtype(actual, type_name) => Ok(created),
            actual => Err(ApplicationError::Creation {
                type_name: type_name.to_string(),
                reason: format!(
                    "factory returned an instance of '{}'",
                    actual.map(TypeName::as_str).unwrap_or("<missing>")
                ),
            }
            .into()),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.rules.len())
            .field("configuration", &self.configuration)
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .field("listeners", &self.listeners.len())
            .field("field_mapper", &self.field_mapper.is_some())
            .finish()
    }
}

// ── Mapper ───────────────────────────────────────────────────────────────────

/// Everything that can still change before the first mapping call.
struct Settings {
    sources: Vec<Arc<dyn RuleSource>>,
    registry: ConversionRegistry,
    factory: Arc<dyn ObjectFactory>,
    listeners: Vec<Arc<dyn MappingListener>>,
    field_mapper: Option<Arc<dyn FieldMapper>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            registry: ConversionRegistry::with_builtins(),
            factory: Arc::new(BlankObjectFactory),
            listeners: Vec::new(),
            field_mapper: None,
        }
    }
}

/// Every plan resolved so far, ordered by type pair.
#[derive(Debug, Clone, Default)]
pub struct MappingMetadata {
    plans: Vec<Arc<CorrespondencePlan>>,
}

impl MappingMetadata {
    pub fn plans(&self) -> &[Arc<CorrespondencePlan>] {
        &self.plans
    }

    pub fn pairs(&self) -> impl Iterator<Item = &TypePair> {
        self.plans.iter().map(|p| &p.pair)
    }

    pub fn plan_for(&self, source: &str, destination: &str) -> Option<&Arc<CorrespondencePlan>> {
        self.plans
            .iter()
            .find(|p| p.pair.source.as_str() == source && p.pair.destination.as_str() == destination)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Maps objects between types of one [`TypeCatalog`].
///
/// # Example
///
/// ```rust
/// use graft_core::prelude::*;
///
/// let catalog = TypeCatalog::builder()
///     .register(TypeDescriptor::bean("Person").with_single("name", "string"))
///     .register(TypeDescriptor::bean("PersonDto").with_single("fullName", "string"))
///     .build()
///     .unwrap();
/// let mapper = Mapper::builder(catalog)
///     .rules(RuleSet::new().with_rule(ClassRule::new("Person", "PersonDto").field("name", "fullName")))
///     .build();
///
/// let mut arena = ObjectArena::new();
/// let person = arena.instantiate(mapper.catalog(), "Person").unwrap();
/// arena.set_field(person, "name", "Ada").unwrap();
///
/// let dto = mapper.map(&mut arena, Some(person), "PersonDto").unwrap().unwrap();
/// assert_eq!(arena.field(dto, "fullName").unwrap(), &Value::from("Ada"));
/// ```
pub struct Mapper {
    catalog: Arc<TypeCatalog>,
    settings: Mutex<Settings>,
    engine: OnceLock<Arc<Engine>>,
    init: Mutex<()>,
}

impl Mapper {
    /// Mapper with built-in converters, the blank factory and no rules.
    pub fn new(catalog: impl Into<Arc<TypeCatalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            settings: Mutex::new(Settings::default()),
            engine: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn builder(catalog: impl Into<Arc<TypeCatalog>>) -> MapperBuilder {
        MapperBuilder {
            mapper: Self::new(catalog),
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }

    // ── Configuration ────────────────────────────────────────────────────────

    fn configure(&self, change: impl FnOnce(&mut Settings)) -> GraftResult<()> {
        let mut settings = self
            .settings
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        if self.is_initialized() {
            return Err(ApplicationError::AlreadyInitialized.into());
        }
        change(&mut settings);
        Ok(())
    }

    pub fn add_rule_source(&self, source: Arc<dyn RuleSource>) -> GraftResult<()> {
        self.configure(|s| s.sources.push(source))
    }

    pub fn add_rules(&self, rules: RuleSet) -> GraftResult<()> {
        self.add_rule_source(Arc::new(StaticRules(rules)))
    }

    pub fn add_converter(
        &self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
        converter: Arc<dyn Converter>,
    ) -> GraftResult<()> {
        let (source, destination) = (source.into(), destination.into());
        self.configure(|s| s.registry.register(source, destination, converter))
    }

    pub fn add_converter_id(&self, id: impl Into<String>, converter: Arc<dyn Converter>) -> GraftResult<()> {
        let id = id.into();
        self.configure(|s| s.registry.register_id(id, converter))
    }

    pub fn set_factory(&self, factory: Arc<dyn ObjectFactory>) -> GraftResult<()> {
        self.configure(|s| s.factory = factory)
    }

    pub fn add_listener(&self, listener: Arc<dyn MappingListener>) -> GraftResult<()> {
        self.configure(|s| s.listeners.push(listener))
    }

    /// Replace the field mapper; there is at most one.
    pub fn set_field_mapper(&self, field_mapper: Arc<dyn FieldMapper>) -> GraftResult<()> {
        self.configure(|s| s.field_mapper = Some(field_mapper))
    }

    // ── Initialization ───────────────────────────────────────────────────────

    /// The initialized engine, loading rules on the first call.
    ///
    /// Concurrent first callers wait for one initializer. Errors are not
    /// remembered: the next call runs the initializer again.
    pub fn engine(&self) -> GraftResult<Arc<Engine>> {
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let _init = self
            .init
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        // Holding the settings lock until the engine is published makes a
        // concurrent `configure` either land before or fail.
        let settings = self
            .settings
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        let engine = Arc::new(Engine::initialize(Arc::clone(&self.catalog), &settings)?);
        Ok(Arc::clone(self.engine.get_or_init(|| engine)))
    }

    // ── Mapping ──────────────────────────────────────────────────────────────

    /// Map `source` into a new instance of `destination_type`.
    ///
    /// `None` maps to `Ok(None)`.
    pub fn map(
        &self,
        arena: &mut ObjectArena,
        source: Option<ObjectId>,
        destination_type: impl Into<TypeName>,
    ) -> GraftResult<Option<ObjectId>> {
        self.map_inner(arena, source, destination_type.into(), None)
    }

    /// Like [`Mapper::map`], in the named mapping context.
    pub fn map_with_id(
        &self,
        arena: &mut ObjectArena,
        source: Option<ObjectId>,
        destination_type: impl Into<TypeName>,
        map_id: impl Into<MapId>,
    ) -> GraftResult<Option<ObjectId>> {
        self.map_inner(arena, source, destination_type.into(), Some(map_id.into()))
    }

    /// Map `source` into the existing `destination`.
    ///
    /// `None` leaves `destination` unchanged.
    pub fn map_into(
        &self,
        arena: &mut ObjectArena,
        source: Option<ObjectId>,
        destination: ObjectId,
    ) -> GraftResult<ObjectId> {
        self.map_into_inner(arena, source, destination, None)
    }

    pub fn map_into_with_id(
        &self,
        arena: &mut ObjectArena,
        source: Option<ObjectId>,
        destination: ObjectId,
        map_id: impl Into<MapId>,
    ) -> GraftResult<ObjectId> {
        self.map_into_inner(arena, source, destination, Some(map_id.into()))
    }

    #[instrument(skip(self, arena), fields(destination_type = %destination_type))]
    fn map_inner(
        &self,
        arena: &mut ObjectArena,
        source: Option<ObjectId>,
        destination_type: TypeName,
        map_id: Option<MapId>,
    ) -> GraftResult<Option<ObjectId>> {
        let Some(source) = source else {
            return Ok(None);
        };
        let engine = self.engine()?;
        engine.catalog().require(&destination_type)?;
        arena.require(source)?;

        let mut executor = MappingExecutor::new(&engine, map_id);
        debug!(call_id = %executor.call_id(), "Mapping");
        let destination = executor.map_object(arena, source, &destination_type, None)?;
        executor.finish(destination).map(Some)
    }

    #[instrument(skip(self, arena))]
    fn map_into_inner(
        &self,
        arena: &mut ObjectArena,
        source: Option<ObjectId>,
        destination: ObjectId,
        map_id: Option<MapId>,
    ) -> GraftResult<ObjectId> {
        let Some(source) = source else {
            return Ok(destination);
        };
        let engine = self.engine()?;
        arena.require(source)?;
        let destination_type = arena
            .type_of(destination)
            .cloned()
            .ok_or(DomainError::UnknownObject { id: destination.index() })?;
        engine.catalog().require(&destination_type)?;

        let mut executor = MappingExecutor::new(&engine, map_id);
        debug!(call_id = %executor.call_id(), "Mapping into existing destination");
        let destination = executor.map_object(arena, source, &destination_type, Some(destination))?;
        executor.finish(destination)
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// Resolve (or fetch) the plan for a pair without mapping anything.
    pub fn plan(
        &self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
        map_id: Option<MapId>,
    ) -> GraftResult<Arc<CorrespondencePlan>> {
        let pair = TypePair::new(source, destination).with_map_id(map_id);
        self.engine()?.plan(&pair)
    }

    /// Every pair an explicit rule declares, in rule order.
    pub fn declared_pairs(&self) -> GraftResult<Vec<TypePair>> {
        let engine = self.engine()?;
        Ok(engine
            .rules()
            .iter()
            .map(|r| TypePair::new(r.source.clone(), r.destination.clone()).with_map_id(r.map_id.clone()))
            .collect())
    }

    /// Every pair resolved so far with its plan.
    pub fn mapping_metadata(&self) -> GraftResult<MappingMetadata> {
        let engine = self.engine()?;
        Ok(MappingMetadata {
            plans: engine.cache().plans(),
        })
    }

    /// Cache counters; all zero before initialization.
    pub fn stats(&self) -> CacheStats {
        self.engine
            .get()
            .map(|e| e.cache().stats())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("types", &self.catalog.len())
            .field("engine", &self.engine.get())
            .finish()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Fluent construction of a [`Mapper`].
pub struct MapperBuilder {
    mapper: Mapper,
}

impl MapperBuilder {
    fn settings(&mut self) -> &mut Settings {
        // Nothing else can hold the lock before `build`.
        match self.mapper.settings.get_mut() {
            Ok(settings) => settings,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn rule_source(mut self, source: impl RuleSource + 'static) -> Self {
        self.settings().sources.push(Arc::new(source));
        self
    }

    pub fn rules(self, rules: RuleSet) -> Self {
        self.rule_source(StaticRules(rules))
    }

    pub fn converter(
        mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
        converter: impl Converter + 'static,
    ) -> Self {
        self.settings()
            .registry
            .register(source, destination, Arc::new(converter));
        self
    }

    pub fn converter_fn<F>(mut self, source: impl Into<TypeName>, destination: impl Into<TypeName>, f: F) -> Self
    where
        F: Fn(&Value, &mut crate::application::services::conversion::ConversionContext<'_>) -> Result<Value, String>
            + Send
            + Sync
            + 'static,
    {
        self.settings().registry.register_fn(source, destination, f);
        self
    }

    pub fn converter_id(mut self, id: impl Into<String>, converter: impl Converter + 'static) -> Self {
        self.settings().registry.register_id(id, Arc::new(converter));
        self
    }

    pub fn factory(mut self, factory: impl ObjectFactory + 'static) -> Self {
        self.settings().factory = Arc::new(factory);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn MappingListener>) -> Self {
        self.settings().listeners.push(listener);
        self
    }

    pub fn field_mapper(mut self, field_mapper: impl FieldMapper + 'static) -> Self {
        self.settings().field_mapper = Some(Arc::new(field_mapper));
        self
    }

    pub fn build(self) -> Mapper {
        self.mapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::output::{
        MockFieldMapper, MockMappingListener, MockObjectFactory, MockRuleSource,
    };
    use crate::domain::ClassRule;

    fn catalog() -> TypeCatalog {
        TypeCatalog::builder()
            .register(TypeDescriptor::bean("A").with_single("x", "int"))
            .register(TypeDescriptor::bean("B").with_single("x", "string"))
            .build()
            .unwrap()
    }

    #[test]
    fn rules_load_once() {
        let mut source = MockRuleSource::new();
        source.expect_name().return_const("mock".to_string());
        source
            .expect_load()
            .times(1)
            .returning(|| Ok(RuleSet::new().with_rule(ClassRule::new("A", "B"))));

        let mapper = Mapper::builder(catalog()).rule_source(source).build();
        assert!(!mapper.is_initialized());
        mapper.engine().unwrap();
        mapper.engine().unwrap();
        assert!(mapper.is_initialized());
    }

    #[test]
    fn failed_initialization_is_retried() {
        let mut source = MockRuleSource::new();
        source.expect_name().return_const("mock".to_string());
        let mut calls = 0;
        source.expect_load().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(ApplicationError::RuleLoading {
                    source_name: "mock".into(),
                    reason: "offline".into(),
                }
                .into())
            } else {
                Ok(RuleSet::new())
            }
        });

        let mapper = Mapper::builder(catalog()).rule_source(source).build();
        let err = mapper.engine().unwrap_err();
        assert!(err.is_retryable());
        assert!(!mapper.is_initialized());
        assert!(mapper.engine().is_ok());
    }

    #[test]
    fn configuring_after_first_call_fails() {
        let mapper = Mapper::new(catalog());
        mapper.add_rules(RuleSet::new()).unwrap();
        mapper.engine().unwrap();

        let err = mapper.add_rules(RuleSet::new()).unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::AlreadyInitialized)
        ));
    }

    #[test]
    fn listeners_see_every_object() {
        let mut listener = MockMappingListener::new();
        listener.expect_before_mapping().times(1).return_const(());
        listener
            .expect_after_mapping()
            .times(1)
            .withf(|event| event.pair == TypePair::new("A", "B"))
            .return_const(());

        let mapper = Mapper::builder(catalog()).listener(Arc::new(listener)).build();
        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();
        arena.set_field(a, "x", 7).unwrap();

        let b = mapper.map(&mut arena, Some(a), "B").unwrap().unwrap();
        assert_eq!(arena.field(b, "x").unwrap(), &Value::from("7"));
    }

    #[test]
    fn field_mapper_takes_over_claimed_fields() {
        let mut field_mapper = MockFieldMapper::new();
        field_mapper
            .expect_map_field()
            .times(1)
            .withf(|_, _, _, binding, value| binding.destination.as_str() == "x" && value.as_i64() == Some(7))
            .returning(|arena, _, destination, _, _| {
                arena.set_field(destination, "x", "seven")?;
                Ok(true)
            });

        let mapper = Mapper::builder(catalog()).field_mapper(field_mapper).build();
        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();
        arena.set_field(a, "x", 7).unwrap();

        let b = mapper.map(&mut arena, Some(a), "B").unwrap().unwrap();
        assert_eq!(arena.field(b, "x").unwrap(), &Value::from("seven"));
    }

    #[test]
    fn declined_fields_are_mapped_normally() {
        let mut field_mapper = MockFieldMapper::new();
        field_mapper.expect_map_field().times(1).returning(|_, _, _, _, _| Ok(false));

        let mapper = Mapper::new(catalog());
        mapper.set_field_mapper(Arc::new(field_mapper)).unwrap();
        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();
        arena.set_field(a, "x", 7).unwrap();

        let b = mapper.map(&mut arena, Some(a), "B").unwrap().unwrap();
        assert_eq!(arena.field(b, "x").unwrap(), &Value::from("7"));

        let err = mapper
            .set_field_mapper(Arc::new(MockFieldMapper::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::AlreadyInitialized)
        ));
    }

    #[test]
    fn factory_errors_become_creation_errors() {
        let mut factory = MockObjectFactory::new();
        factory
            .expect_create()
            .returning(|_, _, _| Err(GraftError::Internal { message: "no memory".into() }));

        let mapper = Mapper::builder(catalog()).factory(factory).build();
        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();

        let err = mapper.map(&mut arena, Some(a), "B").unwrap_err();
        assert!(matches!(
            err,
            GraftError::Application(ApplicationError::Creation { ref type_name, .. }) if type_name == "B"
        ));
    }

    #[test]
    fn factory_must_return_the_requested_type() {
        let mut factory = MockObjectFactory::new();
        factory.expect_create().returning(|arena, _, _| {
            let wrong = Arc::new(TypeDescriptor::bean("A").with_single("x", "int"));
            Ok(arena.alloc(wrong)?)
        });

        let mapper = Mapper::builder(catalog()).factory(factory).build();
        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();

        assert!(mapper.map(&mut arena, Some(a), "B").is_err());
    }

    #[test]
    fn unknown_destination_type_is_a_configuration_error() {
        let mapper = Mapper::new(catalog());
        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();
        let err = mapper.map(&mut arena, Some(a), "Nope").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn mapper_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mapper>();
        assert_send_sync::<Arc<Engine>>();
    }
}
