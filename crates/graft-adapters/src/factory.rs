//! Object factory with per-type initializers.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::trace;

use graft_core::{
    application::ports::ObjectFactory,
    domain::{MapId, ObjectArena, ObjectId, TypeDescriptor, TypeName, Value},
    error::GraftResult,
};

/// Runs on a freshly allocated instance before mapping fills it.
pub type Initializer = Arc<dyn Fn(&mut ObjectArena, ObjectId) -> GraftResult<()> + Send + Sync>;

/// Factory that allocates a blank instance and then applies the initializer
/// registered for its type.
///
/// Initializers are keyed by type and optional map-id; a map-id specific
/// initializer wins over the type's default one. Types without an
/// initializer come out blank.
#[derive(Clone, Default)]
pub struct PrototypeFactory {
    initializers: HashMap<(TypeName, Option<MapId>), Initializer>,
}

impl PrototypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an initializer for `type_name`, optionally only in one
    /// mapping context.
    pub fn with_initializer<F>(mut self, type_name: impl Into<TypeName>, map_id: Option<MapId>, f: F) -> Self
    where
        F: Fn(&mut ObjectArena, ObjectId) -> GraftResult<()> + Send + Sync + 'static,
    {
        self.initializers
            .insert((type_name.into(), map_id), Arc::new(f));
        self
    }

    /// Pre-fill fields of every new `type_name` instance.
    pub fn with_defaults<I, K>(self, type_name: impl Into<TypeName>, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let defaults: Vec<(String, Value)> = defaults.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.with_initializer(type_name, None, move |arena, id| {
            for (field, value) in &defaults {
                arena.set_field(id, field, value.clone())?;
            }
            Ok(())
        })
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    fn initializer(&self, type_name: &TypeName, map_id: Option<&MapId>) -> Option<&Initializer> {
        map_id
            .and_then(|id| self.initializers.get(&(type_name.clone(), Some(id.clone()))))
            .or_else(|| self.initializers.get(&(type_name.clone(), None)))
    }
}

impl ObjectFactory for PrototypeFactory {
    fn create(
        &self,
        arena: &mut ObjectArena,
        descriptor: &Arc<TypeDescriptor>,
        map_id: Option<&MapId>,
    ) -> GraftResult<ObjectId> {
        let id = arena.alloc(Arc::clone(descriptor))?;
        if let Some(init) = self.initializer(descriptor.name(), map_id) {
            trace!(type_name = %descriptor.name(), "running initializer");
            init(arena, id)?;
        }
        Ok(id)
    }
}

impl fmt::Debug for PrototypeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .initializers
            .keys()
            .map(|(t, m)| match m {
                Some(m) => format!("{t}@{m}"),
                None => t.to_string(),
            })
            .collect();
        keys.sort();
        f.debug_struct("PrototypeFactory")
            .field("initializers", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::domain::DomainError;

    fn descriptor() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::bean("Account")
                .with_single("status", "string")
                .with_single("limit", "int"),
        )
    }

    #[test]
    fn blank_without_initializer() {
        let mut arena = ObjectArena::new();
        let id = PrototypeFactory::new()
            .create(&mut arena, &descriptor(), None)
            .unwrap();
        assert_eq!(arena.field(id, "status").unwrap(), &Value::Null);
    }

    #[test]
    fn defaults_are_applied() {
        let factory = PrototypeFactory::new()
            .with_defaults("Account", [("status", Value::from("new")), ("limit", Value::Int(100))]);
        let mut arena = ObjectArena::new();

        let id = factory.create(&mut arena, &descriptor(), None).unwrap();
        assert_eq!(arena.field(id, "status").unwrap(), &Value::from("new"));
        assert_eq!(arena.field(id, "limit").unwrap(), &Value::Int(100));
    }

    #[test]
    fn map_id_initializer_wins() {
        let factory = PrototypeFactory::new()
            .with_defaults("Account", [("status", Value::from("default"))])
            .with_initializer("Account", Some(MapId::new("audit")), |arena, id| {
                arena.set_field(id, "status", "audited")?;
                Ok(())
            });
        let mut arena = ObjectArena::new();

        let audit = MapId::new("audit");
        let a = factory.create(&mut arena, &descriptor(), Some(&audit)).unwrap();
        let b = factory
            .create(&mut arena, &descriptor(), Some(&MapId::new("other")))
            .unwrap();
        assert_eq!(arena.field(a, "status").unwrap(), &Value::from("audited"));
        assert_eq!(arena.field(b, "status").unwrap(), &Value::from("default"));
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn initializer_errors_propagate() {
        let factory = PrototypeFactory::new().with_defaults("Account", [("missing", Value::Int(1))]);
        let mut arena = ObjectArena::new();

        let err = factory.create(&mut arena, &descriptor(), None).unwrap_err();
        assert!(matches!(
            err,
            graft_core::error::GraftError::Domain(DomainError::UnknownField { .. })
        ));
    }
}
