//! Mapping execution: walks a source object against its plan and writes the
//! destination graph.
//!
//! One executor per public mapping call. It owns the call's [`VisitedSet`]
//! and the conversion failures collected in non-strict mode.

use std::collections::HashMap;

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::application::ports::MappingEvent;
use crate::application::services::conversion::{ConversionContext, Converter};
use crate::application::services::mapper::Engine;
use crate::application::{ApplicationError, ConversionError};
use crate::domain::{
    ContainerStrategy, CorrespondencePlan, DomainError, FieldBinding, FieldPath, MapId,
    NullPolicy, ObjectArena, ObjectId, PathStep, TypeName, TypePair, Value,
};
use crate::error::{GraftError, GraftResult};

// ── VisitedSet ───────────────────────────────────────────────────────────────

/// (source object, destination type) → destination object, for one call.
///
/// An entry is registered before the destination is populated, so a cycle
/// back to the source finds the half-built destination instead of recursing.
#[derive(Debug, Default)]
pub struct VisitedSet {
    entries: HashMap<(ObjectId, TypeName), ObjectId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: ObjectId, destination_type: &TypeName) -> Option<ObjectId> {
        self.entries
            .get(&(source, destination_type.clone()))
            .copied()
    }

    pub fn insert(&mut self, source: ObjectId, destination_type: TypeName, destination: ObjectId) {
        self.entries.insert((source, destination_type), destination);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Executor ─────────────────────────────────────────────────────────────────

pub struct MappingExecutor<'e> {
    engine: &'e Engine,
    call_id: Uuid,
    map_id: Option<MapId>,
    strict: bool,
    visited: VisitedSet,
    failures: Vec<ConversionError>,
    /// Destination field names from the root object down to the field being
    /// converted.
    path: Vec<String>,
}

impl<'e> MappingExecutor<'e> {
    pub fn new(engine: &'e Engine, map_id: Option<MapId>) -> Self {
        Self {
            engine,
            call_id: Uuid::new_v4(),
            map_id,
            strict: engine.configuration().strict,
            visited: VisitedSet::new(),
            failures: Vec::new(),
            path: Vec::new(),
        }
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Map `source` to an object of `destination_type`, into `destination`
    /// when given, otherwise into a new instance from the object factory.
    pub fn map_object(
        &mut self,
        arena: &mut ObjectArena,
        source: ObjectId,
        destination_type: &TypeName,
        destination: Option<ObjectId>,
    ) -> GraftResult<ObjectId> {
        if let Some(existing) = self.visited.get(source, destination_type) {
            trace!(%source, %destination_type, %existing, "Reusing visited destination");
            return Ok(existing);
        }

        let source_type = arena
            .type_of(source)
            .cloned()
            .ok_or(DomainError::UnknownObject { id: source.index() })?;
        let pair = TypePair::new(source_type, destination_type.clone()).with_map_id(self.map_id.clone());
        let plan = self.engine.plan(&pair)?;

        let destination = match destination {
            Some(id) => id,
            None => self.engine.create(arena, &plan.destination, self.map_id.as_ref())?,
        };
        self.visited.insert(source, destination_type.clone(), destination);

        self.execute(arena, source, destination, &plan)?;
        Ok(destination)
    }

    /// Apply every binding of `plan` from `source` to `destination`.
    pub fn execute(
        &mut self,
        arena: &mut ObjectArena,
        source: ObjectId,
        destination: ObjectId,
        plan: &CorrespondencePlan,
    ) -> GraftResult<()> {
        let event = MappingEvent {
            call_id: self.call_id,
            pair: plan.pair.clone(),
            source,
            destination,
        };
        for listener in self.engine.listeners() {
            listener.before_mapping(&event);
        }

        for binding in &plan.bindings {
            self.path.push(binding.destination.as_str().to_owned());
            let result = self.apply(arena, source, destination, binding);
            self.path.pop();
            result?;
        }

        for listener in self.engine.listeners() {
            listener.after_mapping(&event);
        }
        Ok(())
    }

    /// Turn the collected failures into the call's result.
    pub fn finish(self, destination: ObjectId) -> GraftResult<ObjectId> {
        if self.failures.is_empty() {
            Ok(destination)
        } else {
            Err(ApplicationError::ConversionFailures {
                failures: self.failures,
                destination: Some(destination),
            }
            .into())
        }
    }

    // ── Bindings ─────────────────────────────────────────────────────────────

    fn apply(
        &mut self,
        arena: &mut ObjectArena,
        source: ObjectId,
        destination: ObjectId,
        binding: &FieldBinding,
    ) -> GraftResult<()> {
        let mut value = read_path(arena, source, &binding.source)?;
        if let Some(field_mapper) = self.engine.field_mapper() {
            if field_mapper.map_field(arena, source, destination, binding, &value)? {
                trace!(field = %binding.destination, "Field taken over by field mapper");
                return Ok(());
            }
        }
        if binding.null_policy == NullPolicy::MapEmptyStringAsNull && value.as_str() == Some("") {
            value = Value::Null;
        }

        if value.is_null() {
            if binding.null_policy != NullPolicy::SkipIfNull {
                self.write_path(arena, destination, &binding.destination, Value::Null)?;
            }
            return Ok(());
        }

        let converted = match binding.strategy {
            ContainerStrategy::Single => self.convert_single(arena, destination, binding, &value)?,
            ContainerStrategy::List | ContainerStrategy::Set | ContainerStrategy::Array => {
                self.convert_sequence(arena, binding, &value)?
            }
            ContainerStrategy::Map => self.convert_map(arena, binding, &value)?,
        };

        if let Some(converted) = converted {
            self.write_path(arena, destination, &binding.destination, converted)?;
        }
        Ok(())
    }

    fn convert_single(
        &mut self,
        arena: &mut ObjectArena,
        destination: ObjectId,
        binding: &FieldBinding,
        value: &Value,
    ) -> GraftResult<Option<Value>> {
        if let Some(id) = &binding.converter_id {
            let converter = self.engine.registry().by_id(id)?;
            return self.run_converter(
                arena,
                converter.as_ref(),
                value,
                binding,
                binding.source.shape().to_string(),
                binding.destination.shape().to_string(),
            );
        }

        let existing = read_path(arena, destination, &binding.destination)?.as_object();
        self.convert_element(
            arena,
            value,
            binding.source_element(),
            binding.destination_element(),
            existing,
            binding,
        )
    }

    fn convert_sequence(
        &mut self,
        arena: &mut ObjectArena,
        binding: &FieldBinding,
        value: &Value,
    ) -> GraftResult<Option<Value>> {
        let Some(elements) = value.elements() else {
            return self.fail(
                value.kind_name(),
                binding.destination.shape().to_string(),
                "expected a list, set or array",
            );
        };

        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(converted) = self.convert_item(
                arena,
                element,
                binding.source_element(),
                binding.destination_element(),
                binding,
            )? {
                out.push(converted);
            }
        }

        Ok(Some(match binding.strategy {
            ContainerStrategy::Set => Value::set_of(out),
            ContainerStrategy::Array => Value::Array(out),
            _ => Value::List(out),
        }))
    }

    fn convert_map(
        &mut self,
        arena: &mut ObjectArena,
        binding: &FieldBinding,
        value: &Value,
    ) -> GraftResult<Option<Value>> {
        let Some(entries) = value.entries() else {
            return self.fail(
                value.kind_name(),
                binding.destination.shape().to_string(),
                "expected a map",
            );
        };
        let (Some(source_key), Some(destination_key)) =
            (binding.source.shape().key(), binding.destination.shape().key())
        else {
            return Err(GraftError::Internal {
                message: format!("map binding '{}' without key types", binding.destination),
            });
        };

        let mut out = Vec::with_capacity(entries.len());
        for (key, item) in entries {
            let key = if binding.map_keys || key.as_object().is_some() {
                match self.convert_item(arena, key, source_key, destination_key, binding)? {
                    Some(key) => key,
                    None => continue,
                }
            } else {
                key.clone()
            };
            if let Some(item) = self.convert_item(
                arena,
                item,
                binding.source_element(),
                binding.destination_element(),
                binding,
            )? {
                out.push((key, item));
            }
        }
        Ok(Some(Value::map_of(out)))
    }

    /// One container element or map key/value.
    fn convert_item(
        &mut self,
        arena: &mut ObjectArena,
        item: &Value,
        source_type: &TypeName,
        destination_type: &TypeName,
        binding: &FieldBinding,
    ) -> GraftResult<Option<Value>> {
        if let Some(id) = &binding.converter_id {
            let converter = self.engine.registry().by_id(id)?;
            return self.run_converter(
                arena,
                converter.as_ref(),
                item,
                binding,
                source_type.to_string(),
                destination_type.to_string(),
            );
        }
        self.convert_element(arena, item, source_type, destination_type, None, binding)
    }

    fn convert_element(
        &mut self,
        arena: &mut ObjectArena,
        value: &Value,
        source_type: &TypeName,
        destination_type: &TypeName,
        existing: Option<ObjectId>,
        binding: &FieldBinding,
    ) -> GraftResult<Option<Value>> {
        let engine = self.engine;
        let destination_is_bean = engine
            .catalog()
            .get(destination_type)
            .is_some_and(|d| d.is_bean());

        match value {
            Value::Null => Ok(Some(Value::Null)),

            Value::Object(id) if destination_is_bean => {
                let (target, reuse) = match existing.and_then(|e| arena.type_of(e).map(|t| (e, t.clone()))) {
                    Some((e, runtime)) if engine.is_subtype(&runtime, destination_type) => (runtime, Some(e)),
                    _ => (destination_type.clone(), None),
                };
                let mapped = self.map_object(arena, *id, &target, reuse)?;
                Ok(Some(Value::Object(mapped)))
            }

            Value::Object(id) => {
                let runtime = arena
                    .type_of(*id)
                    .cloned()
                    .ok_or(DomainError::UnknownObject { id: id.index() })?;
                self.lookup_and_convert(arena, value, &runtime, destination_type, binding)
            }

            Value::List(_) | Value::Set(_) | Value::Array(_) | Value::Map(_) => self.fail(
                value.kind_name(),
                destination_type.to_string(),
                "nested containers are not supported",
            ),

            _ if engine.is_subtype(source_type, destination_type) => Ok(Some(value.clone())),

            _ => self.lookup_and_convert(arena, value, source_type, destination_type, binding),
        }
    }

    fn lookup_and_convert(
        &mut self,
        arena: &mut ObjectArena,
        value: &Value,
        source_type: &TypeName,
        destination_type: &TypeName,
        binding: &FieldBinding,
    ) -> GraftResult<Option<Value>> {
        match self.engine.converter(source_type, destination_type)? {
            Some(entry) => self.run_converter(
                arena,
                entry.converter.as_ref(),
                value,
                binding,
                source_type.to_string(),
                destination_type.to_string(),
            ),
            // Scalars stored the same way (`string` into `email`) copy as is.
            None if self.engine.same_scalar_kind(source_type, destination_type) => Ok(Some(value.clone())),
            None => self.fail(
                source_type.to_string(),
                destination_type.to_string(),
                "no converter registered",
            ),
        }
    }

    fn run_converter(
        &mut self,
        arena: &mut ObjectArena,
        converter: &dyn Converter,
        value: &Value,
        binding: &FieldBinding,
        source_type: String,
        destination_type: String,
    ) -> GraftResult<Option<Value>> {
        let field = self.path.join(".");
        let mut ctx = ConversionContext {
            arena,
            date_format: &binding.date_format,
            field: &field,
        };
        match converter.convert(value, &mut ctx) {
            Ok(converted) => Ok(Some(converted)),
            Err(reason) => self.fail(source_type, destination_type, reason),
        }
    }

    /// Record a conversion failure. Strict mode turns it into the call's
    /// error; otherwise the value is dropped and mapping continues.
    fn fail(
        &mut self,
        source_type: impl Into<String>,
        destination_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> GraftResult<Option<Value>> {
        let error = ConversionError::new(self.path.join("."), source_type, destination_type, reason);
        if self.strict {
            debug!(%error, "Aborting strict mapping");
            return Err(ApplicationError::Conversion(error).into());
        }
        warn!(call_id = %self.call_id, %error, "Conversion failed, continuing");
        self.failures.push(error);
        Ok(None)
    }

    /// Write `value` at `path` below `root`, creating missing intermediate
    /// objects. A null never creates intermediates.
    fn write_path(
        &mut self,
        arena: &mut ObjectArena,
        root: ObjectId,
        path: &FieldPath,
        value: Value,
    ) -> GraftResult<()> {
        let Some((last, intermediate)) = path.steps().split_last() else {
            return Ok(());
        };

        let mut current = root;
        for step in intermediate {
            let index = step_index(arena, current, step)?;
            match field_value(arena, current, index)? {
                Value::Object(next) => current = *next,
                _ if value.is_null() => return Ok(()),
                _ => {
                    let owner = arena.require(current)?.descriptor().clone();
                    let field = &owner.fields()[index];
                    let descriptor = self.engine.catalog().require(field.shape.element())?.clone();
                    let created = self.engine.create(arena, &descriptor, self.map_id.as_ref())?;
                    arena.set_field_at(current, index, Value::Object(created))?;
                    current = created;
                }
            }
        }
        let index = step_index(arena, current, last)?;
        arena.set_field_at(current, index, value)?;
        Ok(())
    }
}

/// Index of `step` in the object actually found at that hop.
///
/// Plans index fields of the declared type. A subtype instance lays its
/// fields out differently (several supertypes, redeclared fields), so any
/// other runtime type is looked up by name.
fn step_index(arena: &ObjectArena, id: ObjectId, step: &PathStep) -> GraftResult<usize> {
    let descriptor = arena.require(id)?.descriptor();
    if *descriptor.name() == step.owner {
        return Ok(step.index);
    }
    descriptor.field_index(&step.field).ok_or_else(|| {
        DomainError::UnknownField {
            type_name: descriptor.name().to_string(),
            field: step.field.clone(),
        }
        .into()
    })
}

fn field_value(arena: &ObjectArena, id: ObjectId, index: usize) -> GraftResult<&Value> {
    arena.require(id)?;
    arena.field_at(id, index).ok_or_else(|| GraftError::Internal {
        message: format!("object {id} has no field at index {index}"),
    })
}

/// Read `path` below `root`. A null or non-object intermediate reads as null.
fn read_path(arena: &ObjectArena, root: ObjectId, path: &FieldPath) -> GraftResult<Value> {
    let Some((last, intermediate)) = path.steps().split_last() else {
        return Ok(Value::Null);
    };

    let mut current = root;
    for step in intermediate {
        match field_value(arena, current, step_index(arena, current, step)?)? {
            Value::Object(next) => current = *next,
            _ => return Ok(Value::Null),
        }
    }
    Ok(field_value(arena, current, step_index(arena, current, last)?)?.clone())
}
