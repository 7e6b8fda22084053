//! Runtime values and the object arena.
//!
//! Objects live in an [`ObjectArena`] and are addressed by [`ObjectId`]; a
//! field holding another object stores its id, never the object itself. That
//! keeps cyclic graphs (a parent whose children point back at it) ordinary
//! data: no shared ownership, no interior mutability. `ObjectId` is object
//! identity for cycle detection.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::{
    entities::descriptor::{TypeCatalog, TypeDescriptor},
    error::DomainError,
    value_objects::TypeName,
};

/// Index of an object inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDateTime),
    Object(ObjectId),
    List(Vec<Value>),
    Set(Vec<Value>),
    Array(Vec<Value>),
    /// Insertion-ordered entries; keys are unique.
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Elements of a list, set or array.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) | Self::Set(v) | Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Build a set, dropping later duplicates.
    pub fn set_of(items: impl IntoIterator<Item = Value>) -> Self {
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Self::Set(out)
    }

    /// Build a map, later entries replacing earlier ones with the same key.
    pub fn map_of(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (k, v) in entries {
            match out.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Self::Map(out)
    }

    /// Short label used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Date(_) => "date",
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Date(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One object: its type and one value per declared field.
#[derive(Debug, Clone)]
pub struct ObjectData {
    descriptor: Arc<TypeDescriptor>,
    fields: Vec<Value>,
}

impl ObjectData {
    pub fn type_name(&self) -> &TypeName {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn values(&self) -> &[Value] {
        &self.fields
    }
}

/// Owner of every object taking part in a mapping call.
///
/// Source graphs and the destination graphs produced from them usually share
/// one arena, so a caller can build a source, map it, and read the result
/// through the same handle.
#[derive(Debug, Clone, Default)]
pub struct ObjectArena {
    objects: Vec<ObjectData>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a blank instance (every field null).
    pub fn alloc(&mut self, descriptor: Arc<TypeDescriptor>) -> Result<ObjectId, DomainError> {
        if !descriptor.is_bean() {
            return Err(DomainError::InvalidRule(format!(
                "cannot instantiate scalar type '{}'",
                descriptor.name()
            )));
        }
        let id = ObjectId(self.objects.len());
        let fields = vec![Value::Null; descriptor.fields().len()];
        self.objects.push(ObjectData { descriptor, fields });
        Ok(id)
    }

    /// Allocate a blank instance of a catalog type.
    pub fn instantiate(&mut self, catalog: &TypeCatalog, name: &str) -> Result<ObjectId, DomainError> {
        let descriptor = catalog.lookup(name)?.clone();
        self.alloc(descriptor)
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectData> {
        self.objects.get(id.0)
    }

    pub fn require(&self, id: ObjectId) -> Result<&ObjectData, DomainError> {
        self.get(id)
            .ok_or(DomainError::UnknownObject { id: id.0 })
    }

    pub fn type_of(&self, id: ObjectId) -> Option<&TypeName> {
        self.get(id).map(ObjectData::type_name)
    }

    pub fn field_at(&self, id: ObjectId, index: usize) -> Option<&Value> {
        self.get(id).and_then(|o| o.fields.get(index))
    }

    pub fn set_field_at(&mut self, id: ObjectId, index: usize, value: Value) -> Result<(), DomainError> {
        let object = self
            .objects
            .get_mut(id.0)
            .ok_or(DomainError::UnknownObject { id: id.0 })?;
        let slot = object
            .fields
            .get_mut(index)
            .ok_or_else(|| DomainError::UnknownField {
                type_name: object.descriptor.name().to_string(),
                field: format!("#{index}"),
            })?;
        *slot = value;
        Ok(())
    }

    /// Read a field by name.
    pub fn field(&self, id: ObjectId, name: &str) -> Result<&Value, DomainError> {
        let object = self.require(id)?;
        let index = field_index(object, name)?;
        Ok(&object.fields[index])
    }

    /// Write a field by name.
    pub fn set_field(&mut self, id: ObjectId, name: &str, value: impl Into<Value>) -> Result<(), DomainError> {
        let index = field_index(self.require(id)?, name)?;
        self.set_field_at(id, index, value.into())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn field_index(object: &ObjectData, name: &str) -> Result<usize, DomainError> {
    object
        .descriptor
        .field_index(name)
        .ok_or_else(|| DomainError::UnknownField {
            type_name: object.descriptor.name().to_string(),
            field: name.to_owned(),
        })
}
