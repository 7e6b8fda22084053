//! JSON codec between `serde_json` documents and arena object graphs.
//!
//! Decoding is driven by the catalog: every JSON object is read as the
//! declared type of the slot it lands in, and each field by its declared
//! shape. Encoding walks the graph and refuses cycles, which JSON cannot
//! express.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

use graft_core::{
    domain::{
        DEFAULT_DATE_FORMAT, DomainError, FieldShape, ObjectArena, ObjectId, ScalarKind,
        TypeCatalog, TypeName, Value, format_date,
    },
    error::GraftError,
};

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("{path}: expected {expected}, found {found}")]
    Expected {
        path: String,
        expected: String,
        found: String,
    },

    #[error("{path}: type '{type_name}' has no field '{field}'")]
    UnknownField {
        path: String,
        type_name: String,
        field: String,
    },

    #[error("{path}: '{value}' does not match date format '{format}'")]
    InvalidDate {
        path: String,
        value: String,
        format: String,
    },

    #[error("{path}: date format '{format}' cannot render {value}")]
    UnrenderableDate {
        path: String,
        value: NaiveDateTime,
        format: String,
    },

    #[error("{path}: {kind} cannot be used as a JSON object key")]
    InvalidKey { path: String, kind: String },

    #[error("{path}: {value} has no JSON representation")]
    NonFinite { path: String, value: f64 },

    #[error("cycle detected at {path}: object {object} is already being encoded")]
    Cycle { path: String, object: ObjectId },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<JsonError> for GraftError {
    fn from(err: JsonError) -> Self {
        match err {
            JsonError::Domain(e) => e.into(),
            JsonError::UnrenderableDate { format, .. } => DomainError::InvalidRule(format!(
                "date format '{format}' cannot render a date-time without a time zone"
            ))
            .into(),
            other => GraftError::Internal {
                message: other.to_string(),
            },
        }
    }
}

pub type JsonResult<T> = Result<T, JsonError>;

/// Reads and writes object graphs as JSON.
#[derive(Debug, Clone)]
pub struct JsonCodec<'c> {
    catalog: &'c TypeCatalog,
    date_format: String,
}

impl<'c> JsonCodec<'c> {
    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self {
            catalog,
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
        }
    }

    /// Format used for `date` values in both directions.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    // ── Decoding ─────────────────────────────────────────────────────────────

    /// Parse `text` and decode it as an instance of `type_name`.
    pub fn decode_str(&self, arena: &mut ObjectArena, type_name: &str, text: &str) -> JsonResult<ObjectId> {
        let json: Json = serde_json::from_str(text)?;
        self.decode(arena, type_name, &json)
    }

    /// Decode a JSON object as an instance of `type_name`.
    ///
    /// Fields absent from the document stay null.
    pub fn decode(&self, arena: &mut ObjectArena, type_name: &str, json: &Json) -> JsonResult<ObjectId> {
        self.decode_object(arena, &TypeName::new(type_name), json, "$")
    }

    fn decode_object(&self, arena: &mut ObjectArena, type_name: &TypeName, json: &Json, path: &str) -> JsonResult<ObjectId> {
        let Json::Object(members) = json else {
            return Err(expected(path, type_name.as_str(), json));
        };
        let descriptor = self.catalog.require(type_name)?.clone();
        let id = arena.alloc(descriptor.clone())?;

        for (name, member) in members {
            let index = descriptor
                .field_index(name)
                .ok_or_else(|| JsonError::UnknownField {
                    path: path.to_owned(),
                    type_name: type_name.to_string(),
                    field: name.clone(),
                })?;
            let shape = &descriptor.fields()[index].shape;
            let value = self.decode_field(arena, shape, member, &format!("{path}.{name}"))?;
            arena.set_field_at(id, index, value)?;
        }
        Ok(id)
    }

    fn decode_field(&self, arena: &mut ObjectArena, shape: &FieldShape, json: &Json, path: &str) -> JsonResult<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        match shape {
            FieldShape::Single(ty) => self.decode_element(arena, ty, json, path),
            FieldShape::List(ty) => Ok(Value::List(self.decode_items(arena, ty, json, path)?)),
            FieldShape::Set(ty) => Ok(Value::set_of(self.decode_items(arena, ty, json, path)?)),
            FieldShape::Array(ty) => Ok(Value::Array(self.decode_items(arena, ty, json, path)?)),
            FieldShape::Map(key, ty) => {
                let Json::Object(members) = json else {
                    return Err(expected(path, "object", json));
                };
                let mut entries = Vec::with_capacity(members.len());
                for (k, v) in members {
                    let item_path = format!("{path}.{k}");
                    let key = self.decode_key(key, k, &item_path)?;
                    entries.push((key, self.decode_element(arena, ty, v, &item_path)?));
                }
                Ok(Value::map_of(entries))
            }
        }
    }

    fn decode_items(&self, arena: &mut ObjectArena, ty: &TypeName, json: &Json, path: &str) -> JsonResult<Vec<Value>> {
        let Json::Array(items) = json else {
            return Err(expected(path, "array", json));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.decode_element(arena, ty, item, &format!("{path}[{i}]")))
            .collect()
    }

    fn decode_element(&self, arena: &mut ObjectArena, ty: &TypeName, json: &Json, path: &str) -> JsonResult<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let descriptor = self.catalog.require(ty)?;
        match descriptor.scalar_kind() {
            Some(kind) => self.decode_scalar(kind, json, path),
            None => Ok(Value::Object(self.decode_object(arena, ty, json, path)?)),
        }
    }

    fn decode_scalar(&self, kind: ScalarKind, json: &Json, path: &str) -> JsonResult<Value> {
        let value = match (kind, json) {
            (ScalarKind::Bool, Json::Bool(b)) => Value::Bool(*b),
            (ScalarKind::Int, Json::Number(n)) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => return Err(expected(path, "integer", json)),
            },
            (ScalarKind::Float, Json::Number(n)) => match n.as_f64() {
                Some(f) => Value::Float(f),
                None => return Err(expected(path, "float", json)),
            },
            (ScalarKind::String, Json::String(s)) => Value::Str(s.clone()),
            (ScalarKind::Date, Json::String(s)) => Value::Date(self.parse_date(s, path)?),
            (kind, other) => return Err(expected(path, &kind.to_string(), other)),
        };
        Ok(value)
    }

    fn decode_key(&self, ty: &TypeName, key: &str, path: &str) -> JsonResult<Value> {
        let kind = self.catalog.require(ty)?.scalar_kind();
        match kind {
            Some(ScalarKind::String) => Ok(Value::Str(key.to_owned())),
            Some(ScalarKind::Int) => key
                .parse()
                .map(Value::Int)
                .map_err(|_| expected(path, "integer key", &Json::String(key.to_owned()))),
            Some(ScalarKind::Bool) => key
                .parse()
                .map(Value::Bool)
                .map_err(|_| expected(path, "bool key", &Json::String(key.to_owned()))),
            Some(ScalarKind::Date) => Ok(Value::Date(self.parse_date(key, path)?)),
            Some(ScalarKind::Float) | None => Err(JsonError::InvalidKey {
                path: path.to_owned(),
                kind: ty.to_string(),
            }),
        }
    }

    fn parse_date(&self, s: &str, path: &str) -> JsonResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, &self.date_format)
            .or_else(|_| NaiveDate::parse_from_str(s, &self.date_format).map(|d| d.and_time(NaiveTime::MIN)))
            .map_err(|_| JsonError::InvalidDate {
                path: path.to_owned(),
                value: s.to_owned(),
                format: self.date_format.clone(),
            })
    }

    // ── Encoding ─────────────────────────────────────────────────────────────

    /// Encode the graph rooted at `id`.
    ///
    /// # Errors
    /// `Cycle` when an object is reachable from itself; shared (acyclic)
    /// references are written once per occurrence.
    pub fn encode(&self, arena: &ObjectArena, id: ObjectId) -> JsonResult<Json> {
        let mut in_progress = HashSet::new();
        self.encode_object(arena, id, "$", &mut in_progress)
    }

    pub fn encode_pretty(&self, arena: &ObjectArena, id: ObjectId) -> JsonResult<String> {
        Ok(serde_json::to_string_pretty(&self.encode(arena, id)?)?)
    }

    fn encode_object(
        &self,
        arena: &ObjectArena,
        id: ObjectId,
        path: &str,
        in_progress: &mut HashSet<ObjectId>,
    ) -> JsonResult<Json> {
        if !in_progress.insert(id) {
            return Err(JsonError::Cycle {
                path: path.to_owned(),
                object: id,
            });
        }
        let object = arena.require(id)?;
        let mut members = Map::new();
        for (field, value) in object.descriptor().fields().iter().zip(object.values()) {
            let json = self.encode_value(arena, value, &format!("{path}.{}", field.name), in_progress)?;
            members.insert(field.name.clone(), json);
        }
        in_progress.remove(&id);
        Ok(Json::Object(members))
    }

    fn encode_value(
        &self,
        arena: &ObjectArena,
        value: &Value,
        path: &str,
        in_progress: &mut HashSet<ObjectId>,
    ) -> JsonResult<Json> {
        let json = match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).ok_or(JsonError::NonFinite {
                path: path.to_owned(),
                value: *f,
            })?,
            Value::Str(s) => Json::String(s.clone()),
            Value::Date(d) => Json::String(self.render_date(d, path)?),
            Value::Object(id) => self.encode_object(arena, *id, path, in_progress)?,
            Value::List(items) | Value::Set(items) | Value::Array(items) => Json::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.encode_value(arena, item, &format!("{path}[{i}]"), in_progress))
                    .collect::<JsonResult<_>>()?,
            ),
            Value::Map(entries) => {
                let mut members = Map::new();
                for (key, item) in entries {
                    let key = self.encode_key(key, path)?;
                    let item_path = format!("{path}.{key}");
                    members.insert(key, self.encode_value(arena, item, &item_path, in_progress)?);
                }
                Json::Object(members)
            }
        };
        Ok(json)
    }

    fn render_date(&self, date: &NaiveDateTime, path: &str) -> JsonResult<String> {
        format_date(date, &self.date_format).ok_or_else(|| JsonError::UnrenderableDate {
            path: path.to_owned(),
            value: *date,
            format: self.date_format.clone(),
        })
    }

    fn encode_key(&self, key: &Value, path: &str) -> JsonResult<String> {
        match key {
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Date(d) => self.render_date(d, path),
            other => Err(JsonError::InvalidKey {
                path: path.to_owned(),
                kind: other.kind_name().to_owned(),
            }),
        }
    }
}

fn expected(path: &str, expected: &str, found: &Json) -> JsonError {
    let found = match found {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    JsonError::Expected {
        path: path.to_owned(),
        expected: expected.to_owned(),
        found: found.to_owned(),
    }
}
