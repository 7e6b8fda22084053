//! Correspondence plans: the resolved, immutable form of a mapping.
//!
//! A plan is built once per [`TypePair`] and then shared (`Arc`) by every
//! call that maps that pair. Field accessors are resolved to indices at build
//! time so executing a plan never looks a field up by name.

use std::fmt;
use std::sync::Arc;

use crate::domain::{
    entities::descriptor::{FieldShape, TypeCatalog, TypeDescriptor},
    entities::rule::GlobalConfiguration,
    error::DomainError,
    value_objects::{ContainerStrategy, MapId, NullPolicy, TypeName},
};

// ── TypePair ─────────────────────────────────────────────────────────────────

/// Cache and lookup key: (source type, destination type, map-id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePair {
    pub source: TypeName,
    pub destination: TypeName,
    pub map_id: Option<MapId>,
}

impl TypePair {
    pub fn new(source: impl Into<TypeName>, destination: impl Into<TypeName>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            map_id: None,
        }
    }

    pub fn with_map_id(mut self, map_id: Option<MapId>) -> Self {
        self.map_id = map_id;
        self
    }
}

impl fmt::Display for TypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)?;
        if let Some(id) = &self.map_id {
            write!(f, " [{id}]")?;
        }
        Ok(())
    }
}

// ── Field paths ──────────────────────────────────────────────────────────────

/// One hop of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Type that declares the field.
    pub owner: TypeName,
    pub field: String,
    pub index: usize,
}

/// Dotted accessor (`address.city`) resolved against the catalog.
///
/// Every step but the last must be a single bean-typed field; the last step
/// may have any shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    text: String,
    steps: Vec<PathStep>,
    shape: FieldShape,
}

impl FieldPath {
    pub fn resolve(catalog: &TypeCatalog, root: &TypeDescriptor, text: &str) -> Result<Self, DomainError> {
        let segments: Vec<&str> = text.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DomainError::InvalidRule(format!("malformed field path '{text}'")));
        }

        let mut owner: &TypeDescriptor = root;
        let mut steps = Vec::with_capacity(segments.len());
        let mut shape = None;

        for (i, segment) in segments.iter().enumerate() {
            let unknown = || DomainError::UnknownField {
                type_name: owner.name().to_string(),
                field: (*segment).to_owned(),
            };
            let index = owner.field_index(segment).ok_or_else(unknown)?;
            let field = &owner.fields()[index];
            steps.push(PathStep {
                owner: owner.name().clone(),
                field: field.name.clone(),
                index,
            });

            let last = i + 1 == segments.len();
            if last {
                shape = Some(field.shape.clone());
                break;
            }

            match &field.shape {
                FieldShape::Single(next) => {
                    let next = catalog.require(next)?;
                    if !next.is_bean() {
                        return Err(DomainError::InvalidRule(format!(
                            "'{}' in path '{text}' is a scalar and has no fields",
                            field.name
                        )));
                    }
                    owner = next.as_ref();
                }
                other => {
                    return Err(DomainError::IncompatibleShapes {
                        field: text.to_owned(),
                        source_shape: other.to_string(),
                        destination_shape: "nested path".into(),
                    });
                }
            }
        }

        Ok(Self {
            text: text.to_owned(),
            steps,
            shape: shape.ok_or_else(|| DomainError::InvalidRule(format!("empty field path '{text}'")))?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Declared shape of the final field.
    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }

    pub fn is_deep(&self) -> bool {
        self.steps.len() > 1
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ── Bindings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOrigin {
    /// From a field rule.
    Explicit,
    /// Same-name match.
    Implicit,
}

/// One resolved field correspondence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub source: FieldPath,
    pub destination: FieldPath,
    pub converter_id: Option<String>,
    pub strategy: ContainerStrategy,
    pub null_policy: NullPolicy,
    pub date_format: String,
    pub map_keys: bool,
    pub origin: BindingOrigin,
}

impl FieldBinding {
    pub fn source_element(&self) -> &TypeName {
        self.source.shape().element()
    }

    pub fn destination_element(&self) -> &TypeName {
        self.destination.shape().element()
    }
}

impl fmt::Display for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) -> {} ({}) [{}, {}",
            self.source,
            self.source.shape(),
            self.destination,
            self.destination.shape(),
            self.strategy,
            self.null_policy
        )?;
        if let Some(id) = &self.converter_id {
            write!(f, ", converter={id}")?;
        }
        if self.origin == BindingOrigin::Implicit {
            f.write_str(", implicit")?;
        }
        f.write_str("]")
    }
}

// ── Plan ─────────────────────────────────────────────────────────────────────

/// Ordered bindings for one type pair.
#[derive(Debug, Clone)]
pub struct CorrespondencePlan {
    pub pair: TypePair,
    pub source: Arc<TypeDescriptor>,
    pub destination: Arc<TypeDescriptor>,
    pub bindings: Vec<FieldBinding>,
    pub configuration: GlobalConfiguration,
    /// Label of the class rule the plan was built from, if any.
    pub rule: Option<String>,
}

impl CorrespondencePlan {
    pub fn is_explicit(&self) -> bool {
        self.rule.is_some()
    }

    pub fn binding_for(&self, destination: &str) -> Option<&FieldBinding> {
        self.bindings
            .iter()
            .find(|b| b.destination.as_str() == destination)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for CorrespondencePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pair)?;
        if let Some(rule) = &self.rule {
            write!(f, " (rule: {rule})")?;
        }
        for binding in &self.bindings {
            write!(f, "\n  {binding}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TypeCatalog {
        TypeCatalog::builder()
            .register(TypeDescriptor::bean("Address").with_single("city", "string"))
            .register(
                TypeDescriptor::bean("Person")
                    .with_single("name", "string")
                    .with_single("address", "Address")
                    .with_field("tags", FieldShape::List("string".into())),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn resolves_deep_path_to_indices() {
        let catalog = catalog();
        let person = catalog.lookup("Person").unwrap();
        let path = FieldPath::resolve(&catalog, person, "address.city").unwrap();

        assert!(path.is_deep());
        let indices: Vec<_> = path.steps().iter().map(|s| s.index).collect();
        assert_eq!(indices, [1, 0]);
        assert_eq!(path.shape(), &FieldShape::Single("string".into()));
    }

    #[test]
    fn unknown_segment_is_reported() {
        let catalog = catalog();
        let person = catalog.lookup("Person").unwrap();
        let err = FieldPath::resolve(&catalog, person, "address.zip").unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownField {
                type_name: "Address".into(),
                field: "zip".into()
            }
        );
    }

    #[test]
    fn cannot_walk_through_scalar_or_container() {
        let catalog = catalog();
        let person = catalog.lookup("Person").unwrap();
        assert!(FieldPath::resolve(&catalog, person, "name.length").is_err());
        assert!(matches!(
            FieldPath::resolve(&catalog, person, "tags.first"),
            Err(DomainError::IncompatibleShapes { .. })
        ));
        assert!(FieldPath::resolve(&catalog, person, "address..city").is_err());
    }

    #[test]
    fn type_pair_display_includes_map_id() {
        let pair = TypePair::new("A", "B").with_map_id(Some("brief".into()));
        assert_eq!(pair.to_string(), "A -> B [brief]");
    }
}
