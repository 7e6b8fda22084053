//! Type descriptors and the type catalog.
//!
//! Descriptors replace runtime reflection: every type the engine can read or
//! write is registered up front with its declared supertypes and, for beans,
//! an ordered list of fields. Field order is significant: object instances
//! store their values by index, and plans address fields by that index.
//!
//! # Inheritance
//!
//! A bean may name other beans as supertypes. When the catalog is built, the
//! supertype fields are copied in front of the bean's own fields (own
//! declarations win on name clashes). Indices are only stable for a single
//! supertype without redeclared fields, so field paths address a field by
//! index on its declared owner and by name on any other runtime type.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::{
    error::DomainError,
    value_objects::{ContainerStrategy, ScalarKind, TypeName},
};

// ── Field shape ───────────────────────────────────────────────────────────────

/// Declared container shape of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldShape {
    Single(TypeName),
    List(TypeName),
    Set(TypeName),
    Array(TypeName),
    Map(TypeName, TypeName),
}

impl FieldShape {
    /// Element type: the field type for `Single`, the value type for `Map`.
    pub fn element(&self) -> &TypeName {
        match self {
            Self::Single(t) | Self::List(t) | Self::Set(t) | Self::Array(t) => t,
            Self::Map(_, v) => v,
        }
    }

    pub fn key(&self) -> Option<&TypeName> {
        match self {
            Self::Map(k, _) => Some(k),
            _ => None,
        }
    }

    pub fn strategy(&self) -> ContainerStrategy {
        match self {
            Self::Single(_) => ContainerStrategy::Single,
            Self::List(_) => ContainerStrategy::List,
            Self::Set(_) => ContainerStrategy::Set,
            Self::Array(_) => ContainerStrategy::Array,
            Self::Map(..) => ContainerStrategy::Map,
        }
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(t) => write!(f, "{t}"),
            Self::List(t) => write!(f, "list<{t}>"),
            Self::Set(t) => write!(f, "set<{t}>"),
            Self::Array(t) => write!(f, "array<{t}>"),
            Self::Map(k, v) => write!(f, "map<{k},{v}>"),
        }
    }
}

impl FromStr for FieldShape {
    type Err = DomainError;

    /// Parses `T`, `list<T>`, `set<T>`, `array<T>` and `map<K,V>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomainError::InvalidRule(format!("invalid field shape: '{s}'"));

        let Some(open) = s.find('<') else {
            if s.is_empty() || s.contains(['>', ',']) {
                return Err(invalid());
            }
            return Ok(Self::Single(TypeName::new(s)));
        };

        let inner = s[open + 1..].strip_suffix('>').ok_or_else(invalid)?;
        let container = s[..open].trim().to_ascii_lowercase();
        let name = |part: &str| -> Result<TypeName, DomainError> {
            let part = part.trim();
            if part.is_empty() || part.contains(['<', '>', ',']) {
                Err(invalid())
            } else {
                Ok(TypeName::new(part))
            }
        };

        match container.as_str() {
            "list" | "vec" => Ok(Self::List(name(inner)?)),
            "set" => Ok(Self::Set(name(inner)?)),
            "array" => Ok(Self::Array(name(inner)?)),
            "map" => {
                let (k, v) = inner.split_once(',').ok_or_else(invalid)?;
                Ok(Self::Map(name(k)?, name(v)?))
            }
            _ => Err(invalid()),
        }
    }
}

// ── Descriptors ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub shape: FieldShape,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Scalar(ScalarKind),
    Bean { fields: Vec<FieldDescriptor> },
}

/// A registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: TypeName,
    supertypes: Vec<TypeName>,
    kind: TypeKind,
}

impl TypeDescriptor {
    pub fn scalar(name: impl Into<TypeName>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            kind: TypeKind::Scalar(kind),
        }
    }

    pub fn bean(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            kind: TypeKind::Bean { fields: Vec::new() },
        }
    }

    /// Add a field. No-op on scalars.
    pub fn with_field(mut self, name: impl Into<String>, shape: FieldShape) -> Self {
        if let TypeKind::Bean { fields } = &mut self.kind {
            fields.push(FieldDescriptor::new(name, shape));
        }
        self
    }

    /// Shorthand for `with_field(name, FieldShape::Single(ty))`.
    pub fn with_single(self, name: impl Into<String>, ty: impl Into<TypeName>) -> Self {
        self.with_field(name, FieldShape::Single(ty.into()))
    }

    pub fn extends(mut self, supertype: impl Into<TypeName>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn supertypes(&self) -> &[TypeName] {
        &self.supertypes
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_bean(&self) -> bool {
        matches!(self.kind, TypeKind::Bean { .. })
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.kind {
            TypeKind::Scalar(kind) => Some(kind),
            TypeKind::Bean { .. } => None,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            TypeKind::Bean { fields } => fields,
            TypeKind::Scalar(_) => &[],
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|f| f.name == name)
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Immutable set of known types. Always contains the built-in scalars.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    types: HashMap<TypeName, Arc<TypeDescriptor>>,
    order: Vec<TypeName>,
}

impl TypeCatalog {
    pub fn builder() -> TypeCatalogBuilder {
        TypeCatalogBuilder::default()
    }

    /// Catalog holding only the built-in scalars.
    #[cfg(test)]
    pub(crate) fn builtin() -> Self {
        Self::builder()
            .build()
            .expect("built-in scalar catalog is always valid")
    }

    pub fn get(&self, name: &TypeName) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    pub fn require(&self, name: &TypeName) -> Result<&Arc<TypeDescriptor>, DomainError> {
        self.get(name).ok_or_else(|| DomainError::UnknownType {
            name: name.to_string(),
        })
    }

    pub fn lookup(&self, name: &str) -> Result<&Arc<TypeDescriptor>, DomainError> {
        self.require(&TypeName::new(name))
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    /// All registered types in registration order (built-ins first).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.order.iter().filter_map(|n| self.types.get(n))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `name` and all of its supertypes, breadth-first, each with its
    /// distance from `name` (0 for `name` itself).
    pub fn ancestors(&self, name: &TypeName) -> Vec<(TypeName, usize)> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([(name.clone(), 0usize)]);

        while let Some((current, distance)) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(desc) = self.types.get(&current) {
                for parent in &desc.supertypes {
                    queue.push_back((parent.clone(), distance + 1));
                }
            }
            out.push((current, distance));
        }
        out
    }

    /// Distance from `candidate` up to `target`, `None` if unrelated.
    pub fn supertype_distance(&self, candidate: &TypeName, target: &TypeName) -> Option<usize> {
        self.ancestors(candidate)
            .into_iter()
            .find(|(name, _)| name == target)
            .map(|(_, d)| d)
    }

    /// Whether a value of `candidate` can stand where `target` is expected.
    pub fn is_assignable(&self, candidate: &TypeName, target: &TypeName) -> bool {
        candidate == target || self.supertype_distance(candidate, target).is_some()
    }
}

/// Collects descriptors and validates them into a [`TypeCatalog`].
#[derive(Debug, Default)]
pub struct TypeCatalogBuilder {
    pending: Vec<TypeDescriptor>,
}

impl TypeCatalogBuilder {
    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.pending.push(descriptor);
        self
    }

    pub fn register_all(mut self, descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        self.pending.extend(descriptors);
        self
    }

    /// Validate references and flatten inherited bean fields.
    ///
    /// # Errors
    /// - `DuplicateType` when a name is registered twice (built-ins included)
    /// - `UnknownType` for a supertype or field type that is not registered
    /// - `InvalidRule` for an inheritance cycle or a bean extending a scalar
    pub fn build(self) -> Result<TypeCatalog, DomainError> {
        let mut raw: HashMap<TypeName, TypeDescriptor> = HashMap::new();
        let mut order = Vec::new();

        let builtins = ScalarKind::ALL
            .iter()
            .map(|k| TypeDescriptor::scalar(k.type_name(), *k));

        for desc in builtins.chain(self.pending) {
            if raw.contains_key(desc.name()) {
                return Err(DomainError::DuplicateType {
                    name: desc.name().to_string(),
                });
            }
            order.push(desc.name().clone());
            raw.insert(desc.name().clone(), desc);
        }

        for desc in raw.values() {
            for parent in desc.supertypes() {
                let parent_desc = raw.get(parent).ok_or_else(|| DomainError::UnknownType {
                    name: parent.to_string(),
                })?;
                if desc.is_bean() != parent_desc.is_bean() {
                    return Err(DomainError::InvalidRule(format!(
                        "'{}' cannot extend '{}': beans and scalars do not mix",
                        desc.name(),
                        parent
                    )));
                }
            }
            for field in desc.fields() {
                let referenced = std::iter::once(field.shape.element()).chain(field.shape.key());
                for ty in referenced {
                    if !raw.contains_key(ty) {
                        return Err(DomainError::UnknownType {
                            name: ty.to_string(),
                        });
                    }
                }
            }
        }

        let mut flattened: HashMap<TypeName, Arc<TypeDescriptor>> = HashMap::new();
        for name in &order {
            flatten(name, &raw, &mut flattened, &mut Vec::new())?;
        }

        Ok(TypeCatalog {
            types: flattened,
            order,
        })
    }
}

fn flatten(
    name: &TypeName,
    raw: &HashMap<TypeName, TypeDescriptor>,
    done: &mut HashMap<TypeName, Arc<TypeDescriptor>>,
    stack: &mut Vec<TypeName>,
) -> Result<Arc<TypeDescriptor>, DomainError> {
    if let Some(existing) = done.get(name) {
        return Ok(existing.clone());
    }
    if stack.contains(name) {
        return Err(DomainError::InvalidRule(format!(
            "inheritance cycle through '{name}'"
        )));
    }

    let desc = &raw[name];
    let flat = match &desc.kind {
        TypeKind::Scalar(_) => desc.clone(),
        TypeKind::Bean { fields: own } => {
            stack.push(name.clone());
            let mut fields: Vec<FieldDescriptor> = Vec::new();
            for parent in &desc.supertypes {
                let parent = flatten(parent, raw, done, stack)?;
                for inherited in parent.fields() {
                    let shadowed = own.iter().any(|f| f.name == inherited.name)
                        || fields.iter().any(|f| f.name == inherited.name);
                    if !shadowed {
                        fields.push(inherited.clone());
                    }
                }
            }
            stack.pop();
            fields.extend(own.iter().cloned());
            TypeDescriptor {
                name: desc.name.clone(),
                supertypes: desc.supertypes.clone(),
                kind: TypeKind::Bean { fields },
            }
        }
    };

    let flat = Arc::new(flat);
    done.insert(name.clone(), flat.clone());
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_shapes() {
        assert_eq!(
            "Address".parse::<FieldShape>().unwrap(),
            FieldShape::Single("Address".into())
        );
        assert_eq!(
            "list<Address>".parse::<FieldShape>().unwrap(),
            FieldShape::List("Address".into())
        );
        assert_eq!(
            "map<string, int>".parse::<FieldShape>().unwrap(),
            FieldShape::Map("string".into(), "int".into())
        );
        assert!("list<".parse::<FieldShape>().is_err());
        assert!("tree<int>".parse::<FieldShape>().is_err());
        assert!("map<int>".parse::<FieldShape>().is_err());
    }

    #[test]
    fn builtin_catalog_has_scalars() {
        let catalog = TypeCatalog::builtin();
        for kind in ScalarKind::ALL {
            assert_eq!(
                catalog.lookup(kind.as_str()).unwrap().scalar_kind(),
                Some(kind)
            );
        }
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let err = TypeCatalog::builder()
            .register(TypeDescriptor::bean("A"))
            .register(TypeDescriptor::bean("A"))
            .build()
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateType { name: "A".into() });
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let err = TypeCatalog::builder()
            .register(TypeDescriptor::bean("A").with_single("b", "Missing"))
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownType { name } if name == "Missing"));
    }

    #[test]
    fn inherited_fields_come_first() {
        let catalog = TypeCatalog::builder()
            .register(TypeDescriptor::bean("Base").with_single("id", "int"))
            .register(
                TypeDescriptor::bean("Child")
                    .extends("Base")
                    .with_single("name", "string"),
            )
            .build()
            .unwrap();

        let child = catalog.lookup("Child").unwrap();
        let names: Vec<_> = child.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name"]);
        assert!(catalog.is_assignable(&"Child".into(), &"Base".into()));
        assert!(!catalog.is_assignable(&"Base".into(), &"Child".into()));
    }

    #[test]
    fn inheritance_cycle_is_rejected() {
        let result = TypeCatalog::builder()
            .register(TypeDescriptor::bean("A").extends("B"))
            .register(TypeDescriptor::bean("B").extends("A"))
            .build();
        assert!(matches!(result, Err(DomainError::InvalidRule(_))));
    }

    #[test]
    fn ancestors_are_breadth_first() {
        let catalog = TypeCatalog::builder()
            .register(TypeDescriptor::bean("Root"))
            .register(TypeDescriptor::bean("Mid").extends("Root"))
            .register(TypeDescriptor::bean("Leaf").extends("Mid"))
            .build()
            .unwrap();

        let chain = catalog.ancestors(&"Leaf".into());
        let expected: Vec<(TypeName, usize)> = vec![
            ("Leaf".into(), 0),
            ("Mid".into(), 1),
            ("Root".into(), 2),
        ];
        assert_eq!(chain, expected);
        assert_eq!(
            catalog.supertype_distance(&"Leaf".into(), &"Root".into()),
            Some(2)
        );
    }
}
