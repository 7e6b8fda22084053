//! Rule resolution: from class rules to a [`CorrespondencePlan`].
//!
//! Resolution runs once per [`TypePair`] (the cache guarantees it):
//!
//! 1. Pick the class rule: an exact match on (source, destination, map-id),
//!    else the most specific rule declared for supertypes of both sides.
//! 2. Bind the rule's field rules in declaration order.
//! 3. If wildcard matching is on, bind every remaining destination field to
//!    the source field of the same name. A deep explicit destination
//!    (`address.city`) does not cover its head field (`address`).
//! 4. Check container shapes and converter availability, and fold the
//!    global defaults into each binding.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::application::services::cache::CorrespondenceCache;
use crate::application::services::conversion::ConversionRegistry;
use crate::domain::{
    BindingOrigin, ContainerStrategy, CorrespondencePlan, DirectedField, DirectedRule,
    DomainError, FieldBinding, FieldPath, FieldShape, GlobalConfiguration, TypeCatalog,
    TypeDescriptor, TypeName, TypePair, check_date_format,
};
use crate::error::GraftResult;

/// Builds plans from a fixed rule set. Borrowed view over the mapper state.
pub struct RuleResolver<'a> {
    catalog: &'a TypeCatalog,
    rules: &'a [DirectedRule],
    configuration: &'a GlobalConfiguration,
    registry: &'a ConversionRegistry,
    cache: &'a CorrespondenceCache,
}

impl<'a> RuleResolver<'a> {
    pub fn new(
        catalog: &'a TypeCatalog,
        rules: &'a [DirectedRule],
        configuration: &'a GlobalConfiguration,
        registry: &'a ConversionRegistry,
        cache: &'a CorrespondenceCache,
    ) -> Self {
        Self {
            catalog,
            rules,
            configuration,
            registry,
            cache,
        }
    }

    /// Resolve the plan for `pair`.
    ///
    /// # Errors
    /// Every error is a configuration error: unknown types or fields,
    /// ambiguous rules or converters, an unknown map-id, incompatible
    /// container shapes.
    #[instrument(skip_all, fields(pair = %pair))]
    pub fn resolve(&self, pair: &TypePair) -> GraftResult<CorrespondencePlan> {
        let source = self.catalog.require(&pair.source)?;
        let destination = self.catalog.require(&pair.destination)?;
        for desc in [source, destination] {
            if !desc.is_bean() {
                return Err(DomainError::InvalidRule(format!(
                    "'{}' is a scalar type; only bean types can be mapped",
                    desc.name()
                ))
                .into());
            }
        }

        let rule = self.select_rule(pair)?;
        let configuration = self.effective_configuration(rule);
        check_date_format(&configuration.date_format)?;
        debug!(
            rule = rule.map(|r| r.label.as_str()).unwrap_or("<implicit>"),
            reversed = rule.is_some_and(|r| r.reversed),
            wildcard = configuration.wildcard,
            "Selected class rule"
        );

        let mut bindings = Vec::new();
        let mut covered: HashSet<String> = HashSet::new();
        let excluded: &[String] = rule.map(|r| r.excluded_destinations.as_slice()).unwrap_or(&[]);

        if let Some(rule) = rule {
            for field in &rule.fields {
                let binding = self.explicit_binding(source, destination, field, &configuration)?;
                let head = &binding.destination.steps()[0].field;
                if excluded.iter().any(|e| e == head || e == binding.destination.as_str()) {
                    debug!(field = %binding.destination, "Skipping excluded field");
                    continue;
                }
                // Keyed on the full path: `address.city` leaves the implicit
                // `address` match in place.
                covered.insert(binding.destination.as_str().to_owned());
                bindings.push(binding);
            }
        }

        if configuration.wildcard {
            for field in destination.fields() {
                if covered.contains(&field.name) || excluded.contains(&field.name) {
                    continue;
                }
                if source.field(&field.name).is_none() {
                    continue;
                }
                bindings.push(self.implicit_binding(source, destination, &field.name, &configuration)?);
            }
        }

        Ok(CorrespondencePlan {
            pair: pair.clone(),
            source: source.clone(),
            destination: destination.clone(),
            bindings,
            configuration,
            rule: rule.map(|r| r.label.clone()),
        })
    }

    // ── Rule selection ───────────────────────────────────────────────────────

    fn select_rule(&self, pair: &TypePair) -> GraftResult<Option<&'a DirectedRule>> {
        if let Some(rule) = self.select_in_context(pair, pair.map_id.as_ref())? {
            return Ok(Some(rule));
        }

        if let Some(map_id) = &pair.map_id {
            // A known map-id falls back to the default context for pairs it
            // does not mention (nested objects, typically).
            if !self.rules.iter().any(|r| r.map_id.as_ref() == Some(map_id)) {
                return Err(DomainError::UnknownMapId {
                    map_id: map_id.to_string(),
                    source_type: pair.source.to_string(),
                    destination: pair.destination.to_string(),
                }
                .into());
            }
            return self.select_in_context(pair, None);
        }

        Ok(None)
    }

    fn select_in_context(
        &self,
        pair: &TypePair,
        map_id: Option<&crate::domain::MapId>,
    ) -> GraftResult<Option<&'a DirectedRule>> {
        let in_context = || self.rules.iter().filter(move |r| r.map_id.as_ref() == map_id);

        let exact = distinct_rules(
            in_context().filter(|r| r.source == pair.source && r.destination == pair.destination),
        );
        match exact.len() {
            0 => {}
            1 => return Ok(Some(exact[0])),
            _ => return Err(ambiguous(pair, &exact).into()),
        }

        let candidates = distinct_rules(in_context().filter(|r| {
            self.cache.is_subtype(self.catalog, &pair.source, &r.source)
                && self.cache.is_subtype(self.catalog, &pair.destination, &r.destination)
        }));

        // Drop every candidate some other candidate is strictly more
        // specific than.
        let most_specific: Vec<&DirectedRule> = candidates
            .iter()
            .copied()
            .filter(|c| !candidates.iter().any(|d| self.more_specific(d, c)))
            .collect();

        match most_specific.len() {
            0 => Ok(None),
            1 => Ok(Some(most_specific[0])),
            _ => Err(ambiguous(pair, &most_specific).into()),
        }
    }

    fn more_specific(&self, d: &DirectedRule, c: &DirectedRule) -> bool {
        let same = d.source == c.source && d.destination == c.destination;
        !same
            && self.cache.is_subtype(self.catalog, &d.source, &c.source)
            && self.cache.is_subtype(self.catalog, &d.destination, &c.destination)
    }

    fn effective_configuration(&self, rule: Option<&DirectedRule>) -> GlobalConfiguration {
        let global = self.configuration;
        match rule {
            None => global.clone(),
            Some(rule) => GlobalConfiguration {
                null_policy: rule.null_policy.unwrap_or(global.null_policy),
                date_format: rule
                    .date_format
                    .clone()
                    .unwrap_or_else(|| global.date_format.clone()),
                strict: global.strict,
                wildcard: rule.wildcard.unwrap_or(global.wildcard),
            },
        }
    }

    // ── Bindings ─────────────────────────────────────────────────────────────

    fn explicit_binding(
        &self,
        source: &TypeDescriptor,
        destination: &TypeDescriptor,
        field: &DirectedField,
        class: &GlobalConfiguration,
    ) -> GraftResult<FieldBinding> {
        let source_path = FieldPath::resolve(self.catalog, source, &field.source)?;
        let destination_path = FieldPath::resolve(self.catalog, destination, &field.destination)?;

        if let Some(id) = &field.converter_id {
            if !self.registry.has_id(id) {
                return Err(DomainError::UnknownConverter { id: id.clone() }.into());
            }
        }

        let strategy = self.strategy(
            destination_path.as_str(),
            source_path.shape(),
            destination_path.shape(),
            field.converter_id.is_some(),
        )?;
        if field.converter_id.is_none() {
            self.check_converters(&destination_path, source_path.shape(), destination_path.shape(), field.map_keys)?;
        }

        let date_format = field
            .date_format
            .clone()
            .unwrap_or_else(|| class.date_format.clone());
        check_date_format(&date_format)?;

        Ok(FieldBinding {
            source: source_path,
            destination: destination_path,
            converter_id: field.converter_id.clone(),
            strategy,
            null_policy: field.null_policy.unwrap_or(class.null_policy),
            date_format,
            map_keys: field.map_keys,
            origin: BindingOrigin::Explicit,
        })
    }

    fn implicit_binding(
        &self,
        source: &TypeDescriptor,
        destination: &TypeDescriptor,
        name: &str,
        class: &GlobalConfiguration,
    ) -> GraftResult<FieldBinding> {
        let source_path = FieldPath::resolve(self.catalog, source, name)?;
        let destination_path = FieldPath::resolve(self.catalog, destination, name)?;
        let strategy = self.strategy(name, source_path.shape(), destination_path.shape(), false)?;
        self.check_converters(&destination_path, source_path.shape(), destination_path.shape(), false)?;

        Ok(FieldBinding {
            source: source_path,
            destination: destination_path,
            converter_id: None,
            strategy,
            null_policy: class.null_policy,
            date_format: class.date_format.clone(),
            map_keys: false,
            origin: BindingOrigin::Implicit,
        })
    }

    /// Container strategy for a pair of declared shapes.
    ///
    /// With an explicit converter, matching container kinds convert element
    /// by element and anything else converts the whole value.
    fn strategy(
        &self,
        field: &str,
        source: &FieldShape,
        destination: &FieldShape,
        has_converter: bool,
    ) -> Result<ContainerStrategy, DomainError> {
        let (s, d) = (source.strategy(), destination.strategy());
        let compatible = (s == ContainerStrategy::Single && d == ContainerStrategy::Single)
            || (s.is_sequence() && d.is_sequence())
            || (s == ContainerStrategy::Map && d == ContainerStrategy::Map);

        if compatible {
            Ok(d)
        } else if has_converter {
            Ok(ContainerStrategy::Single)
        } else {
            Err(DomainError::IncompatibleShapes {
                field: field.to_owned(),
                source_shape: source.to_string(),
                destination_shape: destination.to_string(),
            })
        }
    }

    /// Scalar element pairs of different types need an unambiguous converter.
    /// A missing converter is reported when a value actually arrives.
    fn check_converters(
        &self,
        path: &FieldPath,
        source: &FieldShape,
        destination: &FieldShape,
        map_keys: bool,
    ) -> Result<(), DomainError> {
        let mut pairs = vec![(source.element(), destination.element())];
        if map_keys {
            if let (Some(sk), Some(dk)) = (source.key(), destination.key()) {
                pairs.push((sk, dk));
            }
        }

        for (s, d) in pairs {
            if !self.both_scalar(s, d) || self.cache.is_subtype(self.catalog, s, d) {
                continue;
            }
            self.cache
                .converter(self.registry, self.catalog, s, d)
                .map_err(|e| match e {
                    DomainError::AmbiguousConverter { candidates, .. } => DomainError::AmbiguousConverter {
                        source_type: format!("{s} (field '{path}')"),
                        destination: d.to_string(),
                        candidates,
                    },
                    other => other,
                })?;
        }
        Ok(())
    }

    fn both_scalar(&self, a: &TypeName, b: &TypeName) -> bool {
        let scalar = |n: &TypeName| self.catalog.get(n).is_some_and(|d| !d.is_bean());
        scalar(a) && scalar(b)
    }
}

/// One view per class rule; a self-mapping rule shows up in both directions.
fn distinct_rules<'r>(rules: impl Iterator<Item = &'r DirectedRule>) -> Vec<&'r DirectedRule> {
    let mut seen = HashSet::new();
    rules.filter(|r| seen.insert(r.rule_index)).collect()
}

fn ambiguous(pair: &TypePair, rules: &[&DirectedRule]) -> DomainError {
    DomainError::AmbiguousRule {
        source_type: pair.source.to_string(),
        destination: pair.destination.to_string(),
        candidates: rules
            .iter()
            .map(|r| r.label.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassRule, FieldRule, NullPolicy, RuleSet};
    use crate::error::GraftError;

    fn catalog() -> TypeCatalog {
        TypeCatalog::builder()
            .register(TypeDescriptor::bean("Address").with_single("city", "string"))
            .register(
                TypeDescriptor::bean("Person")
                    .with_single("name", "string")
                    .with_single("age", "string")
                    .with_single("address", "Address")
                    .with_field("tags", FieldShape::List("string".into())),
            )
            .register(
                TypeDescriptor::bean("PersonDto")
                    .with_single("fullName", "string")
                    .with_single("name", "string")
                    .with_single("age", "int")
                    .with_single("city", "string")
                    .with_field("tags", FieldShape::Set("string".into())),
            )
            .register(TypeDescriptor::bean("Animal").with_single("name", "string"))
            .register(TypeDescriptor::bean("Dog").extends("Animal"))
            .register(TypeDescriptor::bean("Pet").with_single("name", "string"))
            .register(TypeDescriptor::bean("PetDto").with_single("name", "string"))
            .register(TypeDescriptor::bean("Mismatch").with_field("name", FieldShape::List("string".into())))
            .build()
            .unwrap()
    }

    fn resolve(rules: RuleSet, pair: TypePair) -> GraftResult<CorrespondencePlan> {
        let catalog = catalog();
        let directed = rules.directed_rules();
        let configuration = rules.configuration();
        let registry = ConversionRegistry::with_builtins();
        let cache = CorrespondenceCache::new();
        RuleResolver::new(&catalog, &directed, &configuration, &registry, &cache).resolve(&pair)
    }

    fn destinations(plan: &CorrespondencePlan) -> Vec<&str> {
        plan.bindings.iter().map(|b| b.destination.as_str()).collect()
    }

    #[test]
    fn explicit_bindings_come_before_implicit_ones() {
        let rules = RuleSet::new().with_rule(
            ClassRule::new("Person", "PersonDto")
                .field("name", "fullName")
                .field("address.city", "city"),
        );
        let plan = resolve(rules, TypePair::new("Person", "PersonDto")).unwrap();

        assert_eq!(destinations(&plan), ["fullName", "city", "name", "age", "tags"]);
        assert_eq!(plan.bindings[0].origin, BindingOrigin::Explicit);
        assert_eq!(plan.bindings[2].origin, BindingOrigin::Implicit);
        assert_eq!(plan.bindings[4].strategy, ContainerStrategy::Set);
        assert!(plan.is_explicit());
    }

    #[test]
    fn without_rules_only_same_names_bind() {
        let plan = resolve(RuleSet::new(), TypePair::new("Person", "PersonDto")).unwrap();
        assert_eq!(destinations(&plan), ["name", "age", "tags"]);
        assert!(!plan.is_explicit());
    }

    #[test]
    fn wildcard_off_and_excludes() {
        let rules = RuleSet::new().with_rule(
            ClassRule::new("Person", "PersonDto")
                .wildcard(false)
                .field("name", "fullName"),
        );
        let plan = resolve(rules, TypePair::new("Person", "PersonDto")).unwrap();
        assert_eq!(destinations(&plan), ["fullName"]);

        let rules = RuleSet::new().with_rule(ClassRule::new("Person", "PersonDto").exclude("age"));
        let plan = resolve(rules, TypePair::new("Person", "PersonDto")).unwrap();
        assert_eq!(destinations(&plan), ["name", "tags"]);
    }

    #[test]
    fn reversed_rule_serves_the_other_direction() {
        let rules = RuleSet::new().with_rule(
            ClassRule::new("Person", "PersonDto")
                .field("name", "fullName")
                .field_rule(FieldRule::new("address.city", "city").one_way()),
        );
        let plan = resolve(rules, TypePair::new("PersonDto", "Person")).unwrap();
        assert_eq!(plan.bindings[0].source.as_str(), "fullName");
        assert_eq!(plan.bindings[0].destination.as_str(), "name");
        assert!(plan.binding_for("address.city").is_none());
    }

    #[test]
    fn overrides_are_merged_field_first() {
        let rules = RuleSet::new().with_rule(
            ClassRule::new("Person", "PersonDto")
                .null_policy(NullPolicy::SkipIfNull)
                .field_rule(FieldRule::new("name", "fullName").null_policy(NullPolicy::MapEmptyStringAsNull)),
        );
        let plan = resolve(rules, TypePair::new("Person", "PersonDto")).unwrap();
        assert_eq!(plan.bindings[0].null_policy, NullPolicy::MapEmptyStringAsNull);
        assert_eq!(plan.binding_for("name").unwrap().null_policy, NullPolicy::SkipIfNull);
    }

    #[test]
    fn supertype_rule_applies_to_subtypes() {
        let rules = RuleSet::new().with_rule(ClassRule::new("Animal", "PetDto").wildcard(false).field("name", "name"));
        let plan = resolve(rules, TypePair::new("Dog", "PetDto")).unwrap();
        assert_eq!(plan.rule.as_deref(), Some("Animal <-> PetDto"));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn unrelated_equally_specific_rules_are_ambiguous() {
        let catalog = TypeCatalog::builder()
            .register(TypeDescriptor::bean("A"))
            .register(TypeDescriptor::bean("B"))
            .register(TypeDescriptor::bean("C").extends("A").extends("B"))
            .register(TypeDescriptor::bean("D"))
            .build()
            .unwrap();
        let rules = RuleSet::new()
            .with_rule(ClassRule::new("A", "D").one_way())
            .with_rule(ClassRule::new("B", "D").one_way());
        let directed = rules.directed_rules();
        let configuration = rules.configuration();
        let registry = ConversionRegistry::new();
        let cache = CorrespondenceCache::new();
        let err = RuleResolver::new(&catalog, &directed, &configuration, &registry, &cache)
            .resolve(&TypePair::new("C", "D"))
            .unwrap_err();

        assert!(matches!(err, GraftError::Domain(DomainError::AmbiguousRule { .. })));
    }

    #[test]
    fn unknown_map_id_is_an_error() {
        let rules = RuleSet::new().with_rule(ClassRule::new("Person", "PersonDto").map_id("brief"));
        let err = resolve(
            rules.clone(),
            TypePair::new("Person", "PersonDto").with_map_id(Some("full".into())),
        )
        .unwrap_err();
        assert!(matches!(err, GraftError::Domain(DomainError::UnknownMapId { .. })));

        // A known map-id without a rule for this pair uses the default context.
        let plan = resolve(rules, TypePair::new("Pet", "PetDto").with_map_id(Some("brief".into()))).unwrap();
        assert_eq!(destinations(&plan), ["name"]);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let err = resolve(RuleSet::new(), TypePair::new("Mismatch", "PetDto")).unwrap_err();
        assert!(matches!(err, GraftError::Domain(DomainError::IncompatibleShapes { .. })));
    }

    #[test]
    fn deep_destination_keeps_the_implicit_head_match() {
        let catalog = TypeCatalog::builder()
            .register(TypeDescriptor::bean("Address").with_single("city", "string"))
            .register(
                TypeDescriptor::bean("Order")
                    .with_single("town", "string")
                    .with_single("address", "Address"),
            )
            .register(TypeDescriptor::bean("OrderDto").with_single("address", "Address"))
            .build()
            .unwrap();
        let rules = RuleSet::new().with_rule(ClassRule::new("Order", "OrderDto").field("town", "address.city"));
        let directed = rules.directed_rules();
        let configuration = rules.configuration();
        let registry = ConversionRegistry::with_builtins();
        let cache = CorrespondenceCache::new();
        let plan = RuleResolver::new(&catalog, &directed, &configuration, &registry, &cache)
            .resolve(&TypePair::new("Order", "OrderDto"))
            .unwrap();

        let bound: Vec<&str> = plan.bindings.iter().map(|b| b.destination.as_str()).collect();
        assert_eq!(bound, ["address.city", "address"]);
        assert_eq!(plan.bindings[1].origin, BindingOrigin::Implicit);
    }

    #[test]
    fn unrenderable_date_formats_fail_resolution() {
        let rules = RuleSet::new().with_rule(
            ClassRule::new("Person", "PersonDto")
                .field_rule(FieldRule::new("name", "fullName").date_format("%Y-%m-%d %z")),
        );
        assert!(matches!(
            resolve(rules, TypePair::new("Person", "PersonDto")),
            Err(GraftError::Domain(DomainError::InvalidRule(_)))
        ));

        let rules = RuleSet::new().with_rule(ClassRule::new("Person", "PersonDto").date_format("%Q"));
        assert!(matches!(
            resolve(rules, TypePair::new("Person", "PersonDto")),
            Err(GraftError::Domain(DomainError::InvalidRule(_)))
        ));
    }

    #[test]
    fn unknown_field_and_converter_are_errors() {
        let rules = RuleSet::new().with_rule(ClassRule::new("Person", "PersonDto").field("nickname", "name"));
        assert!(matches!(
            resolve(rules, TypePair::new("Person", "PersonDto")),
            Err(GraftError::Domain(DomainError::UnknownField { .. }))
        ));

        let rules = RuleSet::new().with_rule(
            ClassRule::new("Person", "PersonDto").field_rule(FieldRule::new("name", "fullName").converter("shout")),
        );
        assert!(matches!(
            resolve(rules, TypePair::new("Person", "PersonDto")),
            Err(GraftError::Domain(DomainError::UnknownConverter { .. }))
        ));
    }
}
