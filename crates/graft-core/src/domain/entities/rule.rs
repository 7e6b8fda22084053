//! Mapping rule records.
//!
//! These are the engine's input, produced by whatever rule source the mapper
//! is configured with (TOML files, code, tests). They are plain data: names
//! are not checked against the type catalog until a plan that uses them is
//! resolved.
//!
//! A [`ClassRule`] is written between `type-a` and `type-b` and is
//! bidirectional unless marked `one-way`. The resolver never looks at a rule
//! directly; it asks for the rule's [`DirectedRule`] views, which already
//! have field rules swapped for the B → A direction.

use std::fmt::Write as _;

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    value_objects::{MapId, NullPolicy, TypeName},
};

/// Default `date-format` when neither rule nor configuration sets one.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `date` with a strftime `format`.
///
/// `None` when the format has an unknown specifier or one a date without
/// a time zone cannot fill (`%z`, `%Z`).
pub fn format_date(date: &NaiveDateTime, format: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.iter())).ok()?;
    Some(out)
}

/// Reject a `date-format` that [`format_date`] cannot render.
pub fn check_date_format(format: &str) -> Result<(), DomainError> {
    match format_date(&NaiveDateTime::default(), format) {
        Some(_) => Ok(()),
        None => Err(DomainError::InvalidRule(format!(
            "date format '{format}' cannot render a date-time without a time zone"
        ))),
    }
}

fn default_true() -> bool {
    true
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_owned()
}

// ── Global configuration ─────────────────────────────────────────────────────

/// Defaults inherited by every binding that does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfiguration {
    #[serde(default)]
    pub null_policy: NullPolicy,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Abort the whole call on the first conversion failure.
    #[serde(default)]
    pub strict: bool,
    /// Implicit same-name matching for rules that do not say otherwise.
    #[serde(default = "default_true")]
    pub wildcard: bool,
}

impl Default for GlobalConfiguration {
    fn default() -> Self {
        Self {
            null_policy: NullPolicy::default(),
            date_format: default_date_format(),
            strict: false,
            wildcard: true,
        }
    }
}

// ── Field rules ──────────────────────────────────────────────────────────────

/// Explicit binding between a path on `type-a` and a path on `type-b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldRule {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub converter_id: Option<String>,
    #[serde(default)]
    pub null_policy: Option<NullPolicy>,
    #[serde(default)]
    pub date_format: Option<String>,
    /// Only applies in the A → B direction.
    #[serde(default)]
    pub one_way: bool,
    /// Map keys of map-shaped fields through the engine instead of copying.
    #[serde(default)]
    pub map_keys: bool,
}

impl FieldRule {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            converter_id: None,
            null_policy: None,
            date_format: None,
            one_way: false,
            map_keys: false,
        }
    }

    pub fn converter(mut self, id: impl Into<String>) -> Self {
        self.converter_id = Some(id.into());
        self
    }

    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = Some(policy);
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    pub fn one_way(mut self) -> Self {
        self.one_way = true;
        self
    }

    pub fn map_keys(mut self) -> Self {
        self.map_keys = true;
        self
    }
}

/// Field pair that must never be bound, explicitly or implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldExclude {
    pub a: String,
    pub b: String,
}

// ── Class rules ──────────────────────────────────────────────────────────────

/// Mapping between two types, optionally under a named map-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassRule {
    pub type_a: TypeName,
    pub type_b: TypeName,
    #[serde(default)]
    pub map_id: Option<MapId>,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
    #[serde(default)]
    pub excludes: Vec<FieldExclude>,
    /// `None` inherits the global setting.
    #[serde(default)]
    pub wildcard: Option<bool>,
    #[serde(default)]
    pub one_way: bool,
    #[serde(default)]
    pub null_policy: Option<NullPolicy>,
    #[serde(default)]
    pub date_format: Option<String>,
}

impl ClassRule {
    pub fn new(type_a: impl Into<TypeName>, type_b: impl Into<TypeName>) -> Self {
        Self {
            type_a: type_a.into(),
            type_b: type_b.into(),
            map_id: None,
            fields: Vec::new(),
            excludes: Vec::new(),
            wildcard: None,
            one_way: false,
            null_policy: None,
            date_format: None,
        }
    }

    pub fn map_id(mut self, id: impl Into<MapId>) -> Self {
        self.map_id = Some(id.into());
        self
    }

    pub fn field(self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.field_rule(FieldRule::new(a, b))
    }

    pub fn field_rule(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Exclude a field that has the same name on both sides.
    pub fn exclude(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.exclude_pair(name.clone(), name)
    }

    pub fn exclude_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.excludes.push(FieldExclude {
            a: a.into(),
            b: b.into(),
        });
        self
    }

    pub fn wildcard(mut self, enabled: bool) -> Self {
        self.wildcard = Some(enabled);
        self
    }

    pub fn one_way(mut self) -> Self {
        self.one_way = true;
        self
    }

    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = Some(policy);
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Short human-readable label, e.g. `Person <-> PersonDto [summary]`.
    pub fn label(&self) -> String {
        let arrow = if self.one_way { "->" } else { "<->" };
        match &self.map_id {
            Some(id) => format!("{} {} {} [{}]", self.type_a, arrow, self.type_b, id),
            None => format!("{} {} {}", self.type_a, arrow, self.type_b),
        }
    }

    /// Directed views of this rule: A → B always, B → A unless one-way.
    pub fn directions(&self, index: usize) -> Vec<DirectedRule> {
        let mut out = vec![self.directed(index, false)];
        if !self.one_way {
            out.push(self.directed(index, true));
        }
        out
    }

    fn directed(&self, index: usize, reversed: bool) -> DirectedRule {
        let (source, destination) = if reversed {
            (self.type_b.clone(), self.type_a.clone())
        } else {
            (self.type_a.clone(), self.type_b.clone())
        };

        let fields = self
            .fields
            .iter()
            .filter(|f| !(reversed && f.one_way))
            .map(|f| {
                let (src, dst) = if reversed { (&f.b, &f.a) } else { (&f.a, &f.b) };
                DirectedField {
                    source: src.clone(),
                    destination: dst.clone(),
                    converter_id: f.converter_id.clone(),
                    null_policy: f.null_policy,
                    date_format: f.date_format.clone(),
                    map_keys: f.map_keys,
                }
            })
            .collect();

        let excludes = self
            .excludes
            .iter()
            .map(|e| if reversed { e.a.clone() } else { e.b.clone() })
            .collect();

        DirectedRule {
            rule_index: index,
            label: self.label(),
            reversed,
            source,
            destination,
            map_id: self.map_id.clone(),
            fields,
            excluded_destinations: excludes,
            wildcard: self.wildcard,
            null_policy: self.null_policy,
            date_format: self.date_format.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.type_a.as_str().is_empty() || self.type_b.as_str().is_empty() {
            return Err(DomainError::InvalidRule(format!(
                "mapping '{}' has an empty type name",
                self.label()
            )));
        }
        for field in &self.fields {
            if field.a.trim().is_empty() || field.b.trim().is_empty() {
                return Err(DomainError::InvalidRule(format!(
                    "mapping '{}' has a field rule with an empty path",
                    self.label()
                )));
            }
        }
        Ok(())
    }
}

/// A class rule seen from one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedRule {
    /// Position of the originating rule in the rule set.
    pub rule_index: usize,
    pub label: String,
    pub reversed: bool,
    pub source: TypeName,
    pub destination: TypeName,
    pub map_id: Option<MapId>,
    pub fields: Vec<DirectedField>,
    pub excluded_destinations: Vec<String>,
    pub wildcard: Option<bool>,
    pub null_policy: Option<NullPolicy>,
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedField {
    pub source: String,
    pub destination: String,
    pub converter_id: Option<String>,
    pub null_policy: Option<NullPolicy>,
    pub date_format: Option<String>,
    pub map_keys: bool,
}

// ── Rule set ─────────────────────────────────────────────────────────────────

/// Ordered class rules plus the global configuration, merged across sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub configuration: Option<GlobalConfiguration>,
    #[serde(default)]
    pub mappings: Vec<ClassRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ClassRule) -> Self {
        self.mappings.push(rule);
        self
    }

    pub fn with_configuration(mut self, configuration: GlobalConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Append `other`'s rules after ours.
    ///
    /// # Errors
    /// `ConflictingConfiguration` when both sides carry a different global
    /// configuration.
    pub fn merge(&mut self, other: RuleSet) -> Result<(), DomainError> {
        match (&self.configuration, other.configuration) {
            (Some(mine), Some(theirs)) if *mine != theirs => {
                return Err(DomainError::ConflictingConfiguration(format!(
                    "{mine:?} vs {theirs:?}"
                )));
            }
            (None, Some(theirs)) => self.configuration = Some(theirs),
            _ => {}
        }
        self.mappings.extend(other.mappings);
        Ok(())
    }

    /// Effective global configuration (defaults when none was given).
    pub fn configuration(&self) -> GlobalConfiguration {
        self.configuration.clone().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.mappings.iter().try_for_each(ClassRule::validate)
    }

    /// Every directed view of every rule, in rule order.
    pub fn directed_rules(&self) -> Vec<DirectedRule> {
        self.mappings
            .iter()
            .enumerate()
            .flat_map(|(i, rule)| rule.directions(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
