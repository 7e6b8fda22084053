//! In-memory rule source.

use std::sync::{Arc, RwLock};

use graft_core::{
    application::{ApplicationError, ports::RuleSource},
    domain::{ClassRule, GlobalConfiguration, RuleSet},
    error::GraftResult,
};

/// Thread-safe, shareable rule source.
///
/// Clones share the same rules, so a handle can keep adding rules after
/// another handle was given to a mapper. Only rules present when the mapper
/// initializes are used.
#[derive(Clone)]
pub struct InMemoryRuleSource {
    name: String,
    inner: Arc<RwLock<RuleSet>>,
}

impl InMemoryRuleSource {
    /// Create a new empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(RwLock::new(RuleSet::new())),
        }
    }

    pub fn from_rules(name: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(RwLock::new(rules)),
        }
    }

    pub fn add(&self, rule: ClassRule) -> GraftResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        inner.mappings.push(rule);
        Ok(())
    }

    pub fn set_configuration(&self, configuration: GlobalConfiguration) -> GraftResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        inner.configuration = Some(configuration);
        Ok(())
    }

    /// Get the number of class rules.
    pub fn len(&self) -> usize {
        self.inner.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every rule and the configuration.
    pub fn clear(&self) -> GraftResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        *inner = RuleSet::new();
        Ok(())
    }
}

impl Default for InMemoryRuleSource {
    fn default() -> Self {
        Self::new("in-memory rules")
    }
}

impl RuleSource for InMemoryRuleSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> GraftResult<RuleSet> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        inner.validate()?;
        Ok(inner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::domain::NullPolicy;

    #[test]
    fn clones_share_rules() {
        let source = InMemoryRuleSource::default();
        let handle = source.clone();

        handle.add(ClassRule::new("A", "B")).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.load().unwrap().len(), 1);
    }

    #[test]
    fn configuration_is_carried() {
        let source = InMemoryRuleSource::new("config");
        source
            .set_configuration(GlobalConfiguration {
                null_policy: NullPolicy::SkipIfNull,
                ..Default::default()
            })
            .unwrap();

        let rules = source.load().unwrap();
        assert_eq!(rules.configuration().null_policy, NullPolicy::SkipIfNull);
        assert_eq!(source.name(), "config");
    }

    #[test]
    fn clear_empties_the_source() {
        let source = InMemoryRuleSource::from_rules(
            "seeded",
            RuleSet::new().with_rule(ClassRule::new("A", "B")),
        );
        assert!(!source.is_empty());

        source.clear().unwrap();
        assert!(source.is_empty());
        assert!(source.load().unwrap().configuration.is_none());
    }

    #[test]
    fn invalid_rules_fail_to_load() {
        let source = InMemoryRuleSource::default();
        source.add(ClassRule::new("A", "A").field("", "x")).unwrap();
        assert!(source.load().is_err());
    }
}
