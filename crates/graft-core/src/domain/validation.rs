use crate::domain::{
    entities::{ClassRule, RuleSet, TypeCatalog},
    error::DomainError,
};

/// Centralized domain validation.
///
/// Checks that only need the rule records and the catalog. Anything that
/// needs resolved paths happens in the resolver.
pub struct DomainValidator;

impl DomainValidator {
    /// Both sides of the rule must be registered beans.
    pub fn validate_rule_types(rule: &ClassRule, catalog: &TypeCatalog) -> Result<(), DomainError> {
        for name in [&rule.type_a, &rule.type_b] {
            let descriptor = catalog.require(name)?;
            if !descriptor.is_bean() {
                return Err(DomainError::InvalidRule(format!(
                    "mapping '{}' references scalar type '{}'",
                    rule.label(),
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn validate_against_catalog(rules: &RuleSet, catalog: &TypeCatalog) -> Result<(), DomainError> {
        rules.validate()?;
        rules
            .mappings
            .iter()
            .try_for_each(|rule| Self::validate_rule_types(rule, catalog))
    }
}
