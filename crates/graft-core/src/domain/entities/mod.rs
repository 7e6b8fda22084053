pub mod descriptor;
pub mod object;
pub mod plan;
pub mod rule;

pub use crate::domain::DomainError;
pub use descriptor::{TypeCatalog, TypeDescriptor};
pub use object::{ObjectArena, ObjectId, Value};
pub use plan::{CorrespondencePlan, FieldBinding, TypePair};
pub use rule::{ClassRule, FieldRule, GlobalConfiguration, RuleSet};
