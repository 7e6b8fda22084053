//! Rule source implementations that hold rules in process.

mod memory;

pub use memory::InMemoryRuleSource;
