// core.rs splits ledger responsibilities into submodules: the chain and
// pending pool, validation, and read-only queries.
pub mod chain;
pub mod query;
pub mod validation;

pub use chain::*;
pub use query::*;
pub use validation::*;
