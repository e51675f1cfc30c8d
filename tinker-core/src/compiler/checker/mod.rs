//! Strict static checking of the typed dialect

mod builtins;
mod call;
#[allow(clippy::module_inception)]
mod checker;
mod env;
pub mod error;
mod expr;
pub mod lower;
mod narrow;
mod relation;
pub mod types;

pub use checker::{check_program, TypeChecker};
pub use error::{TypeCheckResult, TypeError};
pub use relation::is_assignable;
pub use types::Type;
