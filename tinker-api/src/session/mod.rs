//! Session state: the context, its persistence and the canned examples

pub mod context;
pub mod examples;
pub mod store;

pub use context::{RunOutcome, RunState, SessionContext};
pub use examples::{canned_example, is_pristine};
pub use store::{SessionRecord, SessionStore};
