//! tinker-output - the playground's output sink
//!
//! Everything a run prints ends up here: console calls made by executed code,
//! compile diagnostics, runtime errors and the completion value. Properties:
//! - **Append-only**: entries are immutable once created; there is no eviction
//! - **Atomic clear**: the sequence is emptied as a whole, never partially
//! - **Deterministic rendering**: identical values always render to identical text
//! - **Timestamped at append time**: entries of one run carry real elapsed times
//!
//! # Quick start
//!
//! ```
//! use tinker_config::OutputOptions;
//! use tinker_output::{OutputLevel, OutputSink};
//!
//! let sink = OutputSink::new(&OutputOptions::default());
//! sink.append_text(OutputLevel::Log, "hi");
//! assert_eq!(sink.rendered_lines(), vec!["hi".to_string()]);
//! ```
//!
//! Values coming from the script runtime implement [`OutputValue`]; the sink
//! decides how each kind of value is rendered (see [`render_value`]).

mod clock;
mod entry;
mod level;
mod render;
mod sink;
mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::LogEntry;
pub use level::OutputLevel;
pub use render::{
    render_value, render_values, OutputValue, StructureError, ValueKind, NULL_LABEL,
    UNDEFINED_LABEL,
};
pub use sink::OutputSink;
pub use view::{MemoryView, OutputView};
