//! Tinker - a script playground for a typed and an untyped dialect
//!
//! # Architecture
//!
//! ```text
//! tinker-config  - dialects and configuration (pure data)
//! tinker-output  - output capture, rendering and views
//! tinker-store   - key-value persistence
//! tinker-core    - compiler adapter, sandbox and event loop
//! tinker-api     - session context, run state machine, errors
//! tinker-cli     - terminal host
//! ```
//!
//! # Quick Start
//!
//! ```
//! use tinker_workspace::{api, output::OutputSink, Dialect};
//!
//! let sink = OutputSink::new(&Default::default());
//! api::run("console.log('hi')", Dialect::Untyped, &api::RunConfig::default(), sink.clone()).unwrap();
//! assert_eq!(sink.rendered_lines(), vec!["hi"]);
//! ```

pub use tinker_api as api;
pub use tinker_config as config;
pub use tinker_core as core;
pub use tinker_output as output;
pub use tinker_store as store;

pub use tinker_api::{Dialect, RunConfig, SessionContext, TinkerError};
