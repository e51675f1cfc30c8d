//! Tinker Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Tinker crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two script dialects a session can be authored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Statically typed dialect; compiled before execution
    #[serde(alias = "typescript", alias = "ts")]
    Typed,
    /// Dynamically typed dialect; executed as written
    #[serde(alias = "javascript", alias = "js")]
    Untyped,
}

impl Dialect {
    /// Both dialects, in selector order
    pub const ALL: [Dialect; 2] = [Dialect::Typed, Dialect::Untyped];

    /// Stable identifier used in persisted records and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Typed => "typed",
            Dialect::Untyped => "untyped",
        }
    }

    /// Human readable language name shown in the dialect selector
    pub fn display_name(&self) -> &'static str {
        match self {
            Dialect::Typed => "TypeScript",
            Dialect::Untyped => "JavaScript",
        }
    }

    /// Language mode identifier handed to the editing surface
    pub fn language_mode(&self) -> &'static str {
        match self {
            Dialect::Typed => "typescript",
            Dialect::Untyped => "javascript",
        }
    }

    /// Conventional source file extension
    pub fn file_extension(&self) -> &'static str {
        match self {
            Dialect::Typed => "ts",
            Dialect::Untyped => "js",
        }
    }

    /// Parse a dialect name (accepts identifiers, language names and extensions)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "typed" | "typescript" | "ts" => Some(Dialect::Typed),
            "untyped" | "javascript" | "js" => Some(Dialect::Untyped),
            _ => None,
        }
    }

    /// Whether source in this dialect passes through the compiler backend
    pub fn requires_compilation(&self) -> bool {
        matches!(self, Dialect::Typed)
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::Typed
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// ECMAScript language level the compiler emits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptTarget {
    #[serde(rename = "es5")]
    Es5,
    #[serde(rename = "es2015")]
    Es2015,
    #[serde(rename = "es2020")]
    Es2020,
}

impl ScriptTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptTarget::Es5 => "ES5",
            ScriptTarget::Es2015 => "ES2015",
            ScriptTarget::Es2020 => "ES2020",
        }
    }
}

/// Options handed to the compiler backend
///
/// The playground uses one fixed set (see [`CompilerOptions::default`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Output language level
    pub target: ScriptTarget,
    /// Strict type checking (strict null checks, no implicit any, ...)
    pub strict: bool,
    /// Interop helpers for module default imports
    pub es_module_interop: bool,
    /// Suppress emit (type check only)
    pub no_emit: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: ScriptTarget::Es2020,
            strict: true,
            es_module_interop: true,
            no_emit: false,
        }
    }
}

/// Limits applied to a single execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxLimits {
    /// Maximum nesting of script function calls before a RangeError is thrown
    pub max_call_depth: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self { max_call_depth: 256 }
    }
}

/// Output sink behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputOptions {
    /// Clear the output before every run
    pub clear_before_run: bool,
    /// chrono format string for entry timestamps
    pub timestamp_format: String,
    /// Prefix for completion-value entries
    pub result_prefix: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            clear_before_run: true,
            timestamp_format: "%H:%M:%S%.3f".to_string(),
            result_prefix: "→ ".to_string(),
        }
    }
}

/// Persistent storage layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageOptions {
    /// Key the session record is stored under
    pub session_key: String,
    /// Origin scope; file-backed stores keep one directory per origin
    pub origin: String,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            session_key: "tinker.session".to_string(),
            origin: "local".to_string(),
        }
    }
}

/// Complete playground configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TinkerConfig {
    pub compiler: CompilerOptions,
    pub limits: SandboxLimits,
    pub output: OutputOptions,
    pub storage: StorageOptions,
    /// Dialect used when no session has been saved yet
    pub default_dialect: Dialect,
}

/// Pipeline phase enum for phase-specific log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
    Checker,
    Compiler,
    Runtime,
    Session,
    Store,
    Host,
}

impl Phase {
    /// All phases, in pipeline order
    pub const ALL: [Phase; 8] = [
        Phase::Lexer,
        Phase::Parser,
        Phase::Checker,
        Phase::Compiler,
        Phase::Runtime,
        Phase::Session,
        Phase::Store,
        Phase::Host,
    ];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
            Phase::Checker => "checker",
            Phase::Compiler => "compiler",
            Phase::Runtime => "runtime",
            Phase::Session => "session",
            Phase::Store => "store",
            Phase::Host => "host",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("tinker::{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_compiler_options() {
        let opts = CompilerOptions::default();
        assert_eq!(opts.target, ScriptTarget::Es2020);
        assert!(opts.strict);
        assert!(opts.es_module_interop);
        assert!(!opts.no_emit);
    }

    #[test]
    fn test_default_limits() {
        assert_eq!(SandboxLimits::default().max_call_depth, 256);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("ts"), Some(Dialect::Typed));
        assert_eq!(Dialect::parse("JavaScript"), Some(Dialect::Untyped));
        assert_eq!(Dialect::parse(" untyped "), Some(Dialect::Untyped));
        assert_eq!(Dialect::parse("python"), None);
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::Typed.display_name(), "TypeScript");
        assert_eq!(Dialect::Untyped.language_mode(), "javascript");
        assert!(Dialect::Typed.requires_compilation());
        assert!(!Dialect::Untyped.requires_compilation());
    }

    #[test]
    fn test_dialect_serde_aliases() {
        let d: Dialect = serde_json::from_str("\"typescript\"").unwrap();
        assert_eq!(d, Dialect::Typed);
        assert_eq!(serde_json::to_string(&Dialect::Untyped).unwrap(), "\"untyped\"");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: TinkerConfig =
            serde_json::from_str(r#"{ "output": { "clearBeforeRun": false } }"#).unwrap();
        assert!(!cfg.output.clear_before_run);
        assert_eq!(cfg.output.result_prefix, "→ ");
        assert_eq!(cfg.compiler, CompilerOptions::default());
        assert_eq!(cfg.default_dialect, Dialect::Typed);
    }

    #[test]
    fn test_phase_as_str() {
        assert_eq!(Phase::Lexer.as_str(), "lexer");
        assert_eq!(Phase::Runtime.target(), "tinker::runtime");
        assert_eq!(Phase::ALL.len(), 8);
    }
}
