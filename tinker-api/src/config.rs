//! API-level configuration
//!
//! `RunConfig` bundles everything a session needs; a process-wide instance
//! can be installed once for hosts that prefer global access.

use crate::error::BootError;
use once_cell::sync::{Lazy, OnceCell};
use tinker_config::{CompilerOptions, Dialect, OutputOptions, SandboxLimits, StorageOptions, TinkerConfig};

/// Configuration for compiling and running playground code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub compiler: CompilerOptions,
    pub limits: SandboxLimits,
    pub output: OutputOptions,
    pub storage: StorageOptions,
    /// Dialect of the canned example shown when nothing was saved
    pub default_dialect: Dialect,
}

impl From<TinkerConfig> for RunConfig {
    fn from(config: TinkerConfig) -> Self {
        Self {
            compiler: config.compiler,
            limits: config.limits,
            output: config.output,
            storage: config.storage,
            default_dialect: config.default_dialect,
        }
    }
}

static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();
static DEFAULT_CONFIG: Lazy<RunConfig> = Lazy::new(RunConfig::default);

/// Install the process-wide configuration; only the first call succeeds
pub fn init(config: RunConfig) -> Result<(), BootError> {
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| BootError::ConfigAlreadyInitialized)
}

/// The installed configuration, or the defaults when none was installed
pub fn config() -> &'static RunConfig {
    GLOBAL_CONFIG.get().unwrap_or(&DEFAULT_CONFIG)
}

pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.default_dialect, Dialect::Typed);
        assert_eq!(cfg.limits.max_call_depth, 256);
        assert!(cfg.output.clear_before_run);
        assert_eq!(cfg.storage.session_key, "tinker.session");
    }

    #[test]
    fn test_from_tinker_config() {
        let mut config = TinkerConfig::default();
        config.default_dialect = Dialect::Untyped;
        config.limits.max_call_depth = 32;
        let run = RunConfig::from(config);
        assert_eq!(run.default_dialect, Dialect::Untyped);
        assert_eq!(run.limits.max_call_depth, 32);
    }

    #[test]
    fn test_global_config_init_once() {
        // other tests in this binary may have installed it already
        if !is_initialized() {
            init(RunConfig::default()).unwrap();
        }
        assert!(is_initialized());
        assert_eq!(
            init(RunConfig::default()).unwrap_err(),
            BootError::ConfigAlreadyInitialized
        );
        assert_eq!(config().storage.origin, "local");
    }
}
