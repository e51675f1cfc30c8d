//! Output entry levels

use std::fmt;

/// Level of an output entry
///
/// The first four mirror the console methods available to executed code;
/// `Result` is reserved for the completion value of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputLevel {
    Log,
    Info,
    Warn,
    Error,
    Result,
}

impl OutputLevel {
    /// Lowercase level name
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutputLevel::Log => "log",
            OutputLevel::Info => "info",
            OutputLevel::Warn => "warn",
            OutputLevel::Error => "error",
            OutputLevel::Result => "result",
        }
    }

    /// Parse a level name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "log" => Some(OutputLevel::Log),
            "info" => Some(OutputLevel::Info),
            "warn" => Some(OutputLevel::Warn),
            "error" => Some(OutputLevel::Error),
            "result" => Some(OutputLevel::Result),
            _ => None,
        }
    }

    /// Whether entries of this level report a problem
    pub const fn is_problem(&self) -> bool {
        matches!(self, OutputLevel::Warn | OutputLevel::Error)
    }
}

impl fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
