//! Logging setup for the terminal host
//!
//! Per-phase `tracing-subscriber` filtering. Diagnostics go to stderr so they
//! never mix with program output on stdout.

use crate::config::LogConfig;
use clap::ValueEnum;
use std::io;
use std::path::Path;
use tinker_config::Phase;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, colored (development)
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON (tool integration)
    Json,
}

/// Per-phase targets from the log configuration
pub fn targets(log_config: &LogConfig) -> Targets {
    Phase::ALL
        .into_iter()
        .fold(Targets::new().with_default(log_config.global), |targets, phase| {
            targets.with_target(phase.target(), log_config.level_for(phase))
        })
}

/// Install the global subscriber; with `file`, events are also appended there
pub fn init(log_config: &LogConfig, format: LogFormat, file: Option<&Path>) -> io::Result<()> {
    let targets = targets(log_config);
    let stderr_layer = format_layer(format, io::stderr).with_filter(targets.clone());

    match file {
        Some(path) => {
            let handle = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            let file_layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(handle))
                .with_filter(targets);
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
        }
    }
    Ok(())
}

fn format_layer<W, F>(format: LogFormat, make_writer: F) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingSection;
    use std::collections::HashMap;
    use tracing::Level;

    #[test]
    fn test_targets_follow_phase_overrides() {
        let section = LoggingSection {
            level: Some("warn".to_string()),
            phases: HashMap::from([("runtime".to_string(), "debug".to_string())]),
        };
        let targets = targets(&LogConfig::from_section(&section, None).unwrap());
        assert!(targets.would_enable("tinker::runtime", &Level::DEBUG));
        assert!(!targets.would_enable("tinker::parser", &Level::INFO));
        assert!(targets.would_enable("tinker::parser", &Level::WARN));
        assert!(!targets.would_enable("other_crate", &Level::INFO));
    }
}
