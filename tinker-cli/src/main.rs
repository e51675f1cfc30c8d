//! Tinker CLI - terminal host for the script playground
//!
//! `tinker run <file>` runs one script; `tinker repl` (the default) opens an
//! interactive session whose buffer persists under the data directory.

use clap::{Parser, Subcommand};
use std::cell::Cell;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

mod config;
mod logging;
mod repl;
mod terminal;

use crate::config::{CliConfig, LogConfig};
use crate::logging::LogFormat;
use crate::repl::Repl;
use crate::terminal::{print_report, print_uncaught, TerminalView};
use tinker_api::{
    compile_with_config, init_config, BufferEditor, Dialect, RunConfig, SessionContext, SessionRecord,
    UncaughtError,
};
use tinker_store::{FileStore, KeyValueStore, MemoryStore};

#[derive(Parser)]
#[command(name = "tinker", about = "Run TypeScript and JavaScript snippets", version)]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "tinker.json")]
    config: PathBuf,

    /// Global log level (overrides the configuration file)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Also append JSON logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Where interactive sessions are saved
    #[arg(long, value_name = "DIR", default_value = ".tinker")]
    data_dir: PathBuf,

    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a script file once
    Run {
        file: PathBuf,
        /// Dialect; inferred from the file extension when omitted
        #[arg(long)]
        dialect: Option<String>,
        /// Print the executable text instead of running it
        #[arg(long)]
        compile_only: bool,
    },
    /// Interactive session
    Repl,
}

fn main() {
    let cli = Cli::parse();

    let file_config = match CliConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => fail(&e.to_string()),
    };
    let log_config = match LogConfig::from_section(&file_config.logging, cli.log_level.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e.to_string()),
    };
    if let Err(e) = logging::init(&log_config, cli.log_format, cli.log_file.as_deref()) {
        fail(&format!("Cannot open log file: {}", e));
    }

    let run_config = RunConfig::from(file_config.tinker);
    if let Err(e) = init_config(run_config.clone()) {
        fail(&e.to_string());
    }
    let color = !cli.no_color && std::io::stdout().is_terminal();

    let code = match cli.command.unwrap_or(Mode::Repl) {
        Mode::Run {
            file,
            dialect,
            compile_only,
        } => handle_run(&file, dialect.as_deref(), compile_only, run_config, color),
        Mode::Repl => handle_repl(&cli.data_dir, run_config, color),
    };
    process::exit(code);
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Dialect from `--dialect`, else from the extension, else the configured default
fn resolve_dialect(file: &Path, flag: Option<&str>, default: Dialect) -> Result<Dialect, String> {
    if let Some(name) = flag {
        return Dialect::parse(name).ok_or_else(|| format!("Unknown dialect '{}'", name));
    }
    Ok(file
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Dialect::parse)
        .unwrap_or(default))
}

fn handle_run(file: &Path, dialect: Option<&str>, compile_only: bool, mut config: RunConfig, color: bool) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => fail(&format!("Cannot read '{}': {}", file.display(), e)),
    };
    let dialect = match resolve_dialect(file, dialect, config.default_dialect) {
        Ok(d) => d,
        Err(e) => fail(&e),
    };

    if compile_only {
        return match compile_with_config(&source, dialect, &config) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                print_report(&e.to_report(), &source);
                1
            }
        };
    }

    // the session restores the file as if it had been saved earlier
    let record = SessionRecord { source: source.clone(), dialect };
    let record = match serde_json::to_string(&record) {
        Ok(json) => json,
        Err(e) => fail(&e.to_string()),
    };
    let store = MemoryStore::with_entries([(config.storage.session_key.clone(), record)]);
    config.output.clear_before_run = false;

    let editor = BufferEditor::new();
    let (mut context, uncaught) = match boot(&config, editor, store, color) {
        Ok(booted) => booted,
        Err(e) => fail(&e),
    };
    let outcome = context.run();
    if let Some(err) = &outcome.error {
        if err.line().is_some() {
            print_report(&err.to_report(), &source);
        }
    }
    context.run_until_idle();

    if outcome.is_success() && uncaught.get() == 0 {
        0
    } else {
        1
    }
}

fn handle_repl(data_dir: &Path, config: RunConfig, color: bool) -> i32 {
    let store = FileStore::new(data_dir, &config.storage.origin);
    let editor = BufferEditor::new();
    let (context, _) = match boot(&config, editor.clone(), store, color) {
        Ok(booted) => booted,
        Err(e) => fail(&e),
    };
    println!("Tinker {} ({}). :help lists commands.", env!("CARGO_PKG_VERSION"), context.dialect().display_name());

    let stdin = std::io::stdin();
    let mut repl = Repl::new(context, editor, std::io::stdout());
    match repl.run(stdin.lock()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Boot a session printing to the terminal; the counter tracks uncaught
/// deferred errors
fn boot(
    config: &RunConfig,
    editor: Rc<BufferEditor>,
    store: impl KeyValueStore + 'static,
    color: bool,
) -> Result<(SessionContext, Rc<Cell<usize>>), String> {
    let context = SessionContext::boot(config, editor.clone(), Box::new(store))
        .map_err(|e| editor.fatal_error().unwrap_or_else(|| e.to_string()))?;
    context
        .sink()
        .attach_view(Rc::new(TerminalView::new(&config.output.timestamp_format, color)));

    let uncaught = Rc::new(Cell::new(0));
    let counter = uncaught.clone();
    context.set_reporter(Rc::new(move |err: &UncaughtError| {
        counter.set(counter.get() + 1);
        print_uncaught(err, color);
    }));
    Ok((context, uncaught))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_resolution() {
        let typed = Dialect::Typed;
        assert_eq!(resolve_dialect(Path::new("a.js"), None, typed), Ok(Dialect::Untyped));
        assert_eq!(resolve_dialect(Path::new("a.ts"), None, Dialect::Untyped), Ok(Dialect::Typed));
        assert_eq!(resolve_dialect(Path::new("a.txt"), None, typed), Ok(Dialect::Typed));
        assert_eq!(resolve_dialect(Path::new("a.ts"), Some("javascript"), typed), Ok(Dialect::Untyped));
        assert!(resolve_dialect(Path::new("a.ts"), Some("perl"), typed).is_err());
    }

    #[test]
    fn test_cli_parses_run_mode() {
        let cli = Cli::try_parse_from(["tinker", "--log-level", "debug", "run", "demo.js", "--compile-only"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Mode::Run { compile_only: true, .. })));
        assert_eq!(cli.data_dir, PathBuf::from(".tinker"));
    }
}
