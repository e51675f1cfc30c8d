//! Session behaviour across runs, reloads and dialect switches

mod common;

use common::{boot, boot_with_config};
use std::cell::RefCell;
use std::rc::Rc;
use tinker_api::{Dialect, EditorSurface, RunConfig, RunState, SessionRecord, UncaughtError};
use tinker_output::OutputLevel;
use tinker_store::{FileStore, KeyValueStore, MemoryStore};

#[test]
fn test_session_survives_reload_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (mut context, editor) = boot(FileStore::new(dir.path(), "local"));
        context.switch_dialect(Dialect::Untyped);
        editor.type_text("console.log('from disk')");
    }
    let (mut context, editor) = boot(FileStore::new(dir.path(), "local"));
    assert_eq!(context.dialect(), Dialect::Untyped);
    assert_eq!(editor.get_value(), "console.log('from disk')");
    context.run();
    assert_eq!(context.sink().rendered_lines(), vec!["from disk"]);
}

#[test]
fn test_origins_do_not_share_sessions() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (_context, editor) = boot(FileStore::new(dir.path(), "one"));
        editor.type_text("let a = 1;");
    }
    let (context, editor) = boot(FileStore::new(dir.path(), "two"));
    assert_eq!(context.dialect(), Dialect::Typed);
    assert!(tinker_api::is_pristine(&editor.get_value()));
}

#[test]
fn test_default_dialect_comes_from_config() {
    let config = RunConfig {
        default_dialect: Dialect::Untyped,
        ..RunConfig::default()
    };
    let (context, editor) = boot_with_config(&config, MemoryStore::new());
    assert_eq!(context.dialect(), Dialect::Untyped);
    assert_eq!(editor.get_value(), tinker_api::canned_example(Dialect::Untyped));
}

#[test]
fn test_canned_examples_run_cleanly() {
    let (mut context, _editor) = boot(MemoryStore::new());
    let outcome = context.run();
    assert!(outcome.is_success(), "{:?}", context.sink().rendered_lines());
    assert_eq!(
        context.sink().rendered_lines(),
        vec![
            "Hello, Ada! You are 36 years old.",
            "Hello, Linus! You are 28 years old.",
            "Total age: 64",
            "→ 32",
        ]
    );

    context.switch_dialect(Dialect::Untyped);
    let outcome = context.run();
    assert!(outcome.is_success(), "{:?}", context.sink().rendered_lines());
    context.run_until_idle();
    let lines = context.sink().rendered_lines();
    assert!(lines[0].starts_with("Fibonacci: [\n  1,\n  1,\n  2,"), "{}", lines[0]);
    assert_eq!(lines[1], "→ {\n  \"max\": 8,\n  \"sum\": 36\n}");
    assert_eq!(lines[2], "Promise resolved: done");
}

#[test]
fn test_stale_deferred_output_interleaves_with_newer_runs() {
    let (mut context, editor) = boot(MemoryStore::new());
    context.switch_dialect(Dialect::Untyped);
    editor.type_text("setTimeout(() => console.log('late from run 1'), 0)");
    context.run();
    editor.type_text("console.log('run 2')");
    context.run();
    context.run_until_idle();
    assert_eq!(context.sink().rendered_lines(), vec!["run 2", "late from run 1"]);
}

#[test]
fn test_uncaught_deferred_errors_bypass_the_output() {
    let (mut context, editor) = boot(MemoryStore::new());
    let reported: Rc<RefCell<Vec<String>>> = Rc::default();
    let collected = reported.clone();
    context.set_reporter(Rc::new(move |err: &UncaughtError| collected.borrow_mut().push(err.to_string())));

    context.switch_dialect(Dialect::Untyped);
    editor.type_text("setTimeout(() => { throw new TypeError('async') }, 0); 'sync done'");
    let outcome = context.run();
    assert_eq!(outcome.state, RunState::Completed);
    context.run_until_idle();

    assert_eq!(context.sink().rendered_lines(), vec!["→ sync done"]);
    assert!(context.sink().entries_at(OutputLevel::Error).is_empty());
    assert_eq!(*reported.borrow(), vec!["Uncaught TypeError: async"]);
}

#[test]
fn test_dialect_switch_round_trip_is_persisted() {
    let store = MemoryStore::new();
    let (mut context, editor) = boot(store.clone());
    context.switch_dialect(Dialect::Untyped);
    context.switch_dialect(Dialect::Typed);
    assert_eq!(editor.get_value(), tinker_api::canned_example(Dialect::Typed));
    assert_eq!(context.sink().rendered_lines(), vec!["Switched to TypeScript"]);

    let saved: SessionRecord = serde_json::from_str(&store.get("tinker.session").unwrap().unwrap()).unwrap();
    assert_eq!(saved, SessionRecord::example(Dialect::Typed));
}

#[test]
fn test_untyped_syntax_error_is_a_runtime_error() {
    let (mut context, editor) = boot(MemoryStore::new());
    context.switch_dialect(Dialect::Untyped);
    editor.type_text("const = 1");
    let outcome = context.run();
    assert_eq!(outcome.state, RunState::Threw);
    let lines = context.sink().rendered_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Runtime error: SyntaxError: "), "{}", lines[0]);
}
