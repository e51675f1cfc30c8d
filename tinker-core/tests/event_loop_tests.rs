//! Deferred work: timers, microtasks and late failures

mod common;

use common::{execute, logs};
use std::cell::RefCell;
use std::rc::Rc;
use tinker_config::{OutputOptions, SandboxLimits};
use tinker_core::runtime::{UncaughtError, UncaughtKind};
use tinker_core::{EventLoop, Sandbox};
use tinker_output::OutputSink;

#[test]
fn test_execute_returns_before_deferred_work_runs() {
    let sink = OutputSink::new(&OutputOptions::default());
    let mut sandbox = Sandbox::new(SandboxLimits::default(), EventLoop::new());
    let result = sandbox.execute(
        "setTimeout(() => console.log('later'), 0); Promise.resolve().then(() => console.log('micro')); 'done'",
        sink.clone(),
    );
    assert_eq!(result.value.and_then(|v| v.as_str().map(String::from)).as_deref(), Some("done"));
    assert!(sink.rendered_lines().is_empty());
    assert!(!sandbox.event_loop().is_idle());

    sandbox.run_until_idle();
    assert_eq!(sink.rendered_lines(), vec!["micro", "later"]);
    assert!(sandbox.event_loop().is_idle());
}

#[test]
fn test_timers_fire_in_due_order() {
    assert_eq!(
        logs(
            "setTimeout(() => console.log('c'), 20);
             setTimeout(() => console.log('a'), 0);
             setTimeout(() => console.log('b'), 0);
             setTimeout(() => console.log('d', 'arg'), NaN);"
        ),
        vec!["a", "b", "d arg", "c"]
    );
}

#[test]
fn test_async_logs_land_in_the_sink() {
    let source = "
        const wait = (ms, value) => new Promise(resolve => setTimeout(() => resolve(value), ms));
        wait(5, 'second').then(v => console.log(v));
        wait(1, 'first').then(v => console.log(v));
        Promise.all([wait(2, 1), 2]).then(values => console.log(values));
    ";
    assert_eq!(logs(source), vec!["first", "[\n  1,\n  2\n]", "second"]);
}

#[test]
fn test_deferred_failures_never_become_error_entries() {
    let run = execute(
        "setTimeout(() => { throw new Error('late'); }, 0);
         Promise.reject(new Error('rejected'));
         setTimeout(() => console.log('still running'), 1);",
    );
    assert!(!run.result.is_error());
    assert_eq!(run.lines(), vec!["still running"]);
}

#[test]
fn test_reporter_receives_uncaught_failures_with_their_run() {
    let reported: Rc<RefCell<Vec<UncaughtError>>> = Rc::default();
    let event_loop = EventLoop::new();
    let collected = reported.clone();
    event_loop.set_reporter(Rc::new(move |err: &UncaughtError| collected.borrow_mut().push(err.clone())));

    let sink = OutputSink::new(&OutputOptions::default());
    let mut sandbox = Sandbox::new(SandboxLimits::default(), event_loop);
    sandbox.execute("setTimeout(() => missing(), 0);", sink.clone());
    sandbox.execute("Promise.reject('no handler');", sink);
    sandbox.run_until_idle();

    let reported = reported.borrow();
    assert_eq!(reported.len(), 2);
    assert_eq!(reported[0].kind, UncaughtKind::Rejection);
    assert_eq!(reported[0].run_id, 2);
    assert_eq!(reported[0].to_string(), "Uncaught (in promise) no handler");
    assert_eq!(reported[1].kind, UncaughtKind::Exception);
    assert_eq!(reported[1].run_id, 1);
    assert_eq!(reported[1].to_string(), "Uncaught ReferenceError: missing is not defined");
}

#[test]
fn test_rejections_skip_to_the_next_handler() {
    let source = "
        Promise.resolve(1)
            .then(v => { throw new Error('step ' + v); })
            .then(() => console.log('skipped'))
            .catch(e => e.message)
            .then(m => console.log('recovered', m));
    ";
    assert_eq!(logs(source), vec!["recovered step 1"]);
}
