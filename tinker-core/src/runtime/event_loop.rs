//! Host event loop: microtasks, timers and the uncaught-error reporter
//!
//! Work scheduled by a run outlives it. Each task remembers the id of the run
//! that scheduled it so that failures can be attributed in diagnostics, but
//! they never reach the output sink.

use super::error::Throw;
use super::interpreter::Interpreter;
use super::promise::{run_reaction, run_resolve_thenable, status_of, PromiseStatus, Reaction};
use super::value::{ObjectRef, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{error, trace};

pub enum Job {
    Reaction { reaction: Reaction, argument: Value },
    ResolveThenable { promise: ObjectRef, thenable: Value, then: Value },
    Callback { callback: Value, args: Vec<Value> },
}

struct Task {
    job: Job,
    run_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncaughtKind {
    /// A deferred callback threw
    Exception,
    /// A rejection had no handler at a microtask checkpoint
    Rejection,
}

/// A failure of deferred work, reported outside the output sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtError {
    pub run_id: u64,
    pub kind: UncaughtKind,
    /// `Name: message` of the thrown value
    pub description: String,
}

impl fmt::Display for UncaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            UncaughtKind::Exception => write!(f, "Uncaught {}", self.description),
            UncaughtKind::Rejection => write!(f, "Uncaught (in promise) {}", self.description),
        }
    }
}

pub type Reporter = Rc<dyn Fn(&UncaughtError)>;

#[derive(Default)]
pub struct EventLoop {
    microtasks: RefCell<VecDeque<Task>>,
    /// Ordered by due time, then scheduling order
    timers: RefCell<BTreeMap<(Instant, u64), Task>>,
    timer_due: RefCell<HashMap<u64, Instant>>,
    next_timer_id: Cell<u64>,
    pending_rejections: RefCell<Vec<(ObjectRef, u64)>>,
    reporter: RefCell<Option<Reporter>>,
    current_run: Cell<u64>,
}

impl EventLoop {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Extra sink for uncaught errors next to the tracing event
    pub fn set_reporter(&self, reporter: Reporter) {
        *self.reporter.borrow_mut() = Some(reporter);
    }

    pub fn current_run(&self) -> u64 {
        self.current_run.get()
    }

    pub fn set_current_run(&self, run_id: u64) {
        self.current_run.set(run_id);
    }

    pub fn enqueue_microtask(&self, job: Job) {
        self.microtasks.borrow_mut().push_back(Task {
            job,
            run_id: self.current_run.get(),
        });
    }

    /// Schedule `callback(args)` after `delay`; returns the timer id
    pub fn set_timeout(&self, callback: Value, args: Vec<Value>, delay: Duration) -> u64 {
        let id = self.next_timer_id.get() + 1;
        self.next_timer_id.set(id);
        let due = Instant::now() + delay;
        self.timers.borrow_mut().insert(
            (due, id),
            Task {
                job: Job::Callback { callback, args },
                run_id: self.current_run.get(),
            },
        );
        self.timer_due.borrow_mut().insert(id, due);
        trace!(target: "tinker::runtime", id, delay_ms = delay.as_millis() as u64, "timer scheduled");
        id
    }

    pub fn clear_timeout(&self, id: u64) {
        if let Some(due) = self.timer_due.borrow_mut().remove(&id) {
            self.timers.borrow_mut().remove(&(due, id));
        }
    }

    pub(crate) fn track_rejection(&self, promise: ObjectRef) {
        self.pending_rejections
            .borrow_mut()
            .push((promise, self.current_run.get()));
    }

    pub(crate) fn untrack_rejection(&self, promise: &ObjectRef) {
        self.pending_rejections
            .borrow_mut()
            .retain(|(p, _)| !Rc::ptr_eq(p, promise));
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.borrow().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_microtasks() == 0 && self.pending_timers() == 0
    }

    /// Drain the microtask queue, then report rejections nobody handled
    pub fn checkpoint(&self, interp: &mut Interpreter) {
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => self.run_task(interp, task),
                None => break,
            }
        }
        let rejections = std::mem::take(&mut *self.pending_rejections.borrow_mut());
        for (promise, run_id) in rejections {
            if let Some(PromiseStatus::Rejected(reason)) = status_of(&promise) {
                let handled = promise.promise().is_some_and(|c| c.borrow().handled);
                if !handled {
                    self.report(UncaughtKind::Rejection, run_id, &Throw::new(reason));
                }
            }
        }
    }

    /// Run microtasks and every timer, sleeping until each one is due
    pub fn run_until_idle(&self, interp: &mut Interpreter) {
        self.checkpoint(interp);
        while let Some(task) = self.next_timer(true) {
            self.run_task(interp, task);
            self.checkpoint(interp);
        }
    }

    /// Run microtasks and the timers that are already due, without sleeping
    pub fn run_ready(&self, interp: &mut Interpreter) {
        self.checkpoint(interp);
        while let Some(task) = self.next_timer(false) {
            self.run_task(interp, task);
            self.checkpoint(interp);
        }
    }

    fn next_timer(&self, wait: bool) -> Option<Task> {
        let (due, id) = *self.timers.borrow().keys().next()?;
        let now = Instant::now();
        if due > now {
            if !wait {
                return None;
            }
            std::thread::sleep(due - now);
        }
        self.timer_due.borrow_mut().remove(&id);
        self.timers.borrow_mut().remove(&(due, id))
    }

    fn run_task(&self, interp: &mut Interpreter, task: Task) {
        let previous = self.current_run.replace(task.run_id);
        match task.job {
            Job::Reaction { reaction, argument } => run_reaction(interp, reaction, argument),
            Job::ResolveThenable {
                promise,
                thenable,
                then,
            } => run_resolve_thenable(interp, &promise, thenable, then),
            Job::Callback { callback, args } => {
                if let Err(thrown) = interp.call(&callback, &Value::Undefined, &args) {
                    self.report(UncaughtKind::Exception, task.run_id, &thrown);
                }
            }
        }
        self.current_run.set(previous);
    }

    fn report(&self, kind: UncaughtKind, run_id: u64, thrown: &Throw) {
        let uncaught = UncaughtError {
            run_id,
            kind,
            description: thrown.describe(),
        };
        error!(target: "tinker::runtime", run_id, "{}", uncaught);
        let reporter = self.reporter.borrow().clone();
        if let Some(reporter) = reporter {
            reporter(&uncaught);
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("microtasks", &self.pending_microtasks())
            .field("timers", &self.pending_timers())
            .finish()
    }
}
