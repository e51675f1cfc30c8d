//! Promise states, reactions and the resolution procedure

use super::error::{type_error, ScriptResult};
use super::event_loop::Job;
use super::function::{arg, native};
use super::interpreter::Interpreter;
use super::value::{Object, ObjectKind, ObjectRef, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone)]
pub enum PromiseStatus {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Fulfill,
    Reject,
}

/// A handler waiting on a promise, settling `derived` with its outcome
#[derive(Clone)]
pub struct Reaction {
    pub kind: ReactionKind,
    pub handler: Option<Value>,
    pub derived: Option<ObjectRef>,
}

pub struct PromiseState {
    pub status: PromiseStatus,
    reactions: Vec<(Reaction, Reaction)>,
    /// A rejection handler has been attached at some point
    pub handled: bool,
}

impl Default for PromiseState {
    fn default() -> Self {
        Self {
            status: PromiseStatus::Pending,
            reactions: Vec::new(),
            handled: false,
        }
    }
}

impl PromiseState {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, PromiseStatus::Pending)
    }
}

pub fn new_promise() -> ObjectRef {
    Object::new(ObjectKind::Promise(RefCell::new(PromiseState::default())))
}

/// The `resolve`/`reject` pair handed to executors; only the first call counts
pub fn resolving_functions(promise: &ObjectRef) -> (Value, Value) {
    let done = Rc::new(Cell::new(false));
    let resolve = {
        let promise = promise.clone();
        let done = done.clone();
        native("resolve", 1, move |interp, _, args| {
            if !done.replace(true) {
                resolve_promise(interp, &promise, arg(args, 0));
            }
            Ok(Value::Undefined)
        })
    };
    let reject = {
        let promise = promise.clone();
        native("reject", 1, move |interp, _, args| {
            if !done.replace(true) {
                reject_promise(interp, &promise, arg(args, 0));
            }
            Ok(Value::Undefined)
        })
    };
    (resolve, reject)
}

/// Resolve with `value`, adopting its state when it is thenable
pub fn resolve_promise(interp: &mut Interpreter, promise: &ObjectRef, value: Value) {
    if let Value::Object(obj) = &value {
        if Rc::ptr_eq(obj, promise) {
            let err = type_error("Chaining cycle detected for promise #<Promise>");
            reject_promise(interp, promise, err.value);
            return;
        }
        let then = match interp.get_property(&value, "then") {
            Ok(then) => then,
            Err(thrown) => {
                reject_promise(interp, promise, thrown.value);
                return;
            }
        };
        if then.is_callable() {
            interp.event_loop().enqueue_microtask(Job::ResolveThenable {
                promise: promise.clone(),
                thenable: value,
                then,
            });
            return;
        }
    }
    settle(interp, promise, PromiseStatus::Fulfilled(value));
}

pub fn reject_promise(interp: &mut Interpreter, promise: &ObjectRef, reason: Value) {
    settle(interp, promise, PromiseStatus::Rejected(reason));
}

fn settle(interp: &mut Interpreter, promise: &ObjectRef, status: PromiseStatus) {
    let Some(cell) = promise.promise() else {
        return;
    };
    let (reactions, unhandled) = {
        let mut state = cell.borrow_mut();
        if !state.is_pending() {
            return;
        }
        state.status = status.clone();
        let rejected = matches!(status, PromiseStatus::Rejected(_));
        (std::mem::take(&mut state.reactions), rejected && !state.handled)
    };
    let (kind, argument) = match status {
        PromiseStatus::Fulfilled(v) => (ReactionKind::Fulfill, v),
        PromiseStatus::Rejected(v) => (ReactionKind::Reject, v),
        PromiseStatus::Pending => return,
    };
    if unhandled {
        interp.event_loop().track_rejection(promise.clone());
    }
    for (on_fulfilled, on_rejected) in reactions {
        let reaction = match kind {
            ReactionKind::Fulfill => on_fulfilled,
            ReactionKind::Reject => on_rejected,
        };
        interp.event_loop().enqueue_microtask(Job::Reaction {
            reaction,
            argument: argument.clone(),
        });
    }
}

/// Register handlers; `derived` settles with whatever the handler produces
pub fn perform_then(
    interp: &mut Interpreter,
    promise: &ObjectRef,
    on_fulfilled: Value,
    on_rejected: Value,
    derived: Option<ObjectRef>,
) {
    let Some(cell) = promise.promise() else {
        return;
    };
    let callable = |v: Value| if v.is_callable() { Some(v) } else { None };
    let fulfill = Reaction {
        kind: ReactionKind::Fulfill,
        handler: callable(on_fulfilled),
        derived: derived.clone(),
    };
    let reject = Reaction {
        kind: ReactionKind::Reject,
        handler: callable(on_rejected),
        derived,
    };
    let job = {
        let mut state = cell.borrow_mut();
        let was_handled = std::mem::replace(&mut state.handled, true);
        match state.status.clone() {
            PromiseStatus::Pending => {
                state.reactions.push((fulfill, reject));
                None
            }
            PromiseStatus::Fulfilled(value) => Some((fulfill, value, false)),
            PromiseStatus::Rejected(reason) => Some((reject, reason, !was_handled)),
        }
    };
    if let Some((reaction, argument, newly_handled)) = job {
        if newly_handled {
            interp.event_loop().untrack_rejection(promise);
        }
        interp
            .event_loop()
            .enqueue_microtask(Job::Reaction { reaction, argument });
    }
}

/// `promise.then(onFulfilled, onRejected)` returning the derived promise
pub fn then(interp: &mut Interpreter, promise: &ObjectRef, on_fulfilled: Value, on_rejected: Value) -> ObjectRef {
    let derived = new_promise();
    perform_then(interp, promise, on_fulfilled, on_rejected, Some(derived.clone()));
    derived
}

pub(crate) fn run_reaction(interp: &mut Interpreter, reaction: Reaction, argument: Value) {
    let outcome = match &reaction.handler {
        Some(handler) => interp.call(handler, &Value::Undefined, &[argument]),
        None => match reaction.kind {
            ReactionKind::Fulfill => Ok(argument),
            ReactionKind::Reject => Err(super::error::Throw::new(argument)),
        },
    };
    let Some(derived) = reaction.derived else {
        return;
    };
    match outcome {
        Ok(value) => resolve_promise(interp, &derived, value),
        Err(thrown) => reject_promise(interp, &derived, thrown.value),
    }
}

pub(crate) fn run_resolve_thenable(interp: &mut Interpreter, promise: &ObjectRef, thenable: Value, then: Value) {
    let (resolve, reject) = resolving_functions(promise);
    if let Err(thrown) = interp.call(&then, &thenable, &[resolve, reject.clone()]) {
        // a throw after resolve already ran is ignored by the pair itself
        let _ = interp.call(&reject, &Value::Undefined, &[thrown.value]);
    }
}

/// `Promise.resolve(value)`: promises pass through unchanged
pub fn promise_resolve(interp: &mut Interpreter, value: Value) -> ObjectRef {
    if let Value::Object(obj) = &value {
        if obj.is_promise() {
            return obj.clone();
        }
    }
    let promise = new_promise();
    resolve_promise(interp, &promise, value);
    promise
}

/// Status snapshot used by tests and the output serializer
pub fn status_of(promise: &ObjectRef) -> Option<PromiseStatus> {
    promise.promise().map(|cell| cell.borrow().status.clone())
}

/// Construct a promise and run `executor(resolve, reject)` synchronously
pub fn construct(interp: &mut Interpreter, executor: &Value) -> ScriptResult<ObjectRef> {
    if !executor.is_callable() {
        return Err(type_error(format!(
            "Promise resolver {} is not a function",
            super::operators::to_string(executor)
        )));
    }
    let promise = new_promise();
    let (resolve, reject) = resolving_functions(&promise);
    if let Err(thrown) = interp.call(executor, &Value::Undefined, &[resolve, reject.clone()]) {
        interp.call(&reject, &Value::Undefined, &[thrown.value])?;
    }
    Ok(promise)
}
