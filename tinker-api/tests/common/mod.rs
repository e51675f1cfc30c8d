//! Test helpers: boot a session over a given store

#![allow(dead_code)]

use std::rc::Rc;
use tinker_api::{BufferEditor, RunConfig, SessionContext};
use tinker_store::KeyValueStore;

pub fn boot(store: impl KeyValueStore + 'static) -> (SessionContext, Rc<BufferEditor>) {
    boot_with_config(&RunConfig::default(), store)
}

pub fn boot_with_config(config: &RunConfig, store: impl KeyValueStore + 'static) -> (SessionContext, Rc<BufferEditor>) {
    let editor = BufferEditor::new();
    let context = SessionContext::boot(config, editor.clone(), Box::new(store)).expect("session boots");
    (context, editor)
}
