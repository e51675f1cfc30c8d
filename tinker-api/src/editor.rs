//! The editing surface the session drives
//!
//! Rich editing (highlighting, completion, undo) lives outside this crate;
//! the session only needs the handful of operations on [`EditorSurface`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A host action a key chord can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    ClearOutput,
}

/// Chord that runs the buffer
pub const RUN_CHORD: &str = "Ctrl-Enter";

/// Chord that clears the output
pub const CLEAR_CHORD: &str = "Ctrl-L";

/// Called with the full buffer text after every change
pub type ChangeListener = Box<dyn Fn(&str)>;

pub trait EditorSurface {
    fn get_value(&self) -> String;

    /// Replace the whole buffer; change listeners fire
    fn set_value(&self, text: &str);

    /// Switch syntax mode (`typescript` or `javascript`)
    fn set_language(&self, mode: &str);

    fn on_change(&self, listener: ChangeListener);

    fn add_keybinding(&self, chord: &str, command: Command);

    /// Replace the editing surface with a static error message
    fn show_fatal_error(&self, message: &str);
}

/// In-memory editing surface
#[derive(Default)]
pub struct BufferEditor {
    text: RefCell<String>,
    language: RefCell<String>,
    listeners: RefCell<Vec<Rc<dyn Fn(&str)>>>,
    bindings: RefCell<Vec<(String, Command)>>,
    fatal: RefCell<Option<String>>,
}

impl fmt::Debug for BufferEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferEditor")
            .field("language", &self.language.borrow())
            .field("bytes", &self.text.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl BufferEditor {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Simulate the user typing: replace the buffer as an edit
    pub fn type_text(&self, text: &str) {
        self.set_value(text);
    }

    pub fn language(&self) -> String {
        self.language.borrow().clone()
    }

    /// Command bound to `chord`, if any
    pub fn command_for(&self, chord: &str) -> Option<Command> {
        self.bindings
            .borrow()
            .iter()
            .find(|(bound, _)| bound.eq_ignore_ascii_case(chord))
            .map(|(_, command)| *command)
    }

    /// Message shown in place of the editor after a failed boot
    pub fn fatal_error(&self) -> Option<String> {
        self.fatal.borrow().clone()
    }
}

impl EditorSurface for BufferEditor {
    fn get_value(&self) -> String {
        self.text.borrow().clone()
    }

    fn set_value(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
        // listeners may read the buffer back
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener(text);
        }
    }

    fn set_language(&self, mode: &str) {
        *self.language.borrow_mut() = mode.to_string();
    }

    fn on_change(&self, listener: ChangeListener) {
        self.listeners.borrow_mut().push(Rc::from(listener));
    }

    fn add_keybinding(&self, chord: &str, command: Command) {
        let mut bindings = self.bindings.borrow_mut();
        bindings.retain(|(bound, _)| !bound.eq_ignore_ascii_case(chord));
        bindings.push((chord.to_string(), command));
    }

    fn show_fatal_error(&self, message: &str) {
        *self.fatal.borrow_mut() = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_listeners_see_new_text() {
        let editor = BufferEditor::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        editor.on_change(Box::new(move |text| sink.borrow_mut().push(text.to_string())));
        editor.type_text("a");
        editor.set_value("ab");
        assert_eq!(*seen.borrow(), vec!["a", "ab"]);
        assert_eq!(editor.get_value(), "ab");
    }

    #[test]
    fn test_keybindings_rebind() {
        let editor = BufferEditor::new();
        editor.add_keybinding(RUN_CHORD, Command::Run);
        editor.add_keybinding(CLEAR_CHORD, Command::ClearOutput);
        assert_eq!(editor.command_for("ctrl-enter"), Some(Command::Run));
        editor.add_keybinding(RUN_CHORD, Command::ClearOutput);
        assert_eq!(editor.command_for(RUN_CHORD), Some(Command::ClearOutput));
        assert_eq!(editor.command_for("Ctrl-S"), None);
    }

    #[test]
    fn test_fatal_error_and_language() {
        let editor = BufferEditor::new();
        editor.set_language("typescript");
        editor.show_fatal_error("failed to load");
        assert_eq!(editor.language(), "typescript");
        assert_eq!(editor.fatal_error().as_deref(), Some("failed to load"));
    }
}
