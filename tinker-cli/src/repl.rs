//! Interactive line-oriented front end
//!
//! A line starting with `:` is a command. Any other line replaces the buffer
//! and runs it.

use crate::terminal::print_report;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tinker_api::{BufferEditor, Command, Dialect, EditorSurface, SessionContext, CLEAR_CHORD, RUN_CHORD};
use tracing::debug;

const HELP: &str = "\
Commands:
  :run            run the buffer
  :clear          clear the output
  :lang <name>    switch dialect (typescript, javascript)
  :show           print the buffer
  :edit           replace the buffer; finish with a line holding only '.'
  :load <file>    replace the buffer with a file's contents
  :key <chord>    trigger a key binding (Ctrl-Enter, Ctrl-L)
  :quit           leave
Any other line replaces the buffer and runs it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum Mode {
    Command,
    Editing(Vec<String>),
}

pub struct Repl<W: Write> {
    context: SessionContext,
    editor: std::rc::Rc<BufferEditor>,
    out: W,
    mode: Mode,
}

impl<W: Write> Repl<W> {
    pub fn new(context: SessionContext, editor: std::rc::Rc<BufferEditor>, out: W) -> Self {
        Self {
            context,
            editor,
            out,
            mode: Mode::Command,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Read lines until `:quit` or end of input
    pub fn run<R: BufRead>(&mut self, input: R) -> io::Result<()> {
        self.prompt()?;
        for line in input.lines() {
            if self.handle_line(&line?)? == Flow::Quit {
                break;
            }
            self.prompt()?;
        }
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        if let Mode::Editing(lines) = &mut self.mode {
            if line.trim_end() == "." {
                let text = lines.join("\n");
                self.mode = Mode::Command;
                self.editor.type_text(&text);
            } else {
                lines.push(line.to_string());
            }
            return Ok(Flow::Continue);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Flow::Continue);
        }
        let Some(command) = trimmed.strip_prefix(':') else {
            self.editor.type_text(line);
            self.run_buffer();
            return Ok(Flow::Continue);
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        debug!(target: "tinker::host", command = name, "repl command");
        match name {
            "run" | "r" => self.run_buffer(),
            "clear" | "c" => {
                self.context.execute(Command::ClearOutput);
            }
            "lang" => match Dialect::parse(arg) {
                Some(dialect) => {
                    if !self.context.switch_dialect(dialect) {
                        writeln!(self.out, "Already using {}", dialect.display_name())?;
                    }
                }
                None => writeln!(self.out, "Unknown dialect '{}'", arg)?,
            },
            "show" => {
                let source = self.editor.get_value();
                for (number, text) in source.lines().enumerate() {
                    writeln!(self.out, "{:3} | {}", number + 1, text)?;
                }
            }
            "edit" => self.mode = Mode::Editing(Vec::new()),
            "load" => self.load(Path::new(arg))?,
            "key" => match self.editor.command_for(arg) {
                Some(Command::Run) => self.run_buffer(),
                Some(Command::ClearOutput) => {
                    self.context.execute(Command::ClearOutput);
                }
                None => writeln!(self.out, "No binding for '{}' (try {} or {})", arg, RUN_CHORD, CLEAR_CHORD)?,
            },
            "help" | "h" | "?" => writeln!(self.out, "{}", HELP)?,
            "quit" | "q" | "exit" => return Ok(Flow::Quit),
            other => writeln!(self.out, "Unknown command ':{}' (:help lists commands)", other)?,
        }
        Ok(Flow::Continue)
    }

    fn run_buffer(&mut self) {
        let source = self.editor.get_value();
        if let Some(outcome) = self.context.execute(Command::Run) {
            if let Some(err) = &outcome.error {
                if err.line().is_some() {
                    print_report(&err.to_report(), &source);
                }
            }
        }
        self.context.run_until_idle();
    }

    fn load(&mut self, path: &Path) -> io::Result<()> {
        match std::fs::read_to_string(path) {
            Ok(text) => self.editor.type_text(&text),
            Err(err) => writeln!(self.out, "Cannot read '{}': {}", path.display(), err)?,
        }
        Ok(())
    }

    fn prompt(&mut self) -> io::Result<()> {
        let marker = match self.mode {
            Mode::Command => format!("{}> ", self.context.dialect().as_str()),
            Mode::Editing(_) => "... ".to_string(),
        };
        write!(self.out, "{}", marker)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinker_api::RunConfig;
    use tinker_store::MemoryStore;

    fn repl() -> Repl<Vec<u8>> {
        let editor = BufferEditor::new();
        let context = SessionContext::boot(&RunConfig::default(), editor.clone(), Box::new(MemoryStore::new())).unwrap();
        Repl::new(context, editor, Vec::new())
    }

    fn printed(repl: &Repl<Vec<u8>>) -> String {
        String::from_utf8_lossy(&repl.out).into_owned()
    }

    #[test]
    fn test_plain_line_runs() {
        let mut repl = repl();
        repl.handle_line("const n: number = 20; n + 1").unwrap();
        assert_eq!(repl.context().sink().rendered_lines(), vec!["→ 21"]);
    }

    #[test]
    fn test_edit_block_then_run() {
        let mut repl = repl();
        for line in [":lang javascript", ":edit", "let a = 2;", "console.log(a * 3)", ".", ":run"] {
            assert_eq!(repl.handle_line(line).unwrap(), Flow::Continue);
        }
        assert_eq!(repl.context().dialect(), Dialect::Untyped);
        assert_eq!(repl.editor.get_value(), "let a = 2;\nconsole.log(a * 3)");
        assert_eq!(repl.context().sink().rendered_lines(), vec!["6"]);

        repl.handle_line(":key ctrl-l").unwrap();
        assert!(repl.context().sink().is_empty());
    }

    #[test]
    fn test_messages_and_quit() {
        let mut repl = repl();
        repl.handle_line(":lang typescript").unwrap();
        repl.handle_line(":lang cobol").unwrap();
        repl.handle_line(":nope").unwrap();
        let text = printed(&repl);
        assert!(text.contains("Already using TypeScript"));
        assert!(text.contains("Unknown dialect 'cobol'"));
        assert!(text.contains("Unknown command ':nope'"));
        assert_eq!(repl.handle_line(":quit").unwrap(), Flow::Quit);
    }

    #[test]
    fn test_run_reads_until_quit() {
        let mut repl = repl();
        let input = io::Cursor::new("1 + 1\n:quit\n2 + 2\n");
        repl.run(input).unwrap();
        assert_eq!(repl.context().sink().rendered_lines(), vec!["→ 2"]);
        assert!(printed(&repl).starts_with("typed> "));
    }
}
