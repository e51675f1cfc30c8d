//! Canned example programs, one per dialect
//!
//! Each starts with a marker comment line; a buffer that still starts with
//! either marker counts as pristine and may be swapped on a dialect switch.

use tinker_config::Dialect;

pub const TYPED_MARKER: &str = "// TypeScript Playground";
pub const UNTYPED_MARKER: &str = "// JavaScript Playground";

const TYPED_EXAMPLE: &str = r#"// TypeScript Playground
// Press Ctrl-Enter to run, Ctrl-L to clear the output.

interface User {
  name: string;
  age: number;
}

function greet(user: User): string {
  return `Hello, ${user.name}! You are ${user.age} years old.`;
}

const users: User[] = [
  { name: "Ada", age: 36 },
  { name: "Linus", age: 28 },
];

users.forEach((user) => console.log(greet(user)));

const total: number = users.reduce((sum, user) => sum + user.age, 0);
console.info("Total age:", total);

total / users.length
"#;

const UNTYPED_EXAMPLE: &str = r#"// JavaScript Playground
// Press Ctrl-Enter to run, Ctrl-L to clear the output.

function fibonacci(n) {
  return n < 2 ? n : fibonacci(n - 1) + fibonacci(n - 2);
}

const numbers = [1, 2, 3, 4, 5, 6, 7, 8];
console.log("Fibonacci:", numbers.map(fibonacci));

const later = new Promise((resolve) => setTimeout(() => resolve("done"), 100));
later.then((value) => console.info("Promise resolved:", value));

({ max: Math.max(...numbers), sum: numbers.reduce((a, b) => a + b, 0) })
"#;

/// The canned example shown for `dialect`
pub fn canned_example(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Typed => TYPED_EXAMPLE,
        Dialect::Untyped => UNTYPED_EXAMPLE,
    }
}

pub fn marker(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Typed => TYPED_MARKER,
        Dialect::Untyped => UNTYPED_MARKER,
    }
}

/// Whether `text` still starts with one of the canned examples' marker lines
///
/// Only the marker line is compared. A canned example edited below its first
/// line still counts as pristine, so a dialect switch replaces those edits;
/// removing or changing the marker line is what protects the buffer.
pub fn is_pristine(text: &str) -> bool {
    let first_line = text.lines().next().unwrap_or_default();
    Dialect::ALL.iter().any(|d| first_line.trim_end() == marker(*d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_start_with_their_marker() {
        for dialect in Dialect::ALL {
            assert!(canned_example(dialect).starts_with(marker(dialect)));
            assert!(is_pristine(canned_example(dialect)));
        }
    }

    #[test]
    fn test_pristine_checks_first_line_only() {
        assert!(is_pristine("// JavaScript Playground\nconsole.log('edited below')"));
        assert!(!is_pristine("console.log(1)\n// TypeScript Playground"));
        assert!(!is_pristine("// TypeScript Playground, but edited"));
        assert!(!is_pristine(""));
        let edited = format!("{}\nconsole.log('mine')", canned_example(Dialect::Untyped));
        assert!(is_pristine(&edited));
    }
}
