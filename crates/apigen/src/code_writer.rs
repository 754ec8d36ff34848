//! Code writer with automatic indentation tracking for code generation.
//!
//! Every dialect apigen emits (C#, C++ and the C-ABI shim) uses Allman
//! braces, so `block` writes the header, then `{` on its own line, the
//! indented body, and the closing brace.
//!
//! ```
//! use apigen::code_writer::CodeWriter;
//! use apigen::cw_writeln;
//!
//! let mut w = CodeWriter::with_indent_spaces(String::new(), 4);
//! w.block("class Example", |w| {
//!     cw_writeln!(w, "int value = {};", 42)
//! })
//! .unwrap();
//! assert_eq!(w.into_inner(), "class Example\n{\n    int value = 42;\n}\n");
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A code writer that tracks indentation.
pub struct CodeWriter<W> {
    writer: W,
    indent_level: Rc<Cell<usize>>,
    indent_string: String,
    at_line_start: Cell<bool>,
}

impl<W: fmt::Write> CodeWriter<W> {
    /// Create a new CodeWriter with the given writer and indent string (e.g., "    " or "\t")
    pub fn new(writer: W, indent_string: String) -> Self {
        Self {
            writer,
            indent_level: Rc::new(Cell::new(0)),
            indent_string,
            at_line_start: Cell::new(true),
        }
    }

    /// Create a new CodeWriter indenting with `spaces` spaces
    pub fn with_indent_spaces(writer: W, spaces: usize) -> Self {
        Self::new(writer, " ".repeat(spaces))
    }

    /// Write text without a newline. Adds indentation if at line start.
    pub fn write(&mut self, text: &str) -> fmt::Result {
        if text.is_empty() {
            return Ok(());
        }

        if self.at_line_start.get() && !text.trim().is_empty() {
            for _ in 0..self.indent_level.get() {
                self.writer.write_str(&self.indent_string)?;
            }
            self.at_line_start.set(false);
        }

        self.writer.write_str(text)
    }

    /// Write text followed by a newline. Adds indentation if needed.
    pub fn writeln(&mut self, text: &str) -> fmt::Result {
        self.write(text)?;
        self.writer.write_char('\n')?;
        self.at_line_start.set(true);
        Ok(())
    }

    /// Write an empty line
    pub fn blank_line(&mut self) -> fmt::Result {
        self.writer.write_char('\n')?;
        self.at_line_start.set(true);
        Ok(())
    }

    /// Write a line with no indentation regardless of the current level.
    ///
    /// Used for preprocessor directives nested inside class bodies.
    pub fn writeln_unindented(&mut self, text: &str) -> fmt::Result {
        self.writer.write_str(text)?;
        self.writer.write_char('\n')?;
        self.at_line_start.set(true);
        Ok(())
    }

    /// Create an indentation guard. Indentation increases while the guard is alive.
    pub fn indent(&mut self) -> IndentGuard {
        self.indent_level.set(self.indent_level.get() + 1);
        IndentGuard {
            indent_level: Rc::clone(&self.indent_level),
        }
    }

    /// Write a complete Allman block: header line, `{`, body, `}`
    ///
    /// The body may fail with any error a formatting error converts into,
    /// so emitters can propagate their own errors out of nested blocks.
    pub fn block<F, E>(&mut self, header: &str, body: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
        E: From<fmt::Error>,
    {
        self.block_with_suffix(header, "", body)
    }

    /// Like `block`, with text appended to the closing brace (e.g. `;` for C++ types)
    pub fn block_with_suffix<F, E>(&mut self, header: &str, suffix: &str, body: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
        E: From<fmt::Error>,
    {
        self.writeln(header)?;
        self.braces_with_suffix(suffix, body)
    }

    /// Write a braced body without a header line
    pub fn braces<F, E>(&mut self, body: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
        E: From<fmt::Error>,
    {
        self.braces_with_suffix("", body)
    }

    fn braces_with_suffix<F, E>(&mut self, suffix: &str, body: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
        E: From<fmt::Error>,
    {
        self.writeln("{")?;
        {
            let _indent = self.indent();
            body(self)?;
        }
        self.writeln(&format!("}}{}", suffix))?;
        Ok(())
    }

    /// Get the current indentation level
    pub fn indent_level(&self) -> usize {
        self.indent_level.get()
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write formatted text (like write! macro)
    #[doc(hidden)]
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        let formatted = format!("{}", args);
        self.write(&formatted)
    }

    /// Write formatted text with newline (like writeln! macro)
    #[doc(hidden)]
    pub fn writeln_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        let formatted = format!("{}", args);
        self.writeln(&formatted)
    }
}

/// RAII guard that maintains indentation level
pub struct IndentGuard {
    indent_level: Rc<Cell<usize>>,
}

impl Drop for IndentGuard {
    fn drop(&mut self) {
        let current = self.indent_level.get();
        self.indent_level.set(current.saturating_sub(1));
    }
}

/// Write formatted text to a CodeWriter (like std::write!)
#[macro_export]
macro_rules! cw_write {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt(format_args!($($arg)*))
    };
}

/// Write formatted text with newline to a CodeWriter (like std::writeln!)
#[macro_export]
macro_rules! cw_writeln {
    ($writer:expr, $($arg:tt)*) => {
        $writer.writeln_fmt(format_args!($($arg)*))
    };
}
