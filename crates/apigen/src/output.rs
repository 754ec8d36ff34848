//! Terminal rendering of generation results
//!
//! `generate` prints one status line per planned file and a closing tally;
//! `slots` and `exports` print the tables the parity checks compare.
//! Color follows `--color` unless `NO_COLOR` is set.

use std::io::Write;
use std::path::Path;

use apigen::{FileStatus, GenerationReport};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Whether log lines on stderr may carry ANSI escapes
pub fn stderr_ansi(choice: ColorChoice) -> bool {
    use std::io::IsTerminal;
    match choice {
        ColorChoice::Never => false,
        ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Green bold text.
    pub fn success(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Green), true);
    }

    /// Yellow bold text.
    pub fn warning(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Yellow), true);
    }

    /// Cyan text.
    pub fn info(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Cyan), false);
    }

    /// Dim text.
    pub fn dim(&mut self, text: &str) {
        self.write_styled(text, Some(Color::White), false);
    }

    /// Bold text.
    pub fn bold(&mut self, text: &str) {
        self.write_styled(text, None, true);
    }

    pub fn plain(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    pub fn newline(&mut self) {
        let _ = writeln!(self.stdout);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// `   written path/to/file`, highlighted when the file changed
    pub fn file_status(&mut self, path: &Path, status: FileStatus) {
        let label = format!("{:>10}", status);
        match status {
            FileStatus::Written | FileStatus::Created => self.success(&label),
            FileStatus::Unchanged | FileStatus::Preserved => self.dim(&label),
        }
        self.plain(&format!(" {}", path.display()));
        self.newline();
    }

    /// Closing tally of a `generate` run
    pub fn generation_summary(&mut self, report: &GenerationReport) {
        self.newline();
        if report.dry_run {
            self.warning("Dry run: ");
            self.plain(&format!("{} file(s) would change", report.changed().count()));
        } else {
            self.success("Done: ");
            self.plain(&format!(
                "{} written, {} created, {} unchanged, {} preserved",
                report.count(FileStatus::Written),
                report.count(FileStatus::Created),
                report.count(FileStatus::Unchanged),
                report.count(FileStatus::Preserved)
            ));
        }
        self.newline();
    }

    /// Red bold `error:` prefix plus message, on stderr.
    pub fn stderr_error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "error:");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, " {}", text);
    }
}
