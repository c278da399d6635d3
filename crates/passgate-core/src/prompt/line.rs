//! Line-based console prompts.
//!
//! Every prompt writes `<text> [<default>]: ` and reads exactly one line.
//! Nothing here retries; loops live in [`crate::confirm`].

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use tracing::trace;

use crate::traits::PromptError;

/// Hint shown when a yes/no question defaults to yes.
const DEFAULT_YES: &str = "Y/n";
/// Hint shown when a yes/no question defaults to no.
const DEFAULT_NO: &str = "y/N";

/// A console made of an input and an output stream.
///
/// Production code uses [`Console::stdio`]; tests feed a `Cursor` and
/// collect the output in a `Vec<u8>`.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    /// Console bound to the process's standard input and output.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Create a console over the given streams.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for a string once, using `default` if the answer is empty.
    ///
    /// # Errors
    ///
    /// Only I/O failures are returned: `PromptError::Io` if the streams
    /// fail and `PromptError::UnexpectedEof` if input is already closed.
    pub fn ask_for_string(&mut self, text: &str, default: &str) -> Result<String, PromptError> {
        write!(self.output, "{} [{}]: ", text, default)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::UnexpectedEof);
        }

        let answer = line.trim();
        trace!(empty = answer.is_empty(), "Read answer");
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer.to_string())
        }
    }

    /// Ask a yes/no question exactly once.
    ///
    /// An empty answer selects `default`. Otherwise the first letter
    /// decides, case-insensitively; anything other than `y` or `n` is an
    /// error.
    pub fn ask_for_bool(&mut self, text: &str, default: bool) -> Result<bool, PromptError> {
        let choices = if default { DEFAULT_YES } else { DEFAULT_NO };

        let answer = self.ask_for_string(text, choices)?;
        match answer.as_str() {
            DEFAULT_YES => return Ok(true),
            DEFAULT_NO => return Ok(false),
            _ => {}
        }

        match answer.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => Ok(true),
            Some('n') => Ok(false),
            _ => Err(PromptError::UnknownAnswer(answer)),
        }
    }

    /// Ask for an integer exactly once.
    ///
    /// An empty answer selects `default`; a non-numeric answer is an error
    /// and never falls back to the default.
    pub fn ask_for_int(&mut self, text: &str, default: i64) -> Result<i64, PromptError> {
        let answer = self.ask_for_string(text, &default.to_string())?;
        Ok(answer.parse::<i64>()?)
    }

    /// Write a full line of output.
    pub fn write_line(&mut self, line: impl Display) -> Result<(), PromptError> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    /// Flush pending output.
    pub fn flush(&mut self) -> Result<(), PromptError> {
        self.output.flush()?;
        Ok(())
    }

    /// Get the input stream (for testing).
    #[cfg(test)]
    pub(crate) fn input(&self) -> &R {
        &self.input
    }

    /// Get the output stream (for testing).
    #[cfg(test)]
    pub(crate) fn output(&self) -> &W {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn written(console: &Console<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(console.output()).to_string()
    }

    #[test]
    fn string_prompt_format() {
        let mut c = console("value\n");
        c.ask_for_string("Name", "bob").unwrap();
        assert_eq!(written(&c), "Name [bob]: ");
    }

    #[test]
    fn string_empty_uses_default() {
        let mut c = console("\n");
        assert_eq!(c.ask_for_string("Name", "bob").unwrap(), "bob");
    }

    #[test]
    fn string_whitespace_only_uses_default() {
        let mut c = console("   \t \n");
        assert_eq!(c.ask_for_string("Name", "bob").unwrap(), "bob");
    }

    #[test]
    fn string_is_trimmed() {
        let mut c = console("  alice  \n");
        assert_eq!(c.ask_for_string("Name", "bob").unwrap(), "alice");
    }

    #[test]
    fn string_without_trailing_newline() {
        let mut c = console("alice");
        assert_eq!(c.ask_for_string("Name", "bob").unwrap(), "alice");
    }

    #[test]
    fn string_closed_input_is_error() {
        let mut c = console("");
        let result = c.ask_for_string("Name", "bob");
        assert!(matches!(result, Err(PromptError::UnexpectedEof)));
    }

    #[test]
    fn bool_hint_reflects_default() {
        let mut c = console("\n");
        c.ask_for_bool("Continue?", true).unwrap();
        assert_eq!(written(&c), "Continue? [Y/n]: ");

        let mut c = console("\n");
        c.ask_for_bool("Continue?", false).unwrap();
        assert_eq!(written(&c), "Continue? [y/N]: ");
    }

    #[test]
    fn bool_empty_returns_default() {
        assert!(console("\n").ask_for_bool("?", true).unwrap());
        assert!(!console("\n").ask_for_bool("?", false).unwrap());
    }

    #[test]
    fn bool_accepts_yes_and_no_any_case() {
        for (input, expected) in [
            ("y\n", true),
            ("Y\n", true),
            ("yes\n", true),
            ("YES\n", true),
            ("n\n", false),
            ("N\n", false),
            ("no\n", false),
            ("Nope\n", false),
        ] {
            assert_eq!(console(input).ask_for_bool("?", true).unwrap(), expected);
            assert_eq!(console(input).ask_for_bool("?", false).unwrap(), expected);
        }
    }

    #[test]
    fn bool_accepts_hint_strings() {
        assert!(console("Y/n\n").ask_for_bool("?", false).unwrap());
        assert!(!console("y/N\n").ask_for_bool("?", true).unwrap());
    }

    #[test]
    fn bool_rejects_other_answers() {
        let result = console("maybe\n").ask_for_bool("?", true);
        match result {
            Err(PromptError::UnknownAnswer(answer)) => assert_eq!(answer, "maybe"),
            other => panic!("expected unknown answer, got {:?}", other),
        }
    }

    #[test]
    fn bool_closed_input_is_io_error() {
        let result = console("").ask_for_bool("?", true);
        assert!(matches!(result, Err(PromptError::UnexpectedEof)));
    }

    #[test]
    fn int_parses_answer() {
        assert_eq!(console("42\n").ask_for_int("Count", 7).unwrap(), 42);
        assert_eq!(console("-3\n").ask_for_int("Count", 7).unwrap(), -3);
    }

    #[test]
    fn int_empty_returns_default() {
        let mut c = console("\n");
        assert_eq!(c.ask_for_int("Count", 7).unwrap(), 7);
        assert_eq!(written(&c), "Count [7]: ");
    }

    #[test]
    fn int_rejects_non_numeric() {
        let result = console("seven\n").ask_for_int("Count", 7);
        assert!(matches!(result, Err(PromptError::InvalidNumber(_))));
    }

    #[test]
    fn write_line_appends_newline() {
        let mut c = console("");
        c.write_line("hello").unwrap();
        assert_eq!(written(&c), "hello\n");
    }
}
