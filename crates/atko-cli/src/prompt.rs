//! Interactive questions

use std::io::{self, BufRead, Write};

use crate::error::{CliError, CliResult};

/// Asks the user for input
pub trait Prompter: Send + Sync {
    /// Answer to `question`; `default` when the answer is empty
    ///
    /// # Errors
    ///
    /// I/O errors; [`CliError::Cancelled`] when input ends.
    fn ask(&self, question: &str, default: Option<&str>) -> CliResult<String>;

    /// Yes/no answer, no by default
    ///
    /// # Errors
    ///
    /// See [`Prompter::ask`].
    fn confirm(&self, question: &str) -> CliResult<bool> {
        let answer = self.ask(&format!("{question} [y/N]"), Some("n"))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Questions on stderr, answers from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Prompter for Terminal {
    fn ask(&self, question: &str, default: Option<&str>) -> CliResult<String> {
        let mut stderr = io::stderr().lock();
        match default {
            Some(default) if !question.ends_with(']') => write!(stderr, "{question} [{default}]: ")?,
            _ => write!(stderr, "{question}: ")?,
        }
        stderr.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(CliError::Cancelled);
        }
        let answer = line.trim();
        Ok(match (answer.is_empty(), default) {
            (true, Some(default)) => default.to_string(),
            _ => answer.to_string(),
        })
    }
}

/// Answer parsed as a number
///
/// # Errors
///
/// [`CliError::InvalidArguments`] for answers that are not a non-negative integer.
pub fn ask_count(prompter: &dyn Prompter, question: &str, default: usize) -> CliResult<usize> {
    let answer = prompter.ask(question, Some(&default.to_string()))?;
    answer
        .parse()
        .map_err(|_| CliError::InvalidArguments(format!("'{answer}' is not a number")))
}
