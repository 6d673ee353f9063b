//! Interactive prompts.
//!
//! Commands never read the terminal directly; they ask a [`Prompter`]. The
//! binary wires in [`StdinPrompter`], tests wire in a scripted one.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Asks the user a question and returns the trimmed answer.
pub trait Prompter {
    /// Displays `question` and blocks for one line of input.
    ///
    /// End of input yields an empty answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written to or read from.
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Prompter reading answers from standard input.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> Result<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{question}").context("Failed to write prompt")?;
        stdout.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read answer from stdin")?;
        Ok(line.trim().to_string())
    }
}

/// Asks a question and substitutes `default` for an empty answer.
///
/// # Errors
///
/// Propagates prompter failures.
pub fn ask_or_default(prompter: &mut dyn Prompter, question: &str, default: &str) -> Result<String> {
    let answer = prompter.ask(question)?;
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

/// Yes/no prompt where only an explicit "y"/"yes" counts as yes.
///
/// # Errors
///
/// Propagates prompter failures.
pub fn confirm_default_no(prompter: &mut dyn Prompter, question: &str) -> Result<bool> {
    let answer = prompter.ask(question)?.to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Yes/no prompt where any non-empty answer but "n"/"no" counts as yes.
///
/// An empty answer counts as no.
///
/// # Errors
///
/// Propagates prompter failures.
pub fn confirm_non_empty(prompter: &mut dyn Prompter, question: &str) -> Result<bool> {
    let answer = prompter.ask(question)?.to_lowercase();
    Ok(!matches!(answer.as_str(), "" | "n" | "no"))
}
