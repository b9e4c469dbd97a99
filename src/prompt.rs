//! Confirmation prompts for destructive commands.

use std::io::{self, BufRead, Write};

use crate::Result;

pub trait Confirmer: Send + Sync {
    /// Ask the operator a yes/no question. `false` means the caller must
    /// abort without side effects.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Reads a y/n answer from stdin. Defaults to no.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, question: &str) -> Result<bool> {
        eprint!("{} [y/N] ", question);
        io::stderr().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
    }
}

/// Used for `--yes` and scripted recovery runs.
pub struct AlwaysConfirm;

impl Confirmer for AlwaysConfirm {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(true)
    }
}
