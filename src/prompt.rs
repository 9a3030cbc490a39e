// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Operator confirmation.
//!
//! Conflicts that dot cannot settle by itself are handed to the operator as a
//! question with three possible answers. The question is asked through the
//! [`Confirm`] capability, so headless callers can answer it themselves.

use inquire::Select;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::debug;

/// Operator's answer to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Go ahead for this entry only.
    Yes,

    /// Skip this entry.
    No,

    /// Go ahead for this entry and every remaining entry of the run.
    All,
}

impl Answer {
    /// Check if answer allows the action to happen.
    pub fn is_affirmative(self) -> bool {
        matches!(self, Self::Yes | Self::All)
    }
}

impl Display for Answer {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Yes => fmt.write_str("Yes"),
            Self::No => fmt.write_str("No"),
            Self::All => fmt.write_str("All"),
        }
    }
}

/// Ask the operator a question.
pub trait Confirm {
    /// Block until the operator answers `question`.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if no answer can be obtained.
    fn confirm(&mut self, question: &str) -> Result<Answer>;
}

/// Interactive confirmation on the terminal through inquire.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquireConfirm;

impl InquireConfirm {
    /// Construct new terminal prompt.
    pub fn new() -> Self {
        Self
    }
}

impl Confirm for InquireConfirm {
    fn confirm(&mut self, question: &str) -> Result<Answer> {
        let answer = Select::new(question, vec![Answer::Yes, Answer::All, Answer::No])
            .with_help_message("All applies the answer to every remaining entry")
            .prompt()?;
        debug!("operator answered {answer} to {question:?}");

        Ok(answer)
    }
}

/// Prompt error types.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Prompt failed or was cancelled.
    #[error(transparent)]
    Inquire(#[from] inquire::InquireError),
}

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;
