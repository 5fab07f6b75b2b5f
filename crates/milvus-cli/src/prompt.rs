//! Interactive prompts.
//!
//! Commands elicit missing parameters through a [`Prompter`]. The REPL uses
//! [`DialoguerPrompter`]; one-shot and script runs use
//! [`NonInteractivePrompter`], which turns a missing parameter into an error
//! and a pending confirmation into a cancellation.

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use std::collections::VecDeque;
use tracing::debug;

use crate::error::{CliError, Result};

/// Source of interactive answers.
pub trait Prompter {
    /// Returns true when a human can answer.
    fn is_interactive(&self) -> bool;

    /// Free text input. An empty answer yields `default` when there is one.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Single choice; returns the selected index.
    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> Result<usize>;

    /// Yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Hidden input.
    fn password(&mut self, prompt: &str) -> Result<String>;
}

/// Terminal prompts rendered with `dialoguer`.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialoguerPrompter {
    /// Creates a prompter with the colorful theme.
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

fn cancelled(e: dialoguer::Error) -> CliError {
    debug!(error = %e, "prompt aborted");
    CliError::Cancelled
}

impl Prompter for DialoguerPrompter {
    fn is_interactive(&self) -> bool {
        true
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(cancelled)
    }

    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(cancelled)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(cancelled)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()
            .map_err(cancelled)
    }
}

/// Prompter for unattended runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn is_interactive(&self) -> bool {
        false
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        default.map(str::to_string).ok_or_else(|| {
            CliError::parameter(prompt, "missing, pass it as a flag when not interactive")
        })
    }

    fn select(&mut self, prompt: &str, _items: &[&str], _default: usize) -> Result<usize> {
        Err(CliError::parameter(
            prompt,
            "missing, pass it as a flag when not interactive",
        ))
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
        debug!(prompt, "confirmation needed without a terminal, use --yes");
        Err(CliError::Cancelled)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Err(CliError::parameter(
            prompt,
            "missing, pass it as a flag when not interactive",
        ))
    }
}

/// Answers from a fixed queue, for tests and piped sessions.
///
/// `select` accepts the item text or its index; `confirm` accepts `y`/`yes`.
/// An empty answer takes the default. Running out of answers cancels.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
}

impl ScriptedPrompter {
    /// Creates a prompter answering in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    /// Answers not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self) -> Result<String> {
        self.answers.pop_front().ok_or(CliError::Cancelled)
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        true
    }

    fn input(&mut self, _prompt: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next()?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        let answer = self.next()?;
        if answer.is_empty() {
            return Ok(default);
        }
        items
            .iter()
            .position(|item| item.eq_ignore_ascii_case(&answer))
            .or_else(|| answer.parse::<usize>().ok().filter(|i| *i < items.len()))
            .ok_or_else(|| {
                CliError::parameter(prompt, format!("'{answer}' is not one of [{}]", items.join(", ")))
            })
    }

    fn confirm(&mut self, _prompt: &str, default: bool) -> Result<bool> {
        let answer = self.next()?;
        Ok(match answer.to_ascii_lowercase().as_str() {
            "" => default,
            "y" | "yes" | "true" => true,
            _ => false,
        })
    }

    fn password(&mut self, _prompt: &str) -> Result<String> {
        self.next()
    }
}
