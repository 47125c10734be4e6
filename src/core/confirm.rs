//! Operator confirmations.
//!
//! Recipes ask through [`Confirm`] so the answer can come from a terminal,
//! a `--yes` flag or a scripted test.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

pub trait Confirm {
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Asks on stderr and reads a line from stdin. Without an interactive
/// terminal the default answer is returned.
pub struct TerminalConfirm {
    interactive: bool,
}

impl TerminalConfirm {
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }
}

impl Default for TerminalConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str, default: bool) -> bool {
        if !self.interactive {
            return default;
        }

        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{} {}: ", question, suffix);
        io::stderr().flush().ok();

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return default;
        }

        parse_answer(&input).unwrap_or(default)
    }
}

/// Answers yes to everything (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str, _default: bool) -> bool {
        log_status!("confirm", "{} -> yes", question);
        true
    }
}

/// Canned answers in order; falls back to the default once exhausted.
/// Every question asked is kept for inspection.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str, default: bool) -> bool {
        self.asked.borrow_mut().push(question.to_string());
        self.answers.borrow_mut().pop_front().unwrap_or(default)
    }
}

/// `y`/`yes` and `n`/`no`, case-insensitive. Anything else is no answer.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
