use std::{
    fmt::Display,
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
};

use nu_ansi_term::Color;
use tolito_core::{error::ErrorContext, CoreResult};
use tolito_operations::Prompter;
use tracing::warn;

use crate::progress;

pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const DECLINED: &str = "○";
    pub const SKIPPED: &str = "•";
    pub const WARNING: &str = "⚠";
}

pub static COLOR: AtomicBool = AtomicBool::new(true);

pub fn set_color(enabled: bool) {
    COLOR.store(enabled, Ordering::Relaxed);
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if COLOR.load(Ordering::Relaxed) {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

pub fn interactive_ask(ques: &str) -> CoreResult<String> {
    let mut response = String::new();
    let mut result = Ok(0);

    progress::suspend(|| {
        print!("{ques} ");
        if let Err(err) = std::io::stdout().flush() {
            result = Err(err);
            return;
        }
        result = std::io::stdin().read_line(&mut response);
    });
    result.with_context(|| "reading input from stdin".to_string())?;

    Ok(response.trim().to_owned())
}

/// Prompts on the terminal. Empty input, a closed stdin or a read error yield the default.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, question: &str, default: &str) -> String {
        match interactive_ask(question) {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => default.to_string(),
            Err(err) => {
                warn!("{err}");
                default.to_string()
            }
        }
    }
}
