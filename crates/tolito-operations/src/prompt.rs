/// Asks the user a question.
pub trait Prompter: Send + Sync {
    /// Shows `question` and returns the answer, or `default` on empty input.
    fn ask(&self, question: &str, default: &str) -> String;
}

/// Whether an answer means yes. Anything not starting with `n` does.
pub fn is_yes(answer: &str) -> bool {
    !answer
        .trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'n'))
}

/// Yes/no question defaulting to yes.
pub fn confirm(prompter: &dyn Prompter, question: &str) -> bool {
    is_yes(&prompter.ask(question, "y"))
}
