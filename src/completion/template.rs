//! Engine factories
//!
//! Two shorthand ways to set up a [`Completion`]:
//! - a usage template such as `"git <action> <branch>"`, naming each
//!   positional fragment;
//! - a program name plus one callback per position, with fragments named
//!   `arg0`, `arg1`, ...

use super::reply::Answer;
use super::request::CompletionRequest;
use super::{Completion, CompletionEvent};

/// What a positional callback answers with
pub enum Callback {
    /// Fixed candidates
    Words(Vec<String>),
    /// Candidates computed from the event
    Handler(Box<dyn Fn(&CompletionEvent) -> Answer>),
}

impl Callback {
    /// Fixed candidates
    pub fn words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Callback::Words(words.into_iter().map(Into::into).collect())
    }

    /// Candidates computed from the event
    pub fn handler<F, A>(handler: F) -> Self
    where
        F: Fn(&CompletionEvent) -> A + 'static,
        A: Into<Answer>,
    {
        Callback::Handler(Box::new(move |event: &CompletionEvent| handler(event).into()))
    }

    fn answer(&self, event: &CompletionEvent) -> Answer {
        match self {
            Callback::Words(words) => words.clone().into(),
            Callback::Handler(handler) => handler(event),
        }
    }
}

/// Split a usage template into the program names and fragment names
///
/// `"git <action> <user>"` gives `("git", ["action", "user"])`. Leading `<`
/// and trailing `>` are removed from each fragment.
pub fn parse_template(template: &str) -> (String, Vec<String>) {
    let mut words = template.split_whitespace();
    let program = words.next().unwrap_or_default().to_string();
    let fragments = words
        .map(|word| word.trim_start_matches('<').trim_end_matches('>').to_string())
        .collect();
    (program, fragments)
}

/// Positional fragment name for a 0-based callback index
pub fn positional_name(index: usize) -> String {
    format!("arg{index}")
}

impl Completion {
    /// Create an engine from a usage template
    ///
    /// # Arguments
    /// * `template` - Program names followed by fragment names, e.g. `"git <action>"`
    /// * `request` - Parsed invocation
    pub fn from_template(template: &str, request: CompletionRequest) -> Self {
        let (program, fragments) = parse_template(template);
        let mut completion = Completion::new(&program, request);
        completion.set_fragments(fragments);
        completion
    }

    /// Create an engine answering each position with a callback
    ///
    /// Callback `i` is subscribed to fragment `argI` and replies through the
    /// event's sink.
    pub fn with_callbacks(program: &str, callbacks: Vec<Callback>, request: CompletionRequest) -> Self {
        let mut completion = Completion::new(program.trim(), request);
        completion.set_fragments((0..callbacks.len()).map(positional_name));

        for (index, callback) in callbacks.into_iter().enumerate() {
            completion.on(positional_name(index), move |event: &CompletionEvent| {
                event.reply.reply(callback.answer(event));
            });
        }
        completion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let (program, fragments) = parse_template("git <action> <<user>>");
        assert_eq!(program, "git");
        assert_eq!(fragments, vec!["action", "user"]);
    }

    #[test]
    fn test_parse_template_keeps_aliases() {
        let (program, fragments) = parse_template("  git|g   <action>");
        assert_eq!(program, "git|g");
        assert_eq!(fragments, vec!["action"]);
    }

    #[test]
    fn test_parse_empty_template() {
        let (program, fragments) = parse_template("");
        assert_eq!(program, "");
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_positional_names() {
        assert_eq!(positional_name(0), "arg0");
        assert_eq!(positional_name(12), "arg12");
    }
}
