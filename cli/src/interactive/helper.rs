use std::borrow::Cow;
use std::collections::BTreeSet;
use std::marker::PhantomData;

use anstyle::Style;
use clap::{Command, CommandFactory};
use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    hint::Hinter,
    validate::{ValidationContext, ValidationResult, Validator},
    Context,
};
use rustyline_derive::Helper;

/// Register names offered by the completion
const REGISTERS: [&str; 7] = ["pc", "ir", "ac", "l", "ma", "sr", "fpac"];

/// Rustyline helper, that handles interactive completion, highlighting and hinting.
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    app: PhantomData<T>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new() -> Self {
        RunHelper { app: PhantomData }
    }

    /// Candidates for the word under the cursor, with the length of the already typed part
    fn suggestions_at(line: &str, pos: usize) -> Option<(usize, BTreeSet<String>)> {
        let line = line.get(..pos)?;
        let mut words = shell_words::split(line).ok()?;

        // After a space, complete the next (empty) word
        if line.ends_with([' ', '\t']) {
            words.push(String::new());
        }

        Some(suggest(&T::command(), &words))
    }
}

fn suggest(command: &Command, input: &[String]) -> (usize, BTreeSet<String>) {
    match input {
        [] => (0, candidates(command, 0)),

        [last] => (
            last.len(),
            candidates(command, 0)
                .into_iter()
                .filter(|candidate| candidate.starts_with(last.as_str()))
                .collect(),
        ),

        [head, tail @ ..] => match command.find_subcommand(head) {
            Some(sub) => suggest(sub, tail),
            None => {
                // Positional arguments of the current command
                let last = tail.last().map_or("", String::as_str);
                let candidates = candidates(command, tail.len())
                    .into_iter()
                    .filter(|candidate| candidate.starts_with(last))
                    .collect();
                (last.len(), candidates)
            }
        },
    }
}

/// Words accepted at a position: subcommands first, then positional argument values
fn candidates(command: &Command, position: usize) -> BTreeSet<String> {
    let mut candidates = BTreeSet::new();

    if position == 0 {
        for sub in command.get_subcommands() {
            candidates.insert(sub.get_name().to_string());
            candidates.extend(sub.get_visible_aliases().map(ToString::to_string));
        }

        if command.has_subcommands() {
            candidates.insert("help".to_string());
        }
    }

    if let Some(arg) = command.get_positionals().nth(position) {
        if matches!(arg.get_id().as_str(), "register" | "target") {
            candidates.extend(REGISTERS.iter().map(ToString::to_string));
        }

        candidates.extend(
            arg.get_possible_values()
                .into_iter()
                .map(|value| value.get_name().to_string()),
        );
    }

    candidates
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(Self::suggestions_at(line, pos).map_or((0, Vec::new()), |(typed, candidates)| {
            (pos - typed, candidates.into_iter().collect())
        }))
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        let style = Style::new().dimmed();
        Cow::Owned(format!("{style}{hint}{style:#}"))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        let style = Style::new().bold();
        Cow::Owned(format!("{style}{prompt}{style:#}"))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let (typed, candidates) = Self::suggestions_at(line, pos)?;

        // Only hint when there is no ambiguity
        if candidates.len() != 1 {
            return None;
        }

        let candidate = candidates.into_iter().next()?;
        candidate.get(typed..).map(ToString::to_string)
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        // Unbalanced quotes continue on the next line
        if shell_words::split(ctx.input()).is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}
