//! Worker job scripts
//!
//! A script is the text after the `worker` keyword: commands separated by
//! `;`. It is parsed once into a tree of [`Step`]s. `repeat N` takes the
//! whole remainder of the command list as its body, so nested repeats
//! multiply:
//!
//! ```text
//! increment0;msleep50;repeat3;increment1
//!   -> [Increment(0), Sleep(50ms), Repeat { times: 3, body: [Increment(1)] }]
//! ```

pub mod interpreter;

pub use interpreter::{ExecSummary, Interpreter};

use crate::core::errors::DispatchError;
use crate::counters::CounterId;
use std::time::Duration;
use tracing::debug;

/// One parsed script command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Suspend the executing worker thread
    Sleep(Duration),
    /// Add 1 to a counter
    Increment(CounterId),
    /// Subtract 1 from a counter
    Decrement(CounterId),
    /// Run `body` (the rest of the script) `times` times
    Repeat { times: u64, body: Script },
}

/// Ordered list of steps making up one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
}

/// Result of parsing, including the commands that were skipped
#[derive(Debug)]
pub struct ParseOutcome {
    pub script: Script,
    pub skipped: Vec<DispatchError>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Parse a script, logging and dropping malformed commands
    pub fn parse(text: &str) -> Self {
        let outcome = Self::parse_with_issues(text);
        for issue in &outcome.skipped {
            debug!(error = %issue, "Skipping script command");
        }
        outcome.script
    }

    /// Parse a script and report every skipped command
    pub fn parse_with_issues(text: &str) -> ParseOutcome {
        let mut skipped = Vec::new();
        let mut commands = text.split(';').map(str::trim).filter(|c| !c.is_empty());
        let script = parse_commands(&mut commands, &mut skipped, 0);
        ParseOutcome { script, skipped }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of counter updates a full run performs, repeats expanded
    pub fn counter_ops(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Sleep(_) => 0,
                Step::Increment(_) | Step::Decrement(_) => 1,
                Step::Repeat { times, body } => times.saturating_mul(body.counter_ops()),
            })
            .fold(0u64, u64::saturating_add)
    }
}

/// Deepest `repeat` nesting a script may use. Anything nested further is
/// dropped as a parse issue, which bounds the recursion in both the parser
/// and the interpreter.
pub const MAX_REPEAT_DEPTH: usize = 128;

// Recursive descent: a `repeat` swallows everything left in `commands`.
fn parse_commands<'a, I>(
    commands: &mut I,
    skipped: &mut Vec<DispatchError>,
    depth: usize,
) -> Script
where
    I: Iterator<Item = &'a str>,
{
    let mut steps = Vec::new();

    while let Some(command) = commands.next() {
        match parse_command(command) {
            Ok(Command::Step(step)) => steps.push(step),
            Ok(Command::Repeat(_)) if depth >= MAX_REPEAT_DEPTH => {
                let dropped = commands.by_ref().count();
                skipped.push(DispatchError::parse(
                    command,
                    format!(
                        "repeat nested deeper than {}, dropping {} remaining commands",
                        MAX_REPEAT_DEPTH, dropped
                    ),
                ));
                break;
            }
            Ok(Command::Repeat(times)) => {
                // An unparsable count repeats the remainder zero times.
                let times = times.unwrap_or_else(|e| {
                    skipped.push(e);
                    0
                });
                let body = parse_commands(commands, skipped, depth + 1);
                steps.push(Step::Repeat { times, body });
                break;
            }
            Err(e) => skipped.push(e),
        }
    }

    Script::new(steps)
}

enum Command {
    Step(Step),
    Repeat(Result<u64, DispatchError>),
}

const KEYWORDS: [&str; 4] = ["msleep", "increment", "decrement", "repeat"];

fn parse_command(command: &str) -> Result<Command, DispatchError> {
    let keyword = KEYWORDS
        .iter()
        .find(|k| command.starts_with(*k))
        .ok_or_else(|| DispatchError::parse(command, "unknown command"))?;
    let arg = command[keyword.len()..].trim();

    let command = match *keyword {
        "msleep" => Command::Step(Step::Sleep(Duration::from_millis(parse_count(command, arg)?))),
        "increment" => Command::Step(Step::Increment(parse_counter(command, arg)?)),
        "decrement" => Command::Step(Step::Decrement(parse_counter(command, arg)?)),
        _ => Command::Repeat(parse_count(command, arg)),
    };
    Ok(command)
}

// Negative durations and repeat counts clamp to 0.
fn parse_count(command: &str, arg: &str) -> Result<u64, DispatchError> {
    arg.parse::<i64>()
        .map(|n| n.max(0) as u64)
        .map_err(|e| DispatchError::parse(command, format!("invalid argument '{}': {}", arg, e)))
}

fn parse_counter(command: &str, arg: &str) -> Result<CounterId, DispatchError> {
    arg.parse::<CounterId>()
        .map_err(|e| DispatchError::parse(command, format!("invalid counter id '{}': {}", arg, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_flat() {
        let script = Script::parse("increment0; decrement 3 ;msleep50");
        assert_eq!(
            script.steps(),
            &[
                Step::Increment(0),
                Step::Decrement(3),
                Step::Sleep(Duration::from_millis(50)),
            ]
        );
    }

    #[test]
    fn test_repeat_consumes_remainder() {
        let script = Script::parse("increment0;msleep50;repeat3;increment1;decrement2");
        assert_eq!(
            script.steps(),
            &[
                Step::Increment(0),
                Step::Sleep(Duration::from_millis(50)),
                Step::Repeat {
                    times: 3,
                    body: Script::new(vec![Step::Increment(1), Step::Decrement(2)]),
                },
            ]
        );
        assert_eq!(script.counter_ops(), 7);
    }

    #[test]
    fn test_nested_repeat() {
        let script = Script::parse("repeat2;repeat2;increment0");
        assert_eq!(
            script.steps(),
            &[Step::Repeat {
                times: 2,
                body: Script::new(vec![Step::Repeat {
                    times: 2,
                    body: Script::new(vec![Step::Increment(0)]),
                }]),
            }]
        );
        assert_eq!(script.counter_ops(), 4);
    }

    #[test]
    fn test_unknown_commands_skipped() {
        let outcome = Script::parse_with_issues("frobnicate;increment1;;  ;jump 3");
        assert_eq!(outcome.script.steps(), &[Step::Increment(1)]);
        assert_eq!(outcome.skipped.len(), 2);
        assert!(outcome.skipped.iter().all(|e| e.category() == "parse"));
    }

    #[test]
    fn test_bad_arguments_skipped() {
        let outcome = Script::parse_with_issues("increment;decrement x;increment2");
        assert_eq!(outcome.script.steps(), &[Step::Increment(2)]);
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn test_bad_repeat_count_repeats_zero_times() {
        let outcome = Script::parse_with_issues("increment1;repeat many;increment0;decrement2");
        assert_eq!(
            outcome.script.steps(),
            &[
                Step::Increment(1),
                Step::Repeat {
                    times: 0,
                    body: Script::new(vec![Step::Increment(0), Step::Decrement(2)]),
                },
            ]
        );
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.script.counter_ops(), 1);

        let bare = Script::parse("repeat;increment0");
        assert_eq!(bare.counter_ops(), 0);
    }

    #[test]
    fn test_repeat_depth_is_bounded() {
        let text = format!("{}increment0", "repeat1;".repeat(100_000));
        let outcome = Script::parse_with_issues(&text);

        assert_eq!(outcome.skipped.len(), 1);
        assert!(matches!(&outcome.skipped[0], DispatchError::Parse { .. }));

        let mut depth = 0;
        let mut steps = outcome.script.steps();
        while let [Step::Repeat { times: 1, body }] = steps {
            depth += 1;
            steps = body.steps();
        }
        assert_eq!(depth, MAX_REPEAT_DEPTH);
        assert!(steps.is_empty());
        assert_eq!(outcome.script.counter_ops(), 0);
    }

    #[test]
    fn test_repeat_at_depth_limit_is_kept() {
        let text = format!("{}increment0", "repeat2;".repeat(MAX_REPEAT_DEPTH));
        let outcome = Script::parse_with_issues(&text);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.script.counter_ops(), u64::MAX);
    }

    #[test]
    fn test_negative_arguments() {
        let outcome = Script::parse_with_issues("msleep-5;repeat-2;increment-1");
        assert_eq!(
            outcome.script.steps(),
            &[
                Step::Sleep(Duration::ZERO),
                Step::Repeat {
                    times: 0,
                    body: Script::default(),
                },
            ]
        );
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_empty_script() {
        assert!(Script::parse("").is_empty());
        assert!(Script::parse(" ; ;").is_empty());
    }
}
