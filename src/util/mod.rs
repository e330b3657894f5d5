pub mod cli;
mod path;

pub use self::path::*;

use once_cell_regex::exports::regex::{Captures, Regex};
use std::{borrow::Cow, fmt::Display};
use thiserror::Error;

pub fn list_display(list: &[impl Display]) -> String {
    if list.len() == 1 {
        list[0].to_string()
    } else if list.len() == 2 {
        format!("{} and {}", list[0], list[1])
    } else {
        let mut display = String::new();
        for (idx, item) in list.iter().enumerate() {
            let formatted = if idx + 1 == list.len() {
                // this is the last item
                format!("and {}", item)
            } else {
                format!("{}, ", item)
            };
            display.push_str(&formatted);
        }
        display
    }
}

#[derive(Debug, Error)]
#[error("{value:?} contains a NUL byte and can't be passed through a shell")]
pub struct ShellEscapeError {
    value: String,
}

/// Quotes `value` so a POSIX shell reads it back as a single word.
pub fn shell_escape(value: &str) -> Result<Cow<'_, str>, ShellEscapeError> {
    shlex::try_quote(value).map_err(|_| ShellEscapeError {
        value: value.to_owned(),
    })
}

#[derive(Debug, Error)]
pub enum RunAndSearchError {
    #[error(transparent)]
    CommandFailed(#[from] std::io::Error),
    #[error("{command:?} output failed to match regex: {output:?}")]
    SearchFailed { command: String, output: String },
}

pub fn run_and_search<T>(
    command: &mut duct::Expression,
    re: &Regex,
    f: impl FnOnce(&str, Captures<'_>) -> T,
) -> Result<T, RunAndSearchError> {
    let command_string = format!("{:?}", command);
    let output = command.read()?;
    search(&command_string, &output, re, f)
}

pub(crate) fn search<T>(
    command: &str,
    output: &str,
    re: &Regex,
    f: impl FnOnce(&str, Captures<'_>) -> T,
) -> Result<T, RunAndSearchError> {
    re.captures(output)
        .ok_or_else(|| RunAndSearchError::SearchFailed {
            command: command.to_owned(),
            output: output.to_owned(),
        })
        .map(|caps| f(output, caps))
}

#[cfg(test)]
mod test {
    use super::*;
    use once_cell_regex::regex;
    use rstest::rstest;

    #[rstest(
        list,
        expected,
        case(&["iPhone 14"], "iPhone 14"),
        case(&["iPhone 14", "iPad Air"], "iPhone 14 and iPad Air"),
        case(&["iPhone 14", "iPad Air", "Apple TV"], "iPhone 14, iPad Air, and Apple TV")
    )]
    fn test_list_display(list: &[&str], expected: &str) {
        assert_eq!(list_display(list), expected);
    }

    #[rstest(
        input,
        expected,
        case("build.log", "build.log"),
        case("/tmp/snapshot/build.log", "/tmp/snapshot/build.log")
    )]
    fn test_shell_escape_plain_words_untouched(input: &str, expected: &str) {
        assert_eq!(shell_escape(input).unwrap(), expected);
    }

    #[test]
    fn test_shell_escape_quotes_spaces() {
        let escaped = shell_escape("My Logs/build.log").unwrap();
        assert_ne!(escaped, "My Logs/build.log");
        assert_eq!(shlex::split(&escaped).unwrap(), vec!["My Logs/build.log"]);
    }

    #[test]
    fn test_shell_escape_rejects_nul() {
        assert!(shell_escape("bad\0path").is_err());
    }

    #[test]
    fn test_search_reports_unmatched_output() {
        let err = search("xcodebuild -version -sdk", "nothing here", regex!(r"iOS (\d+)"), |_, _| ())
            .unwrap_err();
        assert!(matches!(err, RunAndSearchError::SearchFailed { .. }));
    }
}
