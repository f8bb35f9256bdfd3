//! Jsh Parser
//!
//! Splits one line of input into a `Command`: the words to execute, at most
//! one input redirect, at most one output redirect (truncating or
//! appending), and whether the command runs in the background.

use std::fmt;

use log::debug;

use crate::errors::{Error, ErrorKind, Result};

const DEFAULT_MAX_LINE_LENGTH: usize = 1024;
const BACKGROUND_MARKER: &str = "&";

/// Limits applied while parsing a line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParserConfig {
    /// Longest accepted line, in bytes.
    pub max_line_length: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Which standard stream a redirection replaces.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RedirectInstruction {
    Input,
    Output,
    Append,
}

impl RedirectInstruction {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(RedirectInstruction::Input),
            ">" => Some(RedirectInstruction::Output),
            ">>" => Some(RedirectInstruction::Append),
            _ => None,
        }
    }

    fn direction(self) -> Direction {
        match self {
            RedirectInstruction::Input => Direction::Input,
            RedirectInstruction::Output | RedirectInstruction::Append => Direction::Output,
        }
    }
}

/// A parsed line.
///
/// `tokens` holds the words as typed; `tokens[0]` is the path handed to
/// `execv`. `argv` is the argument vector for the new program, identical to
/// `tokens` except that `argv[0]` is the basename of `tokens[0]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    pub input: String,
    pub tokens: Vec<String>,
    pub argv: Vec<String>,
    pub input_redirect: Option<String>,
    pub output_redirect: Option<String>,
    pub output_append: Option<String>,
    pub background: bool,
}

impl Command {
    /// Parses `input` with the default `ParserConfig`.
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_config(input, &ParserConfig::default())
    }

    pub fn parse_with_config(input: &str, config: &ParserConfig) -> Result<Self> {
        if input.len() > config.max_line_length {
            return Err(ErrorKind::LineTooLong(config.max_line_length).into());
        }

        let mut command = Command {
            input: input.to_string(),
            ..Default::default()
        };
        let mut pending: Option<RedirectInstruction> = None;

        for token in input
            .split(|c| c == ' ' || c == '\t' || c == '\n')
            .filter(|t| !t.is_empty())
        {
            let instruction = RedirectInstruction::from_token(token);

            if let Some(target_of) = pending.take() {
                if let Some(instruction) = instruction {
                    return Err(ErrorKind::RedirectIsTarget(instruction.direction()).into());
                }
                command.set_redirect(target_of, token);
                continue;
            }

            if let Some(instruction) = instruction {
                if command.has_redirect(instruction.direction()) {
                    return Err(ErrorKind::MultipleRedirects(instruction.direction()).into());
                }
                pending = Some(instruction);
                continue;
            }

            command.push_word(token);
        }

        if let Some(instruction) = pending {
            return Err(ErrorKind::MissingRedirect(instruction.direction()).into());
        }

        if command.tokens.last().map(String::as_str) == Some(BACKGROUND_MARKER) {
            command.tokens.pop();
            command.argv.pop();
            command.background = true;
        }

        if command.argv.is_empty() && command.has_any_redirect() {
            return Err(Error::from(ErrorKind::RedirectWithoutCommand));
        }

        debug!("parsed Command: {:?}", command);
        Ok(command)
    }

    /// Returns `true` if the line held no words.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The word the user typed for the program, used as the `execv` path.
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// The name the program sees as `argv[0]`, also used to name jobs.
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Positional arguments, excluding `argv[0]`.
    pub fn args(&self) -> &[String] {
        if self.argv.is_empty() {
            &[]
        } else {
            &self.argv[1..]
        }
    }

    fn push_word(&mut self, token: &str) {
        let arg = if self.tokens.is_empty() {
            basename(token)
        } else {
            token
        };
        self.tokens.push(token.to_string());
        self.argv.push(arg.to_string());
    }

    fn set_redirect(&mut self, instruction: RedirectInstruction, target: &str) {
        let slot = match instruction {
            RedirectInstruction::Input => &mut self.input_redirect,
            RedirectInstruction::Output => &mut self.output_redirect,
            RedirectInstruction::Append => &mut self.output_append,
        };
        *slot = Some(target.to_string());
    }

    fn has_redirect(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input_redirect.is_some(),
            Direction::Output => self.output_redirect.is_some() || self.output_append.is_some(),
        }
    }

    fn has_any_redirect(&self) -> bool {
        self.has_redirect(Direction::Input) || self.has_redirect(Direction::Output)
    }
}

/// Text after the final `/`, or all of `path` if it has none.
fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error(input: &str) -> ErrorKind {
        Command::parse(input)
            .expect_err("parse should fail")
            .kind()
            .clone()
    }

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_simple_command() {
        let command = Command::parse("/bin/echo hello  world\n").unwrap();
        assert_eq!(command.tokens, strings(&["/bin/echo", "hello", "world"]));
        assert_eq!(command.argv, strings(&["echo", "hello", "world"]));
        assert_eq!(command.program(), Some("/bin/echo"));
        assert_eq!(command.name(), Some("echo"));
        assert_eq!(command.args(), &strings(&["hello", "world"])[..]);
        assert!(!command.background);
        assert!(command.input_redirect.is_none());
        assert!(command.output_redirect.is_none());
        assert!(command.output_append.is_none());
    }

    #[test]
    fn test_argv_mirrors_tokens() {
        for line in &["ls", "./a.out x y", "/usr/bin/env\tFOO=1 true", "dir/ -x"] {
            let command = Command::parse(line).unwrap();
            assert_eq!(command.argv.len(), command.tokens.len());
            assert_eq!(command.argv[0], basename(&command.tokens[0]));
            assert_eq!(command.argv[1..], command.tokens[1..]);
        }
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/bin/ls"), "ls");
        assert_eq!(basename("ls"), "ls");
        assert_eq!(basename("./a/b"), "b");
        assert_eq!(basename("dir/"), "");
    }

    #[test]
    fn test_empty_line() {
        for line in &["", "   ", "\t\n", "\n"] {
            let command = Command::parse(line).unwrap();
            assert!(command.is_empty());
            assert!(command.argv.is_empty());
            assert_eq!(command.program(), None);
            assert!(!command.background);
        }
    }

    #[test]
    fn test_input_and_output_redirects() {
        let command = Command::parse("cat < in.txt > out.txt").unwrap();
        assert_eq!(command.argv, strings(&["cat"]));
        assert_eq!(command.tokens, strings(&["cat"]));
        assert_eq!(command.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(command.output_redirect.as_deref(), Some("out.txt"));
        assert!(command.output_append.is_none());
        assert!(!command.background);
    }

    #[test]
    fn test_redirect_before_command() {
        let command = Command::parse("< in.txt /usr/bin/wc -l >> log").unwrap();
        assert_eq!(command.tokens, strings(&["/usr/bin/wc", "-l"]));
        assert_eq!(command.argv, strings(&["wc", "-l"]));
        assert_eq!(command.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(command.output_append.as_deref(), Some("log"));
        assert!(command.output_redirect.is_none());
    }

    #[test]
    fn test_background() {
        let command = Command::parse("sleep 5 &").unwrap();
        assert_eq!(command.argv, strings(&["sleep", "5"]));
        assert_eq!(command.tokens, strings(&["sleep", "5"]));
        assert!(command.background);
    }

    #[test]
    fn test_background_after_redirect() {
        let command = Command::parse("sleep 5 & > out").unwrap();
        assert_eq!(command.argv, strings(&["sleep", "5"]));
        assert_eq!(command.output_redirect.as_deref(), Some("out"));
        assert!(command.background);
    }

    #[test]
    fn test_ampersand_not_last_is_a_word() {
        let command = Command::parse("echo & done").unwrap();
        assert_eq!(command.argv, strings(&["echo", "&", "done"]));
        assert!(!command.background);

        let command = Command::parse("echo a&").unwrap();
        assert_eq!(command.argv, strings(&["echo", "a&"]));
        assert!(!command.background);
    }

    #[test]
    fn test_lone_ampersand() {
        let command = Command::parse("&").unwrap();
        assert!(command.is_empty());
        assert!(command.background);
    }

    #[test]
    fn test_redirect_with_no_command() {
        assert_eq!(parse_error("> out.txt"), ErrorKind::RedirectWithoutCommand);
        assert_eq!(parse_error("< in.txt &"), ErrorKind::RedirectWithoutCommand);
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(
            parse_error("ls >"),
            ErrorKind::MissingRedirect(Direction::Output)
        );
        assert_eq!(
            parse_error("ls >>"),
            ErrorKind::MissingRedirect(Direction::Output)
        );
        assert_eq!(
            parse_error("cat <"),
            ErrorKind::MissingRedirect(Direction::Input)
        );
    }

    #[test]
    fn test_redirect_target_is_redirect() {
        assert_eq!(
            parse_error("ls > > out"),
            ErrorKind::RedirectIsTarget(Direction::Output)
        );
        assert_eq!(
            parse_error("cat < >> out"),
            ErrorKind::RedirectIsTarget(Direction::Output)
        );
        assert_eq!(
            parse_error("ls > < in"),
            ErrorKind::RedirectIsTarget(Direction::Input)
        );
    }

    #[test]
    fn test_multiple_redirects() {
        assert_eq!(
            parse_error("ls >> a.txt >> b.txt"),
            ErrorKind::MultipleRedirects(Direction::Output)
        );
        assert_eq!(
            parse_error("ls > a.txt >> b.txt"),
            ErrorKind::MultipleRedirects(Direction::Output)
        );
        assert_eq!(
            parse_error("ls >> a.txt > b.txt"),
            ErrorKind::MultipleRedirects(Direction::Output)
        );
        assert_eq!(
            parse_error("cat < a < b"),
            ErrorKind::MultipleRedirects(Direction::Input)
        );
    }

    #[test]
    fn test_duplicate_checked_before_missing_target() {
        assert_eq!(
            parse_error("ls > a >"),
            ErrorKind::MultipleRedirects(Direction::Output)
        );
    }

    #[test]
    fn test_line_too_long() {
        let config = ParserConfig { max_line_length: 8 };
        assert!(Command::parse_with_config("echo hi", &config).is_ok());
        let err = Command::parse_with_config("echo hello", &config).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::LineTooLong(8));
    }
}
