//! Turns a segment's tokens into the stages of a pipeline.

use std::mem;

use log::debug;

use crate::{
    core::parser::{Segment, Token, TokenKind},
    errors::{Error, Result},
};

/// One stage of a pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    pub argv: Vec<String>,
    /// File replacing standard input (`< file`).
    pub stdin: Option<String>,
    /// File replacing standard output (`> file`), created or truncated.
    pub stdout: Option<String>,
}

impl Command {
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        if self.argv.is_empty() {
            &[]
        } else {
            &self.argv[1..]
        }
    }

    fn is_empty(&self) -> bool {
        self.argv.is_empty() && self.stdin.is_none() && self.stdout.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    /// Stages in pipe order.
    pub commands: Vec<Command>,
    pub background: bool,
    /// Source text, used when displaying the job.
    pub input: String,
}

impl Pipeline {
    /// Builds the pipeline for one segment.
    ///
    /// `<` and `>` bind to the stage they appear in; a later redirection of
    /// the same stream replaces an earlier one.
    pub fn parse(segment: &Segment<'_>) -> Result<Pipeline> {
        let mut commands = Vec::new();
        let mut current = Command::default();
        let mut tokens = segment.tokens.iter();

        while let Some(token) = tokens.next() {
            match token.kind {
                TokenKind::Word => current.argv.push(token.text.clone()),
                TokenKind::RedirectIn => current.stdin = Some(redirect_target(token, tokens.next())?),
                TokenKind::RedirectOut => {
                    current.stdout = Some(redirect_target(token, tokens.next())?)
                }
                TokenKind::Pipe => {
                    if current.is_empty() {
                        return Err(Error::syntax(&token.text));
                    }
                    commands.push(mem::replace(&mut current, Command::default()));
                }
                _ => return Err(Error::syntax(&token.text)),
            }
        }

        if current.is_empty() {
            return Err(Error::syntax(if commands.is_empty() { "newline" } else { "|" }));
        }
        commands.push(current);

        let pipeline = Pipeline {
            commands,
            background: segment.background,
            input: source_text(segment.tokens),
        };
        debug!("parsed Pipeline: {:?}", pipeline);
        Ok(pipeline)
    }

    /// The command of a single-stage foreground pipeline, i.e. one that may be
    /// a builtin.
    pub fn single_foreground_command(&self) -> Option<&Command> {
        match self.commands.as_slice() {
            [command] if !self.background => Some(command),
            _ => None,
        }
    }
}

fn redirect_target(operator: &Token, target: Option<&Token>) -> Result<String> {
    match target {
        Some(token) if token.kind == TokenKind::Word => Ok(token.text.clone()),
        Some(token) => Err(Error::syntax(&token.text)),
        None => Err(Error::syntax(format!("{} newline", operator.text))),
    }
}

fn source_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::tokenize;
    use crate::errors::ErrorKind;

    fn parse(line: &str, background: bool) -> Result<Pipeline> {
        let tokens = tokenize(line, 127);
        Pipeline::parse(&Segment {
            tokens: &tokens,
            background,
        })
    }

    #[test]
    fn test_single_command() {
        let pipeline = parse("ls -l /tmp", false).unwrap();
        assert_eq!(pipeline.commands.len(), 1);
        assert_eq!(pipeline.commands[0].program(), Some("ls"));
        assert_eq!(pipeline.commands[0].args(), &["-l".to_string(), "/tmp".to_string()]);
        assert_eq!(pipeline.input, "ls -l /tmp");
        assert!(pipeline.single_foreground_command().is_some());
    }

    #[test]
    fn test_redirects_bind_to_their_stage() {
        let pipeline = parse("sort < in.txt | uniq -c > out.txt", false).unwrap();
        assert_eq!(
            pipeline.commands,
            vec![
                Command {
                    argv: vec!["sort".into()],
                    stdin: Some("in.txt".into()),
                    stdout: None,
                },
                Command {
                    argv: vec!["uniq".into(), "-c".into()],
                    stdin: None,
                    stdout: Some("out.txt".into()),
                },
            ]
        );
        assert!(pipeline.single_foreground_command().is_none());
    }

    #[test]
    fn test_later_redirect_wins() {
        let pipeline = parse("echo hi > a > b", false).unwrap();
        assert_eq!(pipeline.commands[0].stdout, Some("b".to_string()));
    }

    #[test]
    fn test_redirect_only_stage_is_kept() {
        let pipeline = parse("> out.txt", false).unwrap();
        assert_eq!(pipeline.commands[0].program(), None);
        assert_eq!(pipeline.commands[0].stdout, Some("out.txt".to_string()));
    }

    #[test]
    fn test_background_is_not_single_foreground() {
        let pipeline = parse("sleep 5", true).unwrap();
        assert!(pipeline.background);
        assert!(pipeline.single_foreground_command().is_none());
    }

    #[test]
    fn test_syntax_errors() {
        for line in &["| ls", "ls |", "ls | | wc", "cat <", "cat < | wc", "sleep 1 & ls"] {
            let e = parse(line, false).unwrap_err();
            match *e.kind() {
                ErrorKind::Syntax(_) => {}
                ref kind => panic!("{}: unexpected error {:?}", line, kind),
            }
        }
    }
}
