use std::process::ExitStatus;

use crate::{
    core::parser::{Token, TokenKind},
    util::MshExitStatusExt,
};

/// The tokens between two of `;`, `&&`, `||` (or the ends of the line).
///
/// A trailing `&` is removed from `tokens` and recorded as `background`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<'a> {
    pub tokens: &'a [Token],
    pub background: bool,
}

/// Runs each segment of `tokens` through `execute`, honoring short-circuit
/// operators.
///
/// After a segment finishes with status S, a segment following `&&` runs
/// only if S is success and one following `||` only if S is a failure. A
/// skipped segment is scanned past, never handed to `execute`, and the
/// operator after it is judged against the same S. Empty segments leave S
/// unchanged. Returns the status of the last executed segment.
pub fn run_segments<F>(tokens: &[Token], mut execute: F) -> ExitStatus
where
    F: FnMut(&Segment<'_>) -> ExitStatus,
{
    let mut last_status = ExitStatus::from_success();
    let mut start = 0;

    while start < tokens.len() {
        let boundary = next_boundary(tokens, start);

        let mut end = boundary;
        let background = end > start && tokens[end - 1].kind == TokenKind::Background;
        if background {
            end -= 1;
        }
        if end > start {
            let segment = Segment {
                tokens: &tokens[start..end],
                background,
            };
            last_status = execute(&segment);
        }

        start = match tokens.get(boundary).map(|t| t.kind) {
            Some(TokenKind::And) if !last_status.success() => next_boundary(tokens, boundary + 1),
            Some(TokenKind::Or) if last_status.success() => next_boundary(tokens, boundary + 1),
            _ => boundary + 1,
        };
    }

    last_status
}

fn next_boundary(tokens: &[Token], from: usize) -> usize {
    tokens[from..]
        .iter()
        .position(|t| t.kind.is_segment_boundary())
        .map_or(tokens.len(), |offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::tokenize;

    /// Runs `line`, treating a segment's first word as its exit code, and
    /// returns the texts of the segments that ran plus the final status.
    fn trace(line: &str) -> (Vec<String>, i32) {
        let tokens = tokenize(line, 127);
        let mut executed = Vec::new();
        let status = run_segments(&tokens, |segment| {
            let text: Vec<&str> = segment.tokens.iter().map(|t| t.text.as_str()).collect();
            let mut text = text.join(" ");
            if segment.background {
                text.push_str(" &");
            }
            executed.push(text);
            let code = segment.tokens[0].text.parse::<i32>().unwrap_or(0);
            ExitStatus::from_status(code)
        });
        (executed, status.status_code())
    }

    #[test]
    fn test_sequence_runs_everything() {
        assert_eq!(trace("1 ; 0 ; 2"), (vec!["1".into(), "0".into(), "2".into()], 2));
    }

    #[test]
    fn test_and_runs_on_success_only() {
        assert_eq!(trace("0 && 3"), (vec!["0".into(), "3".into()], 3));
        assert_eq!(trace("1 && 3"), (vec!["1".into()], 1));
    }

    #[test]
    fn test_or_runs_on_failure_only() {
        assert_eq!(trace("1 || 0 x"), (vec!["1".into(), "0 x".into()], 0));
        assert_eq!(trace("0 || 5"), (vec!["0".into()], 0));
    }

    #[test]
    fn test_skipped_segment_passes_status_along() {
        assert_eq!(trace("1 && 0 || 4"), (vec!["1".into(), "4".into()], 4));
        assert_eq!(trace("0 || 9 && 0 y"), (vec!["0".into(), "0 y".into()], 0));
        assert_eq!(trace("1 && 0 ; 0 z"), (vec!["1".into(), "0 z".into()], 0));
    }

    #[test]
    fn test_trailing_ampersand_marks_background() {
        let (executed, _) = trace("0 a & ; 0 b &");
        assert_eq!(executed, vec!["0 a &".to_string(), "0 b &".to_string()]);

        let (executed, _) = trace("0 a | 0 b");
        assert_eq!(executed, vec!["0 a | 0 b".to_string()]);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        assert_eq!(trace("; ; 2 ;"), (vec!["2".into()], 2));
        assert_eq!(trace("&"), (vec![], 0));
        assert_eq!(trace("&& 3"), (vec!["3".into()], 3));
    }
}
