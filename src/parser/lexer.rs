//! Lexer for the view template language
//!
//! A template is literal text interleaved with `{{ ... }}` actions. The scanner
//! splits the source at the action delimiters and hands the inside of every
//! action to a logos lexer.

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Tokens inside an action
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Lexeme {
    // Action terminators
    #[token("}}")]
    Close,
    #[token("-}}")]
    TrimClose,

    // Keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("range")]
    Range,
    #[token("with")]
    With,
    #[token("block")]
    Block,
    #[token("define")]
    Define,
    #[token("template")]
    Template,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,

    // Punctuation
    #[token("|")]
    Pipe,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(".")]
    Dot,

    /// `.Name.Sub` without the leading dot, split into segments
    #[regex(r"(\.[a-zA-Z_][a-zA-Z0-9_]*)+", |lex| {
        lex.slice()[1..].split('.').map(str::to_string).collect::<Vec<_>>()
    })]
    Field(Vec<String>),

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r"`[^`]*`", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    String(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Tokens of a whole template, as consumed by the grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text between actions
    Text(String),
    /// `{{`
    Open,
    /// `}}`
    Close,
    If,
    Else,
    End,
    Range,
    With,
    Block,
    Define,
    Template,
    True,
    False,
    Nil,
    Pipe,
    ParenOpen,
    ParenClose,
    Dot,
    Field(Vec<String>),
    Ident(String),
    String(String),
    Number(f64),
}

impl From<Lexeme> for Token {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Close | Lexeme::TrimClose => Token::Close,
            Lexeme::If => Token::If,
            Lexeme::Else => Token::Else,
            Lexeme::End => Token::End,
            Lexeme::Range => Token::Range,
            Lexeme::With => Token::With,
            Lexeme::Block => Token::Block,
            Lexeme::Define => Token::Define,
            Lexeme::Template => Token::Template,
            Lexeme::True => Token::True,
            Lexeme::False => Token::False,
            Lexeme::Nil => Token::Nil,
            Lexeme::Pipe => Token::Pipe,
            Lexeme::ParenOpen => Token::ParenOpen,
            Lexeme::ParenClose => Token::ParenClose,
            Lexeme::Dot => Token::Dot,
            Lexeme::Field(path) => Token::Field(path),
            Lexeme::Ident(name) => Token::Ident(name),
            Lexeme::String(s) => Token::String(s),
            Lexeme::Number(n) => Token::Number(n),
        }
    }
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of the source before trim markers are applied
enum Piece {
    Text(Span),
    Action(Vec<(Token, Span)>),
}

/// Lex a template source into tokens with spans
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut pieces = Vec::new();
    // (trim text before this action, trim text after this action)
    let mut trims: Vec<(bool, bool)> = Vec::new();
    let mut pos = 0;

    while let Some(found) = source[pos..].find(OPEN) {
        let open = pos + found;
        if open > pos {
            pieces.push(Piece::Text(pos..open));
        }

        let mut start = open + OPEN.len();
        let trim_left = is_trim_marker(&source[start..]);
        if trim_left {
            start += 1;
        }

        let (tokens, end, trim_right) = if source[start..].trim_start().starts_with("/*") {
            scan_comment(source, open, start)?
        } else {
            scan_action(source, open, start)?
        };

        pieces.push(Piece::Action(tokens));
        trims.push((trim_left, trim_right));
        pos = end;
    }
    if pos < source.len() {
        pieces.push(Piece::Text(pos..source.len()));
    }

    Ok(assemble(source, pieces, &trims))
}

/// `{{- ` trims only when the dash is followed by whitespace
fn is_trim_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn scan_comment(
    source: &str,
    open: usize,
    start: usize,
) -> Result<(Vec<(Token, Span)>, usize, bool), ParseError> {
    let unterminated = || ParseError::Syntax {
        span: open..source.len(),
        message: "unterminated comment".to_string(),
        expected: vec![],
    };

    let body_end = source[start..].find("*/").ok_or_else(unterminated)? + start + 2;
    let rest = source[body_end..].trim_start();
    let skipped = source.len() - body_end - rest.len();

    if rest.starts_with("-}}") {
        Ok((vec![], body_end + skipped + 3, true))
    } else if rest.starts_with(CLOSE) {
        Ok((vec![], body_end + skipped + CLOSE.len(), false))
    } else {
        Err(ParseError::Syntax {
            span: open..body_end,
            message: "comment must end the action".to_string(),
            expected: vec!["'}}'".to_string()],
        })
    }
}

fn scan_action(
    source: &str,
    open: usize,
    start: usize,
) -> Result<(Vec<(Token, Span)>, usize, bool), ParseError> {
    let mut tokens = vec![(Token::Open, open..start)];
    let mut lexer = Lexeme::lexer(&source[start..]);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let span = start + span.start..start + span.end;
        match result {
            Ok(Lexeme::Close) => {
                tokens.push((Token::Close, span.clone()));
                return Ok((tokens, span.end, false));
            }
            Ok(Lexeme::TrimClose) => {
                tokens.push((Token::Close, span.clone()));
                return Ok((tokens, span.end, true));
            }
            Ok(lexeme) => tokens.push((lexeme.into(), span)),
            Err(()) => {
                return Err(ParseError::Syntax {
                    message: format!("unexpected character {:?} in action", &source[span.clone()]),
                    span,
                    expected: vec![],
                })
            }
        }
    }

    Err(ParseError::Syntax {
        span: open..source.len(),
        message: "unclosed action".to_string(),
        expected: vec!["'}}'".to_string()],
    })
}

/// Apply trim markers to the text pieces and flatten into one token list
fn assemble(source: &str, pieces: Vec<Piece>, trims: &[(bool, bool)]) -> Vec<(Token, Span)> {
    let mut tokens = Vec::new();
    let mut action_index = 0;
    let count = pieces.len();

    for (i, piece) in pieces.into_iter().enumerate() {
        match piece {
            Piece::Action(action) => {
                tokens.extend(action);
                action_index += 1;
            }
            Piece::Text(span) => {
                let mut text = &source[span.clone()];
                // Trim from the action before this text (its right marker)
                if action_index > 0 && trims[action_index - 1].1 {
                    text = text.trim_start();
                }
                // Trim from the action after this text (its left marker)
                if i + 1 < count && action_index < trims.len() && trims[action_index].0 {
                    text = text.trim_end();
                }
                if !text.is_empty() {
                    tokens.push((Token::Text(text.to_string()), span));
                }
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source)
            .expect("should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(kinds("hello"), vec![Token::Text("hello".to_string())]);
    }

    #[test]
    fn test_keywords_and_fields() {
        assert_eq!(
            kinds("{{ if .User.Name }}"),
            vec![
                Token::Open,
                Token::If,
                Token::Field(vec!["User".to_string(), "Name".to_string()]),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_block_with_string_and_dot() {
        assert_eq!(
            kinds(r#"{{block "content" .}}x{{end}}"#),
            vec![
                Token::Open,
                Token::Block,
                Token::String("content".to_string()),
                Token::Dot,
                Token::Close,
                Token::Text("x".to_string()),
                Token::Open,
                Token::End,
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_pipeline_tokens() {
        assert_eq!(
            kinds("{{ .Title | upper }}"),
            vec![
                Token::Open,
                Token::Field(vec!["Title".to_string()]),
                Token::Pipe,
                Token::Ident("upper".to_string()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_numbers_and_literals() {
        assert_eq!(
            kinds("{{ eq 3 -1.5 true nil }}"),
            vec![
                Token::Open,
                Token::Ident("eq".to_string()),
                Token::Number(3.0),
                Token::Number(-1.5),
                Token::True,
                Token::Nil,
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_raw_strings() {
        assert_eq!(
            kinds(r#"{{ "a\"b" `c\d` }}"#),
            vec![
                Token::Open,
                Token::String("a\"b".to_string()),
                Token::String("c\\d".to_string()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_close_inside_string_does_not_end_action() {
        assert_eq!(
            kinds(r#"{{ "}}" }}"#),
            vec![Token::Open, Token::String("}}".to_string()), Token::Close]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(
            kinds("a{{/* note */}}b"),
            vec![Token::Text("a".to_string()), Token::Text("b".to_string())]
        );
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(
            kinds("a  {{- .X -}}  b"),
            vec![
                Token::Text("a".to_string()),
                Token::Open,
                Token::Field(vec!["X".to_string()]),
                Token::Close,
                Token::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_dash_without_space_is_not_a_trim_marker() {
        assert_eq!(
            kinds("a {{-3}}"),
            vec![
                Token::Text("a ".to_string()),
                Token::Open,
                Token::Number(-3.0),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_unclosed_action_is_an_error() {
        assert!(lex("before {{ .X").is_err());
    }

    #[test]
    fn test_unexpected_character_is_an_error() {
        assert!(lex("{{ .X ; }}").is_err());
    }
}
